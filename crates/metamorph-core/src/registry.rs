//! Extension registry
//!
//! Provides [`ExtensionRegistry`], the process-wide, read-only set of
//! extensions plus the id → factory table for every template and upgrade
//! step they contribute. The table is built once, when the registry is
//! built, and template lookup by id goes through it.

use crate::error::RegistryError;
use indexmap::IndexMap;
use metamorph_extension::{
    Extension, ExtensionError, TemplateDescriptor, TemplateId, TransformationTemplate,
    UpgradeStepDescriptor,
};
use std::sync::Arc;

/// Registration table entry
#[derive(Debug, Clone)]
pub enum RegisteredTemplate {
    /// Plain template
    Template {
        extension: String,
        descriptor: TemplateDescriptor,
    },
    /// Versioned upgrade step
    UpgradeStep {
        extension: String,
        descriptor: UpgradeStepDescriptor,
    },
}

impl RegisteredTemplate {
    /// Owning extension name
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &str {
        match self {
            Self::Template { extension, .. } | Self::UpgradeStep { extension, .. } => extension,
        }
    }

    /// Template id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &TemplateId {
        match self {
            Self::Template { descriptor, .. } => descriptor.id(),
            Self::UpgradeStep { descriptor, .. } => descriptor.id(),
        }
    }

    /// Upgrade step descriptor, if this entry is a step
    #[inline]
    #[must_use]
    pub fn as_upgrade_step(&self) -> Option<&UpgradeStepDescriptor> {
        match self {
            Self::UpgradeStep { descriptor, .. } => Some(descriptor),
            Self::Template { .. } => None,
        }
    }

    /// Build a fresh template instance
    ///
    /// # Errors
    /// The factory's error.
    pub fn instantiate(&self) -> Result<TransformationTemplate, ExtensionError> {
        match self {
            Self::Template { descriptor, .. } => descriptor.instantiate(),
            Self::UpgradeStep { descriptor, .. } => {
                descriptor.instantiate().map(metamorph_extension::UpgradeStep::into_template)
            }
        }
    }
}

/// Registered extensions and their templates
#[derive(Debug, Default, Clone)]
pub struct ExtensionRegistry {
    extensions: IndexMap<String, Arc<dyn Extension>>,
    templates: IndexMap<TemplateId, RegisteredTemplate>,
}

impl ExtensionRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a registry
    #[inline]
    #[must_use]
    pub fn builder() -> ExtensionRegistryBuilder {
        ExtensionRegistryBuilder::default()
    }

    /// Registered extensions in registration order
    pub fn extensions(&self) -> impl Iterator<Item = &Arc<dyn Extension>> {
        self.extensions.values()
    }

    /// Look up an extension by name
    #[inline]
    #[must_use]
    pub fn extension(&self, name: &str) -> Option<&Arc<dyn Extension>> {
        self.extensions.get(name)
    }

    /// Check if an extension is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    /// Extension names in registration order
    #[inline]
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.extensions.keys().map(String::as_str).collect()
    }

    /// Number of extensions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Check if no extension is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Look up a template or upgrade step by id
    #[inline]
    #[must_use]
    pub fn template(&self, id: &TemplateId) -> Option<&RegisteredTemplate> {
        self.templates.get(id)
    }

    /// Every registered template and step id
    pub fn template_ids(&self) -> impl Iterator<Item = &TemplateId> {
        self.templates.keys()
    }

    /// Upgrade steps of one extension, in declaration order
    #[must_use]
    pub fn upgrade_steps(&self, extension: &str) -> Vec<UpgradeStepDescriptor> {
        self.templates
            .values()
            .filter(|t| t.extension() == extension)
            .filter_map(RegisteredTemplate::as_upgrade_step)
            .cloned()
            .collect()
    }
}

/// Builder for [`ExtensionRegistry`]
#[derive(Debug, Default)]
pub struct ExtensionRegistryBuilder {
    extensions: Vec<Arc<dyn Extension>>,
}

impl ExtensionRegistryBuilder {
    /// Register extension
    #[must_use]
    pub fn register(self, extension: impl Extension + 'static) -> Self {
        self.register_shared(Arc::new(extension))
    }

    /// Register shared extension
    #[must_use]
    pub fn register_shared(mut self, extension: Arc<dyn Extension>) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Build the registry and its registration table
    ///
    /// # Errors
    /// - `RegistryError::DuplicateExtension` when two extensions share a name
    /// - `RegistryError::DuplicateTemplate` when two templates or steps share
    ///   an id
    pub fn build(self) -> Result<ExtensionRegistry, RegistryError> {
        let mut registry = ExtensionRegistry::new();

        for extension in self.extensions {
            let name = extension.name().to_string();
            if registry.extensions.contains_key(&name) {
                return Err(RegistryError::DuplicateExtension(name));
            }

            let entries = extension
                .templates()
                .into_iter()
                .map(|descriptor| RegisteredTemplate::Template {
                    extension: name.clone(),
                    descriptor,
                })
                .chain(extension.upgrade_steps().into_iter().map(|descriptor| {
                    RegisteredTemplate::UpgradeStep {
                        extension: name.clone(),
                        descriptor,
                    }
                }));

            for entry in entries {
                if let Some(existing) = registry.templates.get(entry.id()) {
                    return Err(RegistryError::DuplicateTemplate {
                        id: entry.id().clone(),
                        first: existing.extension().to_string(),
                        second: name.clone(),
                    });
                }
                registry.templates.insert(entry.id().clone(), entry);
            }

            tracing::debug!(extension = %name, "registered extension");
            registry.extensions.insert(name, extension);
        }

        Ok(registry)
    }
}
