//! Extension contract
//!
//! An [`Extension`] contributes templates and upgrade steps through
//! descriptors. Each descriptor pairs a [`TemplateId`] with a factory, so the
//! engine can build a fresh template per request without any name-based type
//! lookup.

use crate::template::{TemplateId, TransformationTemplate, UpgradeStep};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Factory producing a fresh template instance
pub type TemplateFactory =
    Arc<dyn Fn() -> Result<TransformationTemplate, ExtensionError> + Send + Sync>;

/// Answer of an extension asked to evaluate an application folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Extension does not recognise the application
    NoOpinion,
    /// Extension recognises the application and proposes a template
    Match(TemplateId),
    /// Extension recognises the application but refuses to transform it
    Invalid(String),
}

/// Pluggable contributor of templates, upgrade steps and a resolution probe
pub trait Extension: Send + Sync + fmt::Debug {
    /// Unique extension name
    fn name(&self) -> &str;

    /// Short description
    fn description(&self) -> &str {
        ""
    }

    /// Extension version
    fn version(&self) -> &str {
        "0.0.0"
    }

    /// Templates contributed by this extension
    fn templates(&self) -> Vec<TemplateDescriptor>;

    /// Upgrade steps contributed by this extension
    fn upgrade_steps(&self) -> Vec<UpgradeStepDescriptor> {
        Vec::new()
    }

    /// Evaluate an application folder for automatic resolution
    ///
    /// Must not mutate the folder.
    fn probe(&self, _application_folder: &Path) -> Probe {
        Probe::NoOpinion
    }

    /// Detect the application's current version, if this extension can tell
    fn detect_version(&self, _application_folder: &Path) -> Option<String> {
        None
    }
}

/// Registration entry for a template
#[derive(Clone)]
pub struct TemplateDescriptor {
    id: TemplateId,
    description: String,
    factory: TemplateFactory,
}

impl TemplateDescriptor {
    /// Create descriptor
    pub fn new<F>(id: impl Into<TemplateId>, factory: F) -> Self
    where
        F: Fn() -> Result<TransformationTemplate, ExtensionError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            description: String::new(),
            factory: Arc::new(factory),
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Template id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &TemplateId {
        &self.id
    }

    /// Description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Build a fresh template
    ///
    /// # Errors
    /// - the factory's own error
    /// - `ExtensionError::IdentityMismatch` if the factory built another template
    pub fn instantiate(&self) -> Result<TransformationTemplate, ExtensionError> {
        instantiate(&self.id, &self.factory)
    }
}

impl fmt::Debug for TemplateDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateDescriptor")
            .field("id", &self.id)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Registration entry for an upgrade step
#[derive(Clone)]
pub struct UpgradeStepDescriptor {
    id: TemplateId,
    version: String,
    description: String,
    factory: TemplateFactory,
}

impl UpgradeStepDescriptor {
    /// Create descriptor for the step upgrading to `version`
    pub fn new<F>(id: impl Into<TemplateId>, version: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<TransformationTemplate, ExtensionError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            version: version.into(),
            description: String::new(),
            factory: Arc::new(factory),
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Step id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &TemplateId {
        &self.id
    }

    /// Version the application is upgraded to
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Build a fresh upgrade step
    ///
    /// # Errors
    /// Same as [`TemplateDescriptor::instantiate`].
    pub fn instantiate(&self) -> Result<UpgradeStep, ExtensionError> {
        let template = instantiate(&self.id, &self.factory)?;
        Ok(UpgradeStep::new(template, self.version.clone()))
    }
}

impl fmt::Debug for UpgradeStepDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeStepDescriptor")
            .field("id", &self.id)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

fn instantiate(
    id: &TemplateId,
    factory: &TemplateFactory,
) -> Result<TransformationTemplate, ExtensionError> {
    let template = factory()?;
    if template.id() != id {
        return Err(ExtensionError::IdentityMismatch {
            expected: id.clone(),
            actual: template.id().clone(),
        });
    }
    Ok(template)
}

/// Errors raised by extension code
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    /// Factory refused to build the template
    #[error("template '{id}' could not be instantiated: {reason}")]
    Instantiation { id: TemplateId, reason: String },

    /// Factory built a template with another identity
    #[error("factory registered as '{expected}' built template '{actual}'")]
    IdentityMismatch {
        expected: TemplateId,
        actual: TemplateId,
    },

    /// Any other extension failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExtensionError {
    /// Create instantiation error
    pub fn instantiation(id: impl Into<TemplateId>, reason: impl Into<String>) -> Self {
        Self::Instantiation {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_instantiates_fresh_templates() {
        let descriptor = TemplateDescriptor::new("migrate", || {
            Ok(TransformationTemplate::builder("migrate", "ext").build())
        })
        .with_description("migrates things");

        let a = descriptor.instantiate().unwrap();
        let b = descriptor.instantiate().unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(descriptor.description(), "migrates things");
    }

    #[test]
    fn descriptor_rejects_identity_mismatch() {
        let descriptor = TemplateDescriptor::new("expected", || {
            Ok(TransformationTemplate::builder("other", "ext").build())
        });

        let err = descriptor.instantiate().unwrap_err();
        assert!(matches!(err, ExtensionError::IdentityMismatch { .. }));
    }

    #[test]
    fn descriptor_propagates_factory_error() {
        let descriptor = TemplateDescriptor::new("broken", || {
            Err(ExtensionError::instantiation("broken", "missing resource"))
        });

        let err = descriptor.instantiate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "template 'broken' could not be instantiated: missing resource"
        );
    }

    #[test]
    fn upgrade_descriptor_tags_version() {
        let descriptor = UpgradeStepDescriptor::new("to-1.1", "1.1", || {
            Ok(TransformationTemplate::builder("to-1.1", "ext").build())
        });

        let step = descriptor.instantiate().unwrap();
        assert_eq!(step.version(), "1.1");
        assert_eq!(descriptor.version(), "1.1");
        assert!(format!("{descriptor:?}").contains("1.1"));
    }
}
