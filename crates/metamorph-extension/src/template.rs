//! Transformation templates and upgrade steps
//!
//! A [`TransformationTemplate`] is an immutable, ordered list of
//! [`TemplateEntry`] values. Entries are single operations (optionally gated
//! by a [`Condition`]) or named [`OperationGroup`]s that expand in place when
//! the template runs.

use crate::condition::Condition;
use crate::operation::Operation;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Template identity, unique across a registry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TemplateId(String);

impl TemplateId {
    /// Create new template id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the id is empty or whitespace only
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for TemplateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TemplateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One entry of a template
#[derive(Debug, Clone)]
pub enum TemplateEntry {
    /// Single operation, optionally gated
    Operation {
        operation: Arc<dyn Operation>,
        condition: Option<Condition>,
    },
    /// Group of entries sharing a condition
    Group(OperationGroup),
}

impl TemplateEntry {
    /// Number of operations this entry expands into
    #[must_use]
    pub fn operation_count(&self) -> usize {
        match self {
            Self::Operation { .. } => 1,
            Self::Group(group) => group.operation_count(),
        }
    }
}

/// Named group of entries
///
/// The group's condition is combined with the precondition of every entry
/// below it.
#[derive(Debug, Clone)]
pub struct OperationGroup {
    name: String,
    condition: Option<Condition>,
    entries: Vec<TemplateEntry>,
}

impl OperationGroup {
    /// Create empty group
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: None,
            entries: Vec::new(),
        }
    }

    /// Gate the whole group
    #[inline]
    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Append operation
    #[must_use]
    pub fn add(mut self, operation: impl Operation + 'static) -> Self {
        self.entries.push(TemplateEntry::Operation {
            operation: Arc::new(operation),
            condition: None,
        });
        self
    }

    /// Append gated operation
    #[must_use]
    pub fn add_when(mut self, operation: impl Operation + 'static, condition: Condition) -> Self {
        self.entries.push(TemplateEntry::Operation {
            operation: Arc::new(operation),
            condition: Some(condition),
        });
        self
    }

    /// Append nested group
    #[must_use]
    pub fn add_group(mut self, group: OperationGroup) -> Self {
        self.entries.push(TemplateEntry::Group(group));
        self
    }

    /// Group name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Group condition
    #[inline]
    #[must_use]
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Child entries in declaration order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    /// Number of operations in this group, recursively
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.entries.iter().map(TemplateEntry::operation_count).sum()
    }
}

/// Ordered set of operations implementing one migration
#[derive(Debug, Clone)]
pub struct TransformationTemplate {
    id: TemplateId,
    extension: String,
    description: String,
    entries: Vec<TemplateEntry>,
}

impl TransformationTemplate {
    /// Start building a template
    #[inline]
    #[must_use]
    pub fn builder(id: impl Into<TemplateId>, extension: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder {
            id: id.into(),
            extension: extension.into(),
            description: String::new(),
            entries: Vec::new(),
        }
    }

    /// Template identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> &TemplateId {
        &self.id
    }

    /// Name of the contributing extension
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Template description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Top-level entries in declaration order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    /// Number of operations once groups are expanded
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.entries.iter().map(TemplateEntry::operation_count).sum()
    }
}

/// Builder for [`TransformationTemplate`]
#[derive(Debug)]
pub struct TemplateBuilder {
    id: TemplateId,
    extension: String,
    description: String,
    entries: Vec<TemplateEntry>,
}

impl TemplateBuilder {
    /// Set description
    #[inline]
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append operation
    #[must_use]
    pub fn add(mut self, operation: impl Operation + 'static) -> Self {
        self.entries.push(TemplateEntry::Operation {
            operation: Arc::new(operation),
            condition: None,
        });
        self
    }

    /// Append shared operation
    #[must_use]
    pub fn add_shared(mut self, operation: Arc<dyn Operation>) -> Self {
        self.entries.push(TemplateEntry::Operation {
            operation,
            condition: None,
        });
        self
    }

    /// Append gated operation
    #[must_use]
    pub fn add_when(mut self, operation: impl Operation + 'static, condition: Condition) -> Self {
        self.entries.push(TemplateEntry::Operation {
            operation: Arc::new(operation),
            condition: Some(condition),
        });
        self
    }

    /// Append group
    #[must_use]
    pub fn add_group(mut self, group: OperationGroup) -> Self {
        self.entries.push(TemplateEntry::Group(group));
        self
    }

    /// Finish the template
    #[must_use]
    pub fn build(self) -> TransformationTemplate {
        TransformationTemplate {
            id: self.id,
            extension: self.extension,
            description: self.description,
            entries: self.entries,
        }
    }
}

/// Template tagged with the version it upgrades an application to
#[derive(Debug, Clone)]
pub struct UpgradeStep {
    template: TransformationTemplate,
    version: String,
}

impl UpgradeStep {
    /// Create upgrade step
    #[inline]
    #[must_use]
    pub fn new(template: TransformationTemplate, version: impl Into<String>) -> Self {
        Self {
            template,
            version: version.into(),
        }
    }

    /// Version the application has after this step
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Underlying template
    #[inline]
    #[must_use]
    pub fn template(&self) -> &TransformationTemplate {
        &self.template
    }

    /// Consume into template
    #[inline]
    #[must_use]
    pub fn into_template(self) -> TransformationTemplate {
        self.template
    }
}
