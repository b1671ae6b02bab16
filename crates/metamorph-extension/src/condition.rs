//! Declarative conditions attached to template entries
//!
//! A [`Condition`] is evaluated together with the operation's own
//! precondition; the entry only runs when both hold.

use crate::context::TransformationContext;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type Predicate = dyn Fn(&TransformationContext, &Path) -> bool + Send + Sync;

/// Condition gating a template entry or group
#[derive(Clone)]
pub enum Condition {
    /// Attribute is set and truthy
    IfAttribute(String),
    /// Attribute is absent or falsy
    UnlessAttribute(String),
    /// Request property is set and not `false`
    IfProperty(String),
    /// Request property holds exactly this value
    PropertyEquals(String, String),
    /// Path relative to the tree root exists
    FileExists(PathBuf),
    /// Arbitrary predicate over context and tree
    Custom(Arc<Predicate>),
    /// All conditions hold
    All(Vec<Condition>),
}

impl Condition {
    /// Create custom predicate condition
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&TransformationContext, &Path) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    /// Conjunction of `self` and `other`
    #[must_use]
    pub fn and(self, other: Condition) -> Self {
        match self {
            Self::All(mut conditions) => {
                conditions.push(other);
                Self::All(conditions)
            }
            first => Self::All(vec![first, other]),
        }
    }

    /// Evaluate condition
    #[must_use]
    pub fn evaluate(&self, context: &TransformationContext, tree: &Path) -> bool {
        match self {
            Self::IfAttribute(name) => context.is_truthy(name),
            Self::UnlessAttribute(name) => !context.is_truthy(name),
            Self::IfProperty(name) => context.is_property_true(name),
            Self::PropertyEquals(name, value) => context.property(name) == Some(value.as_str()),
            Self::FileExists(relative) => tree.join(relative).exists(),
            Self::Custom(predicate) => predicate(context, tree),
            Self::All(conditions) => conditions.iter().all(|c| c.evaluate(context, tree)),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IfAttribute(name) => f.debug_tuple("IfAttribute").field(name).finish(),
            Self::UnlessAttribute(name) => f.debug_tuple("UnlessAttribute").field(name).finish(),
            Self::IfProperty(name) => f.debug_tuple("IfProperty").field(name).finish(),
            Self::PropertyEquals(name, value) => {
                f.debug_tuple("PropertyEquals").field(name).field(value).finish()
            }
            Self::FileExists(path) => f.debug_tuple("FileExists").field(path).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::All(conditions) => f.debug_tuple("All").field(conditions).finish(),
        }
    }
}
