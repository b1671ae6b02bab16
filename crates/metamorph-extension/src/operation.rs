//! Operation unit contract
//!
//! An [`Operation`] is a single pluggable mutation of the application tree.
//! The engine only ever sees this trait; concrete operations live in
//! operation catalogs and extensions.

use crate::context::TransformationContext;
use serde_json::Value;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Single file-tree mutation with an optional precondition
///
/// Implementations must be deterministic with respect to their inputs and
/// must not mutate anything from [`Operation::precondition`].
pub trait Operation: Send + Sync + fmt::Debug {
    /// Human-readable text of what the operation does
    fn description(&self) -> String;

    /// Whether the operation should run at all
    ///
    /// Evaluated against the context and tree state right before execution.
    /// Defaults to `true`.
    fn precondition(&self, _context: &TransformationContext, _tree: &Path) -> bool {
        true
    }

    /// Whether a failure of this operation aborts the whole transformation
    ///
    /// Fixed at construction. Defaults to `false`.
    fn is_critical(&self) -> bool {
        false
    }

    /// Apply the operation to the tree rooted at `tree`
    ///
    /// # Errors
    /// Returns [`OperationError`] describing why the mutation failed.
    fn execute(
        &self,
        tree: &Path,
        context: &TransformationContext,
    ) -> Result<OperationOutcome, OperationError>;
}

/// Successful operation outcome
///
/// Carries the operation's own account of what it did plus any attributes
/// it wants to publish to later operations.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutcome {
    message: String,
    attributes: Vec<(String, Value)>,
}

impl OperationOutcome {
    /// Create outcome with message
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attributes: Vec::new(),
        }
    }

    /// Publish an attribute to the transformation context
    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Result message
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Attributes to publish, in order
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &[(String, Value)] {
        &self.attributes
    }

    /// Split into message and attributes
    #[inline]
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<(String, Value)>) {
        (self.message, self.attributes)
    }
}

/// Errors raised by operations
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// IO failure on a file of the tree
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Target file does not exist
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A required context attribute was never set
    #[error("context attribute '{0}' is not set")]
    MissingAttribute(String),

    /// A context attribute holds an unusable value
    #[error("context attribute '{name}' is invalid: {reason}")]
    InvalidAttribute { name: String, reason: String },

    /// Operation-specific failure
    #[error("{0}")]
    Failed(String),

    /// Failure reported by extension code
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OperationError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create generic failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
