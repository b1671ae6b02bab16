//! File operations
//!
//! - [`CopyFile`]: copy one file inside the application
//! - [`DeleteFile`]: remove one file
//! - [`FileExists`]: publish whether a file exists

use crate::target::{inside, FileTarget, Settings};
use metamorph_extension::{
    Condition, Operation, OperationError, OperationOutcome, TransformationContext,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Copy a file to another path inside the application
///
/// Missing parent folders of the destination are created; an existing
/// destination is overwritten.
#[derive(Debug, Clone)]
pub struct CopyFile {
    source: FileTarget,
    destination: PathBuf,
    settings: Settings,
}

impl CopyFile {
    /// Create operation copying `source` to `destination`, relative to the
    /// application root
    #[must_use]
    pub fn new(source: impl Into<FileTarget>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            settings: Settings::default(),
        }
    }

    /// Abort the transformation if this fails
    #[inline]
    #[must_use]
    pub fn critical(mut self) -> Self {
        self.settings.critical = true;
        self
    }

    /// Only run when `condition` holds
    #[inline]
    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.settings.precondition = Some(condition);
        self
    }
}

impl Operation for CopyFile {
    fn description(&self) -> String {
        format!(
            "Copy file {} to {}",
            self.source,
            self.destination.display()
        )
    }

    fn precondition(&self, context: &TransformationContext, tree: &Path) -> bool {
        self.settings.holds(context, tree)
    }

    fn is_critical(&self) -> bool {
        self.settings.critical
    }

    fn execute(
        &self,
        tree: &Path,
        context: &TransformationContext,
    ) -> Result<OperationOutcome, OperationError> {
        let source = self.source.resolve(tree, context)?;
        if !source.is_file() {
            return Err(OperationError::FileNotFound(source));
        }
        let destination = inside(tree, &self.destination)?;

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| OperationError::io(parent, e))?;
        }
        fs::copy(&source, &destination).map_err(|e| OperationError::io(&destination, e))?;

        Ok(OperationOutcome::new(format!(
            "File {} has been copied to {}",
            self.source,
            self.destination.display()
        )))
    }
}

/// Delete one file
#[derive(Debug, Clone)]
pub struct DeleteFile {
    target: FileTarget,
    settings: Settings,
}

impl DeleteFile {
    /// Create operation
    #[must_use]
    pub fn new(target: impl Into<FileTarget>) -> Self {
        Self {
            target: target.into(),
            settings: Settings::default(),
        }
    }

    /// Abort the transformation if this fails
    #[inline]
    #[must_use]
    pub fn critical(mut self) -> Self {
        self.settings.critical = true;
        self
    }

    /// Only run when `condition` holds
    #[inline]
    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.settings.precondition = Some(condition);
        self
    }
}

impl Operation for DeleteFile {
    fn description(&self) -> String {
        format!("Delete file {}", self.target)
    }

    fn precondition(&self, context: &TransformationContext, tree: &Path) -> bool {
        self.settings.holds(context, tree)
    }

    fn is_critical(&self) -> bool {
        self.settings.critical
    }

    fn execute(
        &self,
        tree: &Path,
        context: &TransformationContext,
    ) -> Result<OperationOutcome, OperationError> {
        let path = self.target.resolve(tree, context)?;
        if !path.is_file() {
            return Err(OperationError::FileNotFound(path));
        }
        fs::remove_file(&path).map_err(|e| OperationError::io(&path, e))?;
        Ok(OperationOutcome::new(format!("File {} has been removed", self.target)))
    }
}

/// Publish whether a file exists as a boolean attribute
///
/// Never fails; an unresolvable target counts as absent.
#[derive(Debug, Clone)]
pub struct FileExists {
    target: FileTarget,
    attribute: String,
}

impl FileExists {
    /// Create probe storing the answer under `attribute`
    #[must_use]
    pub fn new(target: impl Into<FileTarget>, attribute: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            attribute: attribute.into(),
        }
    }
}

impl Operation for FileExists {
    fn description(&self) -> String {
        format!("Check if file {} exists", self.target)
    }

    fn execute(
        &self,
        tree: &Path,
        context: &TransformationContext,
    ) -> Result<OperationOutcome, OperationError> {
        let exists = self
            .target
            .resolve(tree, context)
            .map(|path| path.exists())
            .unwrap_or(false);
        let message = if exists {
            format!("File {} exists", self.target)
        } else {
            format!("File {} does not exist", self.target)
        };
        Ok(OperationOutcome::new(message).with_attribute(self.attribute.clone(), exists))
    }
}
