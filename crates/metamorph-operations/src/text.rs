//! Text file operations
//!
//! - [`AddLine`]: append a line at the end of a file
//! - [`ReplaceText`]: regex replacement inside a file

use crate::target::{FileTarget, Settings};
use metamorph_extension::{
    Condition, Operation, OperationError, OperationOutcome, TransformationContext,
};
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Append a line at the end of a file
///
/// A separator is written first only when the file does not already end with
/// `\n`, so appending never leaves a blank line behind. The new line is
/// always terminated with `\n`, leaving the file newline-terminated for the
/// next append. An empty line is allowed.
#[derive(Debug, Clone)]
pub struct AddLine {
    target: FileTarget,
    line: String,
    settings: Settings,
}

impl AddLine {
    /// Create operation
    #[must_use]
    pub fn new(target: impl Into<FileTarget>, line: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            line: line.into(),
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

impl Operation for AddLine {
    fn description(&self) -> String {
        format!("Add line '{}' to file {}", self.line, self.target)
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

        let existing = fs::read(&path).map_err(|e| OperationError::io(&path, e))?;
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| OperationError::io(&path, e))?;

        let mut appended = String::new();
        if existing.last().is_some_and(|&b| b != b'\n') {
            appended.push('\n');
        }
        appended.push_str(&self.line);
        appended.push('\n');
        file.write_all(appended.as_bytes())
            .map_err(|e| OperationError::io(&path, e))?;

        Ok(OperationOutcome::new(format!(
            "A new line has been added to file {}",
            self.target
        )))
    }
}

/// Replace every (or the first) regex match inside a text file
#[derive(Debug, Clone)]
pub struct ReplaceText {
    target: FileTarget,
    pattern: Regex,
    replacement: String,
    first_only: bool,
    count_attribute: Option<String>,
    settings: Settings,
}

impl ReplaceText {
    /// Create operation
    ///
    /// `replacement` may reference capture groups (`$1`, `${name}`).
    ///
    /// # Errors
    /// `regex::Error` for an invalid pattern.
    pub fn new(
        target: impl Into<FileTarget>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            target: target.into(),
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
            first_only: false,
            count_attribute: None,
            settings: Settings::default(),
        })
    }

    /// Replace the first match only
    #[inline]
    #[must_use]
    pub fn first_only(mut self) -> Self {
        self.first_only = true;
        self
    }

    /// Publish the number of replacements under `name`
    #[inline]
    #[must_use]
    pub fn with_count_attribute(mut self, name: impl Into<String>) -> Self {
        self.count_attribute = Some(name.into());
        self
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

impl Operation for ReplaceText {
    fn description(&self) -> String {
        format!(
            "Replace text matching '{}' with '{}' in file {}",
            self.pattern.as_str(),
            self.replacement,
            self.target
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
        let path = self.target.resolve(tree, context)?;
        if !path.is_file() {
            return Err(OperationError::FileNotFound(path));
        }

        let text = fs::read_to_string(&path).map_err(|e| OperationError::io(&path, e))?;
        let found = self.pattern.find_iter(&text).count();
        let count = if self.first_only { found.min(1) } else { found };

        if count > 0 {
            let replaced = if self.first_only {
                self.pattern.replace(&text, self.replacement.as_str())
            } else {
                self.pattern.replace_all(&text, self.replacement.as_str())
            };
            fs::write(&path, replaced.as_bytes()).map_err(|e| OperationError::io(&path, e))?;
        }
        tracing::trace!(path = %path.display(), count, "text replaced");

        let message = match count {
            0 => format!("No text matching '{}' found in file {}", self.pattern.as_str(), self.target),
            1 => format!("1 occurrence replaced in file {}", self.target),
            n => format!("{n} occurrences replaced in file {}", self.target),
        };
        let mut outcome = OperationOutcome::new(message);
        if let Some(name) = &self.count_attribute {
            outcome = outcome.with_attribute(name.clone(), count);
        }
        Ok(outcome)
    }
}
