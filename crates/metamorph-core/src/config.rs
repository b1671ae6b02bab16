//! Engine and per-request configuration
//!
//! - [`EngineConfig`]: process-wide settings of a facade (worker count,
//!   staged folder suffix), loadable from TOML
//! - [`Configuration`]: one request's output mode and property bag

use crate::error::ArgumentError;
use crate::properties::PropertyBag;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the transformation writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Mutate the original folder
    #[default]
    InPlace,
    /// Copy into a new folder first
    NewFolder,
    /// Copy into a new folder, then zip it
    NewFolderCompressed,
}

impl OutputMode {
    /// Check if the application is copied before mutation
    #[inline]
    #[must_use]
    pub fn is_staged(self) -> bool {
        !matches!(self, Self::InPlace)
    }

    /// Check if the staged folder is archived afterwards
    #[inline]
    #[must_use]
    pub fn is_compressed(self) -> bool {
        matches!(self, Self::NewFolderCompressed)
    }
}

/// Per-request configuration
///
/// Immutable once built; build through the constructors so the output
/// folder is checked up front.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    mode: OutputMode,
    output_folder: Option<PathBuf>,
    properties: PropertyBag,
}

impl Configuration {
    /// Transform the original folder
    #[inline]
    #[must_use]
    pub fn in_place(properties: PropertyBag) -> Self {
        Self {
            mode: OutputMode::InPlace,
            output_folder: None,
            properties,
        }
    }

    /// Transform a copy placed next to the original folder
    #[inline]
    #[must_use]
    pub fn new_folder(properties: PropertyBag, compress: bool) -> Self {
        Self {
            mode: staged_mode(compress),
            output_folder: None,
            properties,
        }
    }

    /// Transform a copy placed inside `output_folder`
    ///
    /// # Errors
    /// `ArgumentError::InvalidOutputFolder` if `output_folder` is not an
    /// existing directory.
    pub fn new_folder_at(
        properties: PropertyBag,
        output_folder: impl Into<PathBuf>,
        compress: bool,
    ) -> Result<Self, ArgumentError> {
        let output_folder = output_folder.into();
        if !output_folder.is_dir() {
            return Err(ArgumentError::InvalidOutputFolder(output_folder));
        }
        Ok(Self {
            mode: staged_mode(compress),
            output_folder: Some(output_folder),
            properties,
        })
    }

    /// Output mode
    #[inline]
    #[must_use]
    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Explicit output folder, if any
    #[inline]
    #[must_use]
    pub fn output_folder(&self) -> Option<&Path> {
        self.output_folder.as_deref()
    }

    /// Properties
    #[inline]
    #[must_use]
    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    /// Check the configuration against the application it will act on
    ///
    /// # Errors
    /// - `ArgumentError::InvalidPropertyName` for a bad property name
    /// - `ArgumentError::InvalidOutputFolder` if the output folder vanished
    /// - `ArgumentError::OutputInsideApplication` if staging would copy the
    ///   application into itself
    pub fn validate(&self, application_folder: &Path) -> Result<(), ArgumentError> {
        self.properties.validate()?;

        let Some(output) = self.output_folder.as_deref() else {
            return Ok(());
        };
        if !self.mode.is_staged() {
            return Ok(());
        }

        let output_abs = output
            .canonicalize()
            .map_err(|_| ArgumentError::InvalidOutputFolder(output.to_path_buf()))?;
        let application_abs = application_folder
            .canonicalize()
            .map_err(|_| ArgumentError::InvalidApplicationFolder(application_folder.to_path_buf()))?;

        if output_abs.starts_with(&application_abs) {
            return Err(ArgumentError::OutputInsideApplication {
                output: output.to_path_buf(),
                application: application_folder.to_path_buf(),
            });
        }
        Ok(())
    }
}

fn staged_mode(compress: bool) -> OutputMode {
    if compress {
        OutputMode::NewFolderCompressed
    } else {
        OutputMode::NewFolder
    }
}

/// Engine-level settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum concurrently running requests
    pub max_workers: usize,
    /// Suffix inserted between the original name and the timestamp of a
    /// staged folder
    pub folder_suffix: String,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max workers
    #[inline]
    #[must_use]
    pub fn with_max_workers(mut self, max: usize) -> Self {
        self.max_workers = max;
        self
    }

    /// With staged folder suffix
    #[inline]
    #[must_use]
    pub fn with_folder_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.folder_suffix = suffix.into();
        self
    }

    /// Parse from TOML text; missing keys take their defaults
    ///
    /// # Errors
    /// `ArgumentError::InvalidEngineConfig` on parse or validation failure.
    pub fn from_toml_str(text: &str) -> Result<Self, ArgumentError> {
        let config: Self =
            toml::from_str(text).map_err(|e| ArgumentError::InvalidEngineConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `ArgumentError::InvalidEngineConfig` if the file cannot be read or
    /// parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArgumentError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ArgumentError::InvalidEngineConfig(format!("{}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Check settings
    ///
    /// # Errors
    /// `ArgumentError::InvalidEngineConfig` for zero workers or a suffix that
    /// is blank or contains a path separator.
    pub fn validate(&self) -> Result<(), ArgumentError> {
        if self.max_workers == 0 {
            return Err(ArgumentError::InvalidEngineConfig(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.folder_suffix.trim().is_empty()
            || self.folder_suffix.contains(['/', '\\'])
        {
            return Err(ArgumentError::InvalidEngineConfig(format!(
                "invalid folder suffix '{}'",
                self.folder_suffix
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            folder_suffix: "transformed".to_string(),
        }
    }
}
