//! Application under transformation

use crate::error::ArgumentError;
use crate::properties::PropertyBag;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One application folder plus what is known about it
///
/// Created per request; never shared between requests.
#[derive(Debug, Clone)]
pub struct Application {
    folder: PathBuf,
    current_version: Option<String>,
    properties: Arc<PropertyBag>,
}

impl Application {
    /// Create application for an existing folder
    ///
    /// # Errors
    /// `ArgumentError::InvalidApplicationFolder` if `folder` is not an
    /// existing directory.
    pub fn new(folder: impl Into<PathBuf>) -> Result<Self, ArgumentError> {
        let folder = folder.into();
        if !folder.is_dir() {
            return Err(ArgumentError::InvalidApplicationFolder(folder));
        }
        Ok(Self {
            folder,
            current_version: None,
            properties: Arc::new(PropertyBag::new()),
        })
    }

    /// With current version
    #[inline]
    #[must_use]
    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = Some(version.into());
        self
    }

    /// With properties
    #[inline]
    #[must_use]
    pub fn with_properties(mut self, properties: PropertyBag) -> Self {
        self.properties = Arc::new(properties);
        self
    }

    /// Application root folder
    #[inline]
    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Declared or detected current version
    #[inline]
    #[must_use]
    pub fn current_version(&self) -> Option<&str> {
        self.current_version.as_deref()
    }

    /// Properties
    #[inline]
    #[must_use]
    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_folder() {
        let err = Application::new("testTransformation1").unwrap_err();
        assert_eq!(err.to_string(), "invalid application folder testTransformation1");
    }

    #[test]
    fn rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pom.xml");
        std::fs::write(&file, "").unwrap();
        assert!(Application::new(&file).is_err());
    }

    #[test]
    fn builder_sets_version_and_properties() {
        let dir = tempfile::tempdir().unwrap();
        let props = PropertyBag::from_pairs([("target.java", "17")]).unwrap();
        let app = Application::new(dir.path())
            .unwrap()
            .with_current_version("1.1")
            .with_properties(props);

        assert_eq!(app.folder(), dir.path());
        assert_eq!(app.current_version(), Some("1.1"));
        assert_eq!(app.properties().get("target.java"), Some("17"));
    }
}
