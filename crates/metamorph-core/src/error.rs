//! Error types for the Metamorph engine
//!
//! Errors are split by when and why they surface:
//! - Argument errors: bad input, rejected synchronously
//! - Registry errors: inconsistent extension registrations
//! - Resolution errors: automatic template detection failures
//! - Upgrade path errors: step chain construction failures
//! - Environment errors: failures the caller could not prevent, delivered
//!   through the transformation handle
//!
//! Operation failures are never errors at this level; they are recorded in
//! the [`TransformationResult`](crate::TransformationResult).

use crate::resolver::{Rejection, ResolvedTemplate};
use metamorph_extension::{ExtensionError, TemplateId};
use std::fmt::Display;
use std::io;
use std::path::PathBuf;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid caller input
    #[error("invalid argument: {0}")]
    Argument(#[from] ArgumentError),

    /// Inconsistent extension registrations
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Automatic template resolution failed
    #[error("template resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    /// Upgrade path could not be built
    #[error("upgrade path error: {0}")]
    UpgradePath(#[from] UpgradePathError),

    /// Environment failure
    #[error("environment error: {0}")]
    Environment(#[from] EnvironmentError),
}

impl EngineError {
    /// Check if the caller could fix this error by changing its input
    #[inline]
    #[must_use]
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::Argument(_)
                | Self::UpgradePath(
                    UpgradePathError::UnknownCurrentVersion(_)
                        | UpgradePathError::UnknownTargetVersion(_)
                        | UpgradePathError::UnknownStep(_)
                )
        )
    }

    /// Check if this is an environment error
    #[inline]
    #[must_use]
    pub fn is_environment_error(&self) -> bool {
        matches!(self, Self::Environment(_))
    }
}

/// Invalid caller input
#[derive(Debug, thiserror::Error)]
pub enum ArgumentError {
    /// Property name fails the syntax check
    #[error("invalid property name '{0}': names must be non blank and only contain letters, '.', '_' or '-'")]
    InvalidPropertyName(String),

    /// Application folder missing or not a directory
    #[error("invalid application folder {}", .0.display())]
    InvalidApplicationFolder(PathBuf),

    /// Output folder missing or not a directory
    #[error("invalid output folder {}", .0.display())]
    InvalidOutputFolder(PathBuf),

    /// Output folder lies inside the application folder
    #[error("output folder {} is inside application folder {}", .output.display(), .application.display())]
    OutputInsideApplication {
        output: PathBuf,
        application: PathBuf,
    },

    /// Template id is empty or whitespace
    #[error("template id cannot be blank")]
    BlankTemplateId,

    /// No extension registered under this name
    #[error("unknown extension '{0}'")]
    UnknownExtension(String),

    /// Engine configuration rejected
    #[error("invalid engine configuration: {0}")]
    InvalidEngineConfig(String),

    /// Extension panicked while detecting the application's version
    #[error("extension '{extension}' failed to detect the application version: {reason}")]
    VersionDetectionFailed { extension: String, reason: String },
}

/// Inconsistent extension registrations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Two extensions share a name
    #[error("extension '{0}' registered twice")]
    DuplicateExtension(String),

    /// Two templates or steps share an id
    #[error("template '{id}' registered by both '{first}' and '{second}'")]
    DuplicateTemplate {
        id: TemplateId,
        first: String,
        second: String,
    },
}

/// Automatic resolution failures
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// Nothing to ask
    #[error("no extensions registered")]
    NoExtensionsRegistered,

    /// More than one extension matched
    #[error("more than one transformation template was resolved: {}", list(.matches))]
    AmbiguousResolution { matches: Vec<ResolvedTemplate> },

    /// Extensions recognised the application but refused it
    #[error("application was rejected: {}", list(.rejections))]
    ApplicationRejected { rejections: Vec<Rejection> },

    /// Extension panicked while evaluating the application
    #[error("extension '{extension}' failed while evaluating the application: {reason}")]
    ExtensionPanicked { extension: String, reason: String },
}

/// Upgrade path construction failures
#[derive(Debug, thiserror::Error)]
pub enum UpgradePathError {
    /// Two steps upgrade to the same version
    #[error("upgrade steps '{first}' and '{second}' both declare version {version}")]
    DuplicateVersion {
        version: String,
        first: TemplateId,
        second: TemplateId,
    },

    /// Version is not numeric dot-separated
    #[error("invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// Declared current version matches no step
    #[error("unknown current version {0}")]
    UnknownCurrentVersion(String),

    /// Requested target version matches no step
    #[error("unknown target version {0}")]
    UnknownTargetVersion(String),

    /// Named step does not belong to the extension
    #[error("unknown upgrade step '{0}'")]
    UnknownStep(TemplateId),
}

/// Failures the caller could not have prevented
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    /// No template or step registered under this id
    #[error("template {0} not found")]
    TemplateNotFound(TemplateId),

    /// Template factory failed
    #[error("template {id} could not be instantiated: {source}")]
    Instantiation {
        id: TemplateId,
        #[source]
        source: ExtensionError,
    },

    /// Copying the application failed
    #[error("staging failed at {}: {source}", .path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing the archive failed
    #[error("compression failed at {}: {source}", .path.display())]
    Compression {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Worker died or the pool is gone
    #[error("worker failure: {0}")]
    Worker(String),

    /// Facade created outside a Tokio runtime
    #[error("no tokio runtime available to host the worker pool")]
    NoRuntime,
}

impl EnvironmentError {
    /// Create staging error for path
    pub fn staging(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Staging {
            path: path.into(),
            source,
        }
    }

    /// Create compression error for path
    pub fn compression(path: impl Into<PathBuf>, source: impl Into<zip::result::ZipError>) -> Self {
        Self::Compression {
            path: path.into(),
            source: source.into(),
        }
    }
}

fn list<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_display() {
        let err = EngineError::from(ArgumentError::BlankTemplateId);
        assert_eq!(err.to_string(), "invalid argument: template id cannot be blank");

        let err = EngineError::from(ArgumentError::InvalidApplicationFolder(
            "testTransformation1".into(),
        ));
        assert_eq!(
            err.to_string(),
            "invalid argument: invalid application folder testTransformation1"
        );
    }

    #[test]
    fn engine_error_classification() {
        assert!(EngineError::from(ArgumentError::BlankTemplateId).is_argument_error());
        assert!(
            EngineError::from(UpgradePathError::UnknownTargetVersion("9.9".into()))
                .is_argument_error()
        );
        assert!(
            !EngineError::from(UpgradePathError::InvalidVersion {
                version: "x".into(),
                reason: "not numeric".into()
            })
            .is_argument_error()
        );
        assert!(EngineError::from(EnvironmentError::NoRuntime).is_environment_error());
        assert!(!EngineError::from(ResolutionError::NoExtensionsRegistered).is_environment_error());
    }

    #[test]
    fn resolution_error_lists_matches() {
        let err = ResolutionError::AmbiguousResolution {
            matches: vec![
                ResolvedTemplate::new("ext-a", "template-a"),
                ResolvedTemplate::new("ext-b", "template-b"),
            ],
        };
        let message = err.to_string();
        assert!(message.contains("template-a (ext-a)"));
        assert!(message.contains("template-b (ext-b)"));
    }

    #[test]
    fn rejection_error_lists_reasons() {
        let err = ResolutionError::ApplicationRejected {
            rejections: vec![Rejection::new("ext-a", "missing pom.xml")],
        };
        assert_eq!(
            err.to_string(),
            "application was rejected: ext-a: missing pom.xml"
        );
    }

    #[test]
    fn staging_error_keeps_source() {
        use std::error::Error;

        let err = EnvironmentError::staging(
            "/tmp/app",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/tmp/app"));
    }
}
