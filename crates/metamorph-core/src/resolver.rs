//! Automatic template resolution
//!
//! Every registered extension probes the application folder and answers
//! [`Probe::NoOpinion`], [`Probe::Match`] or [`Probe::Invalid`]. Answers are
//! aggregated as follows:
//!
//! | matches | rejections | result |
//! |---------|------------|--------|
//! | 1       | 0          | the match |
//! | 0       | 0          | nothing, not an error |
//! | ≥2      | any        | `AmbiguousResolution` |
//! | 0 or 1  | ≥1         | `ApplicationRejected` |
//!
//! Matches and rejections are sorted before being reported, so the outcome
//! does not depend on registration order. An extension that panics fails the
//! whole resolution with `ExtensionPanicked`.

use crate::error::ResolutionError;
use crate::guard;
use crate::registry::ExtensionRegistry;
use metamorph_extension::{Probe, TemplateId};
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::path::Path;

/// Template proposed by an extension
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResolvedTemplate {
    extension: String,
    template: TemplateId,
}

impl ResolvedTemplate {
    /// Create resolved template
    #[inline]
    #[must_use]
    pub fn new(extension: impl Into<String>, template: impl Into<TemplateId>) -> Self {
        Self {
            extension: extension.into(),
            template: template.into(),
        }
    }

    /// Proposing extension
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Proposed template id
    #[inline]
    #[must_use]
    pub fn template(&self) -> &TemplateId {
        &self.template
    }
}

impl Display for ResolvedTemplate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.template, self.extension)
    }
}

/// Refusal by an extension that recognised the application
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Rejection {
    extension: String,
    reason: String,
}

impl Rejection {
    /// Create rejection
    #[inline]
    #[must_use]
    pub fn new(extension: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            reason: reason.into(),
        }
    }

    /// Rejecting extension
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Reason given
    #[inline]
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.extension, self.reason)
    }
}

/// Asks every extension about an application folder
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    registry: &'a ExtensionRegistry,
}

impl<'a> Resolver<'a> {
    /// Create resolver over a registry
    #[inline]
    #[must_use]
    pub fn new(registry: &'a ExtensionRegistry) -> Self {
        Self { registry }
    }

    /// Resolve the template applicable to `application_folder`
    ///
    /// Returns `Ok(None)` when no extension has an opinion.
    ///
    /// # Errors
    /// - `ResolutionError::NoExtensionsRegistered`
    /// - `ResolutionError::AmbiguousResolution` for two or more matches
    /// - `ResolutionError::ApplicationRejected` when any extension rejected
    ///   the application and at most one matched
    /// - `ResolutionError::ExtensionPanicked` when an extension panicked
    pub fn resolve(
        &self,
        application_folder: &Path,
    ) -> Result<Option<ResolvedTemplate>, ResolutionError> {
        if self.registry.is_empty() {
            return Err(ResolutionError::NoExtensionsRegistered);
        }

        let mut matches = Vec::new();
        let mut rejections = Vec::new();
        let mut failures = Vec::new();

        for extension in self.registry.extensions() {
            let probe = match guard::catch_panic(|| extension.probe(application_folder)) {
                Ok(probe) => probe,
                Err(reason) => {
                    tracing::error!(extension = extension.name(), %reason, "extension panicked during resolution");
                    failures.push((extension.name().to_string(), reason));
                    continue;
                }
            };
            match probe {
                Probe::NoOpinion => {}
                Probe::Match(template) => {
                    tracing::debug!(extension = extension.name(), %template, "extension matched");
                    matches.push(ResolvedTemplate::new(extension.name(), template));
                }
                Probe::Invalid(reason) => {
                    tracing::debug!(extension = extension.name(), %reason, "extension rejected application");
                    rejections.push(Rejection::new(extension.name(), reason));
                }
            }
        }

        failures.sort();
        if let Some((extension, reason)) = failures.into_iter().next() {
            return Err(ResolutionError::ExtensionPanicked { extension, reason });
        }

        matches.sort();
        rejections.sort();

        if matches.len() > 1 {
            return Err(ResolutionError::AmbiguousResolution { matches });
        }
        if !rejections.is_empty() {
            return Err(ResolutionError::ApplicationRejected { rejections });
        }
        Ok(matches.pop())
    }
}
