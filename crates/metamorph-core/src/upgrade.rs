//! Upgrade path construction
//!
//! An extension's upgrade steps each move an application *to* one version.
//! [`UpgradePathBuilder`] orders them numerically and cuts out the
//! contiguous run between the application's current version (exclusive) and
//! the requested target version (inclusive).

use crate::error::UpgradePathError;
use crate::version::StepVersion;
use metamorph_extension::{TemplateId, UpgradeStepDescriptor};

/// Ordered steps to run for one upgrade request
#[derive(Debug, Clone)]
pub struct UpgradePath {
    extension: String,
    current_version: Option<String>,
    steps: Vec<UpgradeStepDescriptor>,
}

impl UpgradePath {
    /// Extension the steps belong to
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Version the path starts from, if known
    #[inline]
    #[must_use]
    pub fn current_version(&self) -> Option<&str> {
        self.current_version.as_deref()
    }

    /// Steps in execution order
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[UpgradeStepDescriptor] {
        &self.steps
    }

    /// Version reached after the last step
    #[must_use]
    pub fn target_version(&self) -> Option<&str> {
        self.steps.last().map(UpgradeStepDescriptor::version)
    }

    /// Check if the application is already up to date
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Step ids in execution order
    pub fn step_ids(&self) -> impl Iterator<Item = &TemplateId> {
        self.steps.iter().map(UpgradeStepDescriptor::id)
    }
}

/// Builds [`UpgradePath`]s from one extension's steps
#[derive(Debug, Clone)]
pub struct UpgradePathBuilder {
    extension: String,
    steps: Vec<UpgradeStepDescriptor>,
}

impl UpgradePathBuilder {
    /// Create builder over an extension's steps
    #[inline]
    #[must_use]
    pub fn new(extension: impl Into<String>, steps: Vec<UpgradeStepDescriptor>) -> Self {
        Self {
            extension: extension.into(),
            steps,
        }
    }

    /// Build the path from `current_version` to `target_version`
    ///
    /// Blank versions count as absent. An absent current version starts at
    /// the first step; an absent target ends at the last step.
    ///
    /// # Errors
    /// - `UpgradePathError::DuplicateVersion`
    /// - `UpgradePathError::InvalidVersion`
    /// - `UpgradePathError::UnknownCurrentVersion`
    /// - `UpgradePathError::UnknownTargetVersion`
    pub fn build(
        &self,
        current_version: Option<&str>,
        target_version: Option<&str>,
    ) -> Result<UpgradePath, UpgradePathError> {
        let current_version = non_blank(current_version);
        let target_version = non_blank(target_version);
        let ordered = self.ordered()?;

        let start = match current_version {
            None => 0,
            Some(current) => {
                let position = StepVersion::parse(current)
                    .ok()
                    .and_then(|current| ordered.iter().position(|(v, _)| *v == current))
                    .ok_or_else(|| UpgradePathError::UnknownCurrentVersion(current.to_string()))?;
                position + 1
            }
        };

        let end = match target_version {
            None => ordered.len(),
            Some(target) => {
                let position = StepVersion::parse(target)
                    .ok()
                    .and_then(|target| ordered.iter().position(|(v, _)| *v == target))
                    .ok_or_else(|| UpgradePathError::UnknownTargetVersion(target.to_string()))?;
                position + 1
            }
        };

        let steps = if start >= end {
            Vec::new()
        } else {
            ordered[start..end].iter().map(|(_, s)| (*s).clone()).collect()
        };

        tracing::debug!(
            extension = %self.extension,
            current = ?current_version,
            target = ?target_version,
            steps = steps.len(),
            "built upgrade path"
        );

        Ok(UpgradePath {
            extension: self.extension.clone(),
            current_version: current_version.map(str::to_string),
            steps,
        })
    }

    /// Build the path starting at the step named `step`
    ///
    /// The current version is taken to be that of the step ordered right
    /// before it, or unknown if `step` is the lowest.
    ///
    /// # Errors
    /// `UpgradePathError::UnknownStep` if `step` is not one of this
    /// extension's steps, plus everything [`build`](Self::build) returns.
    pub fn build_from_step(
        &self,
        step: &TemplateId,
        target_version: Option<&str>,
    ) -> Result<UpgradePath, UpgradePathError> {
        let ordered = self.ordered()?;
        let position = ordered
            .iter()
            .position(|(_, s)| s.id() == step)
            .ok_or_else(|| UpgradePathError::UnknownStep(step.clone()))?;

        let current = position
            .checked_sub(1)
            .map(|previous| ordered[previous].1.version().to_string());
        self.build(current.as_deref(), target_version)
    }

    /// Validate and sort the steps by version
    fn ordered(&self) -> Result<Vec<(StepVersion, &UpgradeStepDescriptor)>, UpgradePathError> {
        for (i, first) in self.steps.iter().enumerate() {
            let version = first.version().trim();
            if let Some(second) = self.steps[i + 1..]
                .iter()
                .find(|s| s.version().trim() == version)
            {
                return Err(UpgradePathError::DuplicateVersion {
                    version: version.to_string(),
                    first: first.id().clone(),
                    second: second.id().clone(),
                });
            }
        }

        let mut ordered = self
            .steps
            .iter()
            .map(|step| StepVersion::parse(step.version()).map(|v| (v, step)))
            .collect::<Result<Vec<_>, _>>()?;

        ordered.sort_by(|a, b| a.0.cmp(&b.0));

        if let Some(pair) = ordered.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            let (first, second) = if pair[0].1.id() <= pair[1].1.id() {
                (pair[0].1, pair[1].1)
            } else {
                (pair[1].1, pair[0].1)
            };
            return Err(UpgradePathError::DuplicateVersion {
                version: second.version().to_string(),
                first: first.id().clone(),
                second: second.id().clone(),
            });
        }

        Ok(ordered)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use metamorph_extension::TransformationTemplate;

    fn step(id: &'static str, version: &'static str) -> UpgradeStepDescriptor {
        UpgradeStepDescriptor::new(id, version, move || {
            Ok(TransformationTemplate::builder(id, "ext").build())
        })
    }

    fn builder() -> UpgradePathBuilder {
        // declared out of order on purpose
        UpgradePathBuilder::new(
            "ext",
            vec![step("to-2.0", "2.0"), step("to-1.0", "1.0"), step("to-1.1", "1.1")],
        )
    }

    fn ids(path: &UpgradePath) -> Vec<&str> {
        path.step_ids().map(TemplateId::as_str).collect()
    }

    #[test]
    fn from_unknown_to_latest() {
        let path = builder().build(None, None).unwrap();
        assert_eq!(ids(&path), vec!["to-1.0", "to-1.1", "to-2.0"]);
        assert_eq!(path.target_version(), Some("2.0"));
        assert_eq!(path.extension(), "ext");
    }

    #[test]
    fn from_current_to_target() {
        let path = builder().build(Some("1.0"), Some("1.1")).unwrap();
        assert_eq!(ids(&path), vec!["to-1.1"]);
        assert_eq!(path.current_version(), Some("1.0"));
    }

    #[test]
    fn already_up_to_date() {
        let path = builder().build(Some("2.0"), None).unwrap();
        assert!(path.is_empty());
        assert_eq!(path.len(), 0);
    }

    #[test]
    fn target_before_current_is_empty() {
        let path = builder().build(Some("1.1"), Some("1.0")).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn blank_versions_are_absent() {
        let path = builder().build(Some(""), Some("  ")).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.current_version(), None);
    }

    #[test]
    fn unknown_versions() {
        assert!(matches!(
            builder().build(Some("1.5"), None),
            Err(UpgradePathError::UnknownCurrentVersion(v)) if v == "1.5"
        ));
        assert!(matches!(
            builder().build(None, Some("3.0")),
            Err(UpgradePathError::UnknownTargetVersion(v)) if v == "3.0"
        ));
        assert!(matches!(
            builder().build(Some("garbage"), None),
            Err(UpgradePathError::UnknownCurrentVersion(_))
        ));
    }

    #[test]
    fn equivalent_version_spelling_matches() {
        let path = builder().build(Some("1.0.0"), None).unwrap();
        assert_eq!(ids(&path), vec!["to-1.1", "to-2.0"]);
    }

    #[test]
    fn duplicate_version_rejected() {
        let b = UpgradePathBuilder::new("ext", vec![step("a", "1.0"), step("b", "1.0.0")]);
        let err = b.build(None, None).unwrap_err();
        match err {
            UpgradePathError::DuplicateVersion { first, second, .. } => {
                assert_eq!(first.as_str(), "a");
                assert_eq!(second.as_str(), "b");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn duplicate_checked_before_syntax() {
        let b = UpgradePathBuilder::new("ext", vec![step("a", "x"), step("b", "x")]);
        assert!(matches!(
            b.build(None, None),
            Err(UpgradePathError::DuplicateVersion { .. })
        ));
    }

    #[test]
    fn invalid_version_rejected() {
        let b = UpgradePathBuilder::new("ext", vec![step("a", "1.0"), step("b", "two")]);
        assert!(matches!(
            b.build(None, None),
            Err(UpgradePathError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn from_step() {
        let b = builder();
        let path = b.build_from_step(&"to-1.1".into(), None).unwrap();
        assert_eq!(ids(&path), vec!["to-1.1", "to-2.0"]);
        assert_eq!(path.current_version(), Some("1.0"));

        let path = b.build_from_step(&"to-1.0".into(), Some("1.0")).unwrap();
        assert_eq!(ids(&path), vec!["to-1.0"]);
        assert_eq!(path.current_version(), None);

        assert!(matches!(
            b.build_from_step(&"nope".into(), None),
            Err(UpgradePathError::UnknownStep(_))
        ));
    }

    #[test]
    fn no_steps() {
        let path = UpgradePathBuilder::new("ext", Vec::new()).build(None, None).unwrap();
        assert!(path.is_empty());
        assert!(path.target_version().is_none());
    }
}
