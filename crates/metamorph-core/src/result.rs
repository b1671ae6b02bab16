//! Transformation results
//!
//! A [`TransformationResult`] is produced exactly once per request. It lists
//! every operation in execution order (skipped ones included) and the overall
//! [`TransformationOutcome`].

use chrono::{DateTime, Utc};
use metamorph_extension::TemplateId;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Status of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    /// Ran and returned an outcome
    Succeeded,
    /// Precondition did not hold
    Skipped,
    /// Returned an error or panicked
    Failed,
}

impl Display for OperationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Succeeded => "SUCCEEDED",
            Self::Skipped => "SKIPPED",
            Self::Failed => "FAILED",
        })
    }
}

/// Record of one executed or skipped operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    order: usize,
    template: TemplateId,
    description: String,
    status: OperationStatus,
    message: Option<String>,
    critical: bool,
}

impl OperationResult {
    pub(crate) fn new(
        order: usize,
        template: TemplateId,
        description: String,
        status: OperationStatus,
        message: Option<String>,
        critical: bool,
    ) -> Self {
        Self {
            order,
            template,
            description,
            status,
            message,
            critical,
        }
    }

    /// Position in execution order, starting at 1
    #[inline]
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Template the operation belongs to
    #[inline]
    #[must_use]
    pub fn template(&self) -> &TemplateId {
        &self.template
    }

    /// Operation description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Status
    #[inline]
    #[must_use]
    pub fn status(&self) -> OperationStatus {
        self.status
    }

    /// Outcome message or error detail
    #[inline]
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Whether the operation was critical
    #[inline]
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.critical
    }
}

/// Overall outcome of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformationOutcome {
    /// Every operation succeeded or was skipped
    Success,
    /// At least one non-critical operation failed
    Failed,
    /// A critical operation failed; later operations never ran
    Aborted,
}

impl Display for TransformationOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Aborted => "ABORTED",
        })
    }
}

/// Why a request was aborted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortDetail {
    /// Template of the failing operation
    pub template: TemplateId,
    /// Description of the failing operation
    pub operation: String,
    /// Error rendered with its sources
    pub error: String,
}

/// Result of one transformation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationResult {
    id: Uuid,
    outcome: TransformationOutcome,
    templates: Vec<TemplateId>,
    operations: Vec<OperationResult>,
    abort: Option<AbortDetail>,
    application_folder: PathBuf,
    current_version: Option<String>,
    transformed_folder: PathBuf,
    archive: Option<PathBuf>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl TransformationResult {
    /// Request id
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Overall outcome
    #[inline]
    #[must_use]
    pub fn outcome(&self) -> TransformationOutcome {
        self.outcome
    }

    /// Check if the outcome is [`TransformationOutcome::Success`]
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == TransformationOutcome::Success
    }

    /// Templates that were run, in order
    #[inline]
    #[must_use]
    pub fn templates(&self) -> &[TemplateId] {
        &self.templates
    }

    /// Operation results in execution order
    #[inline]
    #[must_use]
    pub fn operations(&self) -> &[OperationResult] {
        &self.operations
    }

    /// First operation result with this description
    #[must_use]
    pub fn operation(&self, description: &str) -> Option<&OperationResult> {
        self.operations.iter().find(|o| o.description == description)
    }

    /// Abort detail, set only when aborted
    #[inline]
    #[must_use]
    pub fn abort(&self) -> Option<&AbortDetail> {
        self.abort.as_ref()
    }

    /// Original application folder
    #[inline]
    #[must_use]
    pub fn application_folder(&self) -> &Path {
        &self.application_folder
    }

    /// Application version the run started from, declared or detected
    #[inline]
    #[must_use]
    pub fn current_version(&self) -> Option<&str> {
        self.current_version.as_deref()
    }

    /// Folder the operations acted on
    ///
    /// Same as [`application_folder`](Self::application_folder) in place.
    #[inline]
    #[must_use]
    pub fn transformed_folder(&self) -> &Path {
        &self.transformed_folder
    }

    /// Archive of the transformed folder, when compressed
    #[inline]
    #[must_use]
    pub fn archive(&self) -> Option<&Path> {
        self.archive.as_deref()
    }

    /// Start time
    #[inline]
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// End time
    #[inline]
    #[must_use]
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Number of operations with `status`
    #[must_use]
    pub fn count(&self, status: OperationStatus) -> usize {
        self.operations.iter().filter(|o| o.status == status).count()
    }

    /// Statuses in execution order
    #[must_use]
    pub fn statuses(&self) -> Vec<OperationStatus> {
        self.operations.iter().map(|o| o.status).collect()
    }
}

/// Accumulates a result while the pipeline runs
#[derive(Debug)]
pub(crate) struct ResultRecorder {
    id: Uuid,
    started_at: DateTime<Utc>,
    application_folder: PathBuf,
    current_version: Option<String>,
    transformed_folder: PathBuf,
    templates: Vec<TemplateId>,
    operations: Vec<OperationResult>,
    abort: Option<AbortDetail>,
}

impl ResultRecorder {
    pub(crate) fn new(id: Uuid, application_folder: PathBuf, transformed_folder: PathBuf) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            application_folder,
            current_version: None,
            transformed_folder,
            templates: Vec::new(),
            operations: Vec::new(),
            abort: None,
        }
    }

    pub(crate) fn with_current_version(mut self, version: Option<&str>) -> Self {
        self.current_version = version.map(str::to_string);
        self
    }

    pub(crate) fn template_started(&mut self, template: &TemplateId) {
        self.templates.push(template.clone());
    }

    pub(crate) fn next_order(&self) -> usize {
        self.operations.len() + 1
    }

    pub(crate) fn record(&mut self, result: OperationResult) {
        self.operations.push(result);
    }

    pub(crate) fn abort(&mut self, detail: AbortDetail) {
        self.abort = Some(detail);
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.abort.is_some()
    }

    pub(crate) fn finish(self, archive: Option<PathBuf>) -> TransformationResult {
        let outcome = if self.abort.is_some() {
            TransformationOutcome::Aborted
        } else if self
            .operations
            .iter()
            .any(|o| o.status == OperationStatus::Failed)
        {
            TransformationOutcome::Failed
        } else {
            TransformationOutcome::Success
        };

        TransformationResult {
            id: self.id,
            outcome,
            templates: self.templates,
            operations: self.operations,
            abort: self.abort,
            application_folder: self.application_folder,
            current_version: self.current_version,
            transformed_folder: self.transformed_folder,
            archive,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> ResultRecorder {
        ResultRecorder::new(Uuid::new_v4(), "/app".into(), "/app".into())
    }

    fn op(r: &ResultRecorder, description: &str, status: OperationStatus) -> OperationResult {
        OperationResult::new(
            r.next_order(),
            "t".into(),
            description.to_string(),
            status,
            None,
            false,
        )
    }

    #[test]
    fn empty_run_succeeds() {
        let result = recorder().finish(None);
        assert_eq!(result.outcome(), TransformationOutcome::Success);
        assert!(result.is_success());
        assert!(result.operations().is_empty());
        assert!(result.finished_at() >= result.started_at());
    }

    #[test]
    fn failure_marks_failed() {
        let mut r = recorder();
        let first = op(&r, "a", OperationStatus::Succeeded);
        r.record(first);
        let second = op(&r, "b", OperationStatus::Failed);
        r.record(second);
        let third = op(&r, "c", OperationStatus::Skipped);
        r.record(third);

        let result = r.finish(None);
        assert_eq!(result.outcome(), TransformationOutcome::Failed);
        assert_eq!(
            result.statuses(),
            vec![
                OperationStatus::Succeeded,
                OperationStatus::Failed,
                OperationStatus::Skipped
            ]
        );
        assert_eq!(result.count(OperationStatus::Failed), 1);
        assert_eq!(result.operation("c").unwrap().order(), 3);
    }

    #[test]
    fn abort_wins() {
        let mut r = recorder();
        r.abort(AbortDetail {
            template: "t".into(),
            operation: "critical".to_string(),
            error: "boom".to_string(),
        });
        assert!(r.is_aborted());
        let result = r.finish(None);
        assert_eq!(result.outcome(), TransformationOutcome::Aborted);
        assert_eq!(result.abort().unwrap().error, "boom");
    }

    #[test]
    fn result_serialises() {
        let mut r = recorder();
        r.template_started(&"t".into());
        let first = op(&r, "a", OperationStatus::Succeeded);
        r.record(first);
        let result = r.finish(Some("/app.zip".into()));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"], "SUCCESS");
        assert_eq!(json["operations"][0]["status"], "SUCCEEDED");
        assert_eq!(json["archive"], "/app.zip");

        let back: TransformationResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
