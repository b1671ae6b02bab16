//! Execution pipeline
//!
//! Runs one request from start to finish on the calling thread:
//! 1. Stage the application tree (in place or copy)
//! 2. Flatten every template into a single operation list
//! 3. Run operations strictly in order against the staged tree, sharing
//!    one fresh [`TransformationContext`] that exposes the request properties
//! 4. Compress the staged folder if requested
//!
//! # Critical Invariant
//!
//! Operation failures never surface as errors here. They become `FAILED`
//! entries in the result; a failing critical operation halts the run and
//! marks it `ABORTED`. Only staging and compression I/O are errors.

use crate::application::Application;
use crate::config::Configuration;
use crate::error::EnvironmentError;
use crate::result::{
    AbortDetail, OperationResult, OperationStatus, ResultRecorder, TransformationResult,
};
use crate::guard;
use crate::staging;
use metamorph_extension::{
    Condition, Operation, TemplateEntry, TemplateId, TransformationContext, TransformationTemplate,
};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// One operation after group expansion
#[derive(Debug)]
struct FlatOperation<'a> {
    template: &'a TemplateId,
    operation: &'a Arc<dyn Operation>,
    conditions: Vec<&'a Condition>,
}

impl FlatOperation<'_> {
    /// Inherited conditions first, then the operation's own precondition
    fn applies(&self, context: &TransformationContext, tree: &Path) -> bool {
        self.conditions.iter().all(|c| c.evaluate(context, tree))
            && self.operation.precondition(context, tree)
    }
}

fn flatten(template: &TransformationTemplate) -> Vec<FlatOperation<'_>> {
    let mut flat = Vec::with_capacity(template.operation_count());
    flatten_entries(template.id(), template.entries(), &[], &mut flat);
    flat
}

fn flatten_entries<'a>(
    template: &'a TemplateId,
    entries: &'a [TemplateEntry],
    inherited: &[&'a Condition],
    out: &mut Vec<FlatOperation<'a>>,
) {
    for entry in entries {
        match entry {
            TemplateEntry::Operation {
                operation,
                condition,
            } => {
                let mut conditions = inherited.to_vec();
                conditions.extend(condition.iter());
                out.push(FlatOperation {
                    template,
                    operation,
                    conditions,
                });
            }
            TemplateEntry::Group(group) => {
                let mut conditions = inherited.to_vec();
                conditions.extend(group.condition());
                flatten_entries(template, group.entries(), &conditions, out);
            }
        }
    }
}

/// Sequential executor for one request
#[derive(Debug, Clone)]
pub struct ExecutionPipeline {
    folder_suffix: String,
}

impl ExecutionPipeline {
    /// Create pipeline naming staged folders with `folder_suffix`
    #[inline]
    #[must_use]
    pub fn new(folder_suffix: impl Into<String>) -> Self {
        Self {
            folder_suffix: folder_suffix.into(),
        }
    }

    /// Run `templates` in order against `application`
    ///
    /// Context and tree persist across templates, so an upgrade path is just
    /// its steps' templates back to back.
    ///
    /// # Errors
    /// `EnvironmentError::Staging` or `EnvironmentError::Compression`.
    pub fn run(
        &self,
        request_id: Uuid,
        application: &Application,
        configuration: &Configuration,
        templates: &[TransformationTemplate],
    ) -> Result<TransformationResult, EnvironmentError> {
        let span = tracing::info_span!("transformation", request = %request_id);
        let _guard = span.enter();

        tracing::info!(
            application = %application.folder().display(),
            mode = ?configuration.mode(),
            templates = templates.len(),
            "starting transformation"
        );

        let tree = staging::stage(application.folder(), configuration, &self.folder_suffix)
            .map_err(|e| {
                tracing::error!(error = %e, "staging failed");
                e
            })?;

        let mut recorder =
            ResultRecorder::new(request_id, application.folder().to_path_buf(), tree.clone())
                .with_current_version(application.current_version());
        let mut context = TransformationContext::with_properties(application.properties().iter());

        'templates: for template in templates {
            tracing::info!(template = %template.id(), extension = template.extension(), "running template");
            recorder.template_started(template.id());

            for flat in flatten(template) {
                let order = recorder.next_order();
                if let Some(detail) = run_operation(order, &flat, &tree, &mut context, &mut recorder)
                {
                    recorder.abort(detail);
                    break 'templates;
                }
            }
        }

        let archive = if configuration.mode().is_compressed() && !recorder.is_aborted() {
            let archive = staging::compress(&tree).map_err(|e| {
                tracing::error!(error = %e, "compression failed");
                e
            })?;
            tracing::info!(archive = %archive.display(), "compressed transformed application");
            Some(archive)
        } else {
            None
        };

        let result = recorder.finish(archive);
        tracing::info!(
            outcome = %result.outcome(),
            operations = result.operations().len(),
            "transformation finished"
        );
        Ok(result)
    }
}

/// Run one operation, recording its result
///
/// Returns the abort detail when a critical operation failed.
fn run_operation(
    order: usize,
    flat: &FlatOperation<'_>,
    tree: &Path,
    context: &mut TransformationContext,
    recorder: &mut ResultRecorder,
) -> Option<AbortDetail> {
    let operation = flat.operation;
    let description = guarded(|| operation.description())
        .unwrap_or_else(|_| format!("operation #{order}"));
    let critical = operation.is_critical();

    let record = |recorder: &mut ResultRecorder, status, message| {
        recorder.record(OperationResult::new(
            order,
            flat.template.clone(),
            description.clone(),
            status,
            message,
            critical,
        ));
    };

    let outcome = guarded(|| flat.applies(context, tree)).and_then(|applies| {
        if applies {
            guarded(|| operation.execute(tree, context))
                .and_then(|r| r.map(Some).map_err(|e| error_chain(&e)))
        } else {
            Ok(None)
        }
    });

    match outcome {
        Ok(None) => {
            tracing::debug!(order, operation = %description, "skipped");
            record(recorder, OperationStatus::Skipped, None);
            None
        }
        Ok(Some(result)) => {
            let (message, attributes) = result.into_parts();
            for (name, value) in attributes {
                context.insert(name, value);
            }
            tracing::debug!(order, operation = %description, %message, "succeeded");
            let message = (!message.is_empty()).then_some(message);
            record(recorder, OperationStatus::Succeeded, message);
            None
        }
        Err(error) => {
            record(recorder, OperationStatus::Failed, Some(error.clone()));
            if critical {
                tracing::error!(order, operation = %description, %error, "critical operation failed, aborting");
                Some(AbortDetail {
                    template: flat.template.clone(),
                    operation: description.clone(),
                    error,
                })
            } else {
                tracing::warn!(order, operation = %description, %error, "operation failed");
                None
            }
        }
    }
}

/// Call extension code, turning a panic into an error message
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    guard::catch_panic(f).map_err(|message| format!("operation panicked: {message}"))
}

/// Render an error with its sources
fn error_chain(error: &dyn Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !rendered.contains(&cause_text) {
            rendered.push_str(": ");
            rendered.push_str(&cause_text);
        }
        source = cause.source();
    }
    rendered
}
