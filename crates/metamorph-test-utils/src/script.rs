//! Scripted operations and extensions
//!
//! Deterministic doubles for exercising the engine without touching real
//! migration logic.

use metamorph_extension::{
    Extension, ExtensionError, Operation, OperationError, OperationOutcome, Probe,
    TemplateDescriptor, TemplateId, TransformationContext, TransformationTemplate,
    UpgradeStepDescriptor,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Shared record of executed operations, in execution order
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Create empty journal
#[must_use]
pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Debug, Clone)]
enum Behavior {
    Succeed,
    Fail(String),
    Panic(String),
}

/// Operation whose behavior is fixed at construction
///
/// Executed operations append their description to the attached journal.
/// Observed attributes are appended as `description: name=value`.
#[derive(Debug, Clone)]
pub struct ScriptedOperation {
    description: String,
    behavior: Behavior,
    critical: bool,
    requires: Option<String>,
    requires_property: Option<String>,
    publishes: Vec<(String, Value)>,
    observes: Vec<String>,
    observes_properties: Vec<String>,
    writes: Vec<(String, String)>,
    journal: Option<Journal>,
}

impl ScriptedOperation {
    fn with_behavior(description: impl Into<String>, behavior: Behavior) -> Self {
        Self {
            description: description.into(),
            behavior,
            critical: false,
            requires: None,
            requires_property: None,
            publishes: Vec::new(),
            observes: Vec::new(),
            observes_properties: Vec::new(),
            writes: Vec::new(),
            journal: None,
        }
    }

    /// Operation that always succeeds
    pub fn succeed(description: impl Into<String>) -> Self {
        Self::with_behavior(description, Behavior::Succeed)
    }

    /// Operation that always fails with `reason`
    pub fn fail(description: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::with_behavior(description, Behavior::Fail(reason.into()))
    }

    /// Operation that panics with `message`
    pub fn panic(description: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_behavior(description, Behavior::Panic(message.into()))
    }

    #[must_use]
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Only run when attribute `name` is truthy
    #[must_use]
    pub fn requires(mut self, name: impl Into<String>) -> Self {
        self.requires = Some(name.into());
        self
    }

    /// Only run when request property `name` is set and not `false`
    #[must_use]
    pub fn requires_property(mut self, name: impl Into<String>) -> Self {
        self.requires_property = Some(name.into());
        self
    }

    /// Publish `name = value` on success
    #[must_use]
    pub fn publish(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.publishes.push((name.into(), value.into()));
        self
    }

    /// Record the value of attribute `name` seen at execution time
    #[must_use]
    pub fn observe(mut self, name: impl Into<String>) -> Self {
        self.observes.push(name.into());
        self
    }

    /// Record the request property `name` seen at execution time
    #[must_use]
    pub fn observe_property(mut self, name: impl Into<String>) -> Self {
        self.observes_properties.push(name.into());
        self
    }

    /// Write `content` to `relative` inside the tree before finishing
    #[must_use]
    pub fn write(mut self, relative: impl Into<String>, content: impl Into<String>) -> Self {
        self.writes.push((relative.into(), content.into()));
        self
    }

    #[must_use]
    pub fn journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(Arc::clone(journal));
        self
    }

    fn record(&self, entry: String) {
        if let Some(journal) = &self.journal {
            journal.lock().push(entry);
        }
    }
}

impl Operation for ScriptedOperation {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn precondition(&self, context: &TransformationContext, _tree: &Path) -> bool {
        self.requires
            .as_deref()
            .map_or(true, |name| context.is_truthy(name))
            && self
                .requires_property
                .as_deref()
                .map_or(true, |name| context.is_property_true(name))
    }

    fn is_critical(&self) -> bool {
        self.critical
    }

    fn execute(
        &self,
        tree: &Path,
        context: &TransformationContext,
    ) -> Result<OperationOutcome, OperationError> {
        self.record(self.description.clone());
        for name in &self.observes {
            let seen = context
                .get(name)
                .map_or_else(|| "<unset>".to_string(), ToString::to_string);
            self.record(format!("{}: {name}={seen}", self.description));
        }
        for name in &self.observes_properties {
            let seen = context.property(name).unwrap_or("<unset>");
            self.record(format!("{}: property {name}={seen}", self.description));
        }

        for (relative, content) in &self.writes {
            let path = tree.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| OperationError::io(parent, e))?;
            }
            std::fs::write(&path, content).map_err(|e| OperationError::io(&path, e))?;
        }

        match &self.behavior {
            Behavior::Succeed => {
                let mut outcome = OperationOutcome::new(format!("{} done", self.description));
                for (name, value) in &self.publishes {
                    outcome = outcome.with_attribute(name.clone(), value.clone());
                }
                Ok(outcome)
            }
            Behavior::Fail(reason) => Err(OperationError::failed(reason.clone())),
            Behavior::Panic(message) => panic!("{message}"),
        }
    }
}

/// Build a template from a list of operations
#[must_use]
pub fn template(
    id: &str,
    extension: &str,
    operations: Vec<ScriptedOperation>,
) -> TransformationTemplate {
    operations
        .into_iter()
        .fold(TransformationTemplate::builder(id, extension), |builder, op| builder.add(op))
        .build()
}

/// Extension assembled from closures and canned answers
#[derive(Debug, Clone)]
pub struct ScriptedExtension {
    name: String,
    probe: Probe,
    detected_version: Option<String>,
    panic_message: Option<String>,
    templates: Vec<TemplateDescriptor>,
    steps: Vec<UpgradeStepDescriptor>,
}

impl ScriptedExtension {
    /// Create extension with no templates and no opinion on any folder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probe: Probe::NoOpinion,
            detected_version: None,
            panic_message: None,
            templates: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Answer every probe with `probe`
    #[must_use]
    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }

    /// Probe answers `Match(id)`
    #[must_use]
    pub fn matching(self, id: &str) -> Self {
        self.with_probe(Probe::Match(TemplateId::new(id)))
    }

    /// Probe answers `Invalid(reason)`
    #[must_use]
    pub fn rejecting(self, reason: &str) -> Self {
        self.with_probe(Probe::Invalid(reason.to_string()))
    }

    /// Probe and version detection panic with `message`
    #[must_use]
    pub fn panicking(mut self, message: &str) -> Self {
        self.panic_message = Some(message.to_string());
        self
    }

    #[must_use]
    pub fn with_detected_version(mut self, version: impl Into<String>) -> Self {
        self.detected_version = Some(version.into());
        self
    }

    /// Contribute template `id` built from fresh copies of `operations`
    #[must_use]
    pub fn with_template(mut self, id: &str, operations: Vec<ScriptedOperation>) -> Self {
        let extension = self.name.clone();
        let owned = id.to_string();
        self.templates.push(TemplateDescriptor::new(id, move || {
            Ok(template(&owned, &extension, operations.clone()))
        }));
        self
    }

    /// Contribute template `id` whose factory always fails
    #[must_use]
    pub fn with_broken_template(mut self, id: &str, reason: &str) -> Self {
        let owned = id.to_string();
        let reason = reason.to_string();
        self.templates.push(TemplateDescriptor::new(id, move || {
            Err(ExtensionError::instantiation(owned.as_str(), reason.as_str()))
        }));
        self
    }

    /// Contribute upgrade step `id` reaching `version`
    #[must_use]
    pub fn with_step(mut self, id: &str, version: &str, operations: Vec<ScriptedOperation>) -> Self {
        let extension = self.name.clone();
        let owned = id.to_string();
        self.steps.push(UpgradeStepDescriptor::new(id, version, move || {
            Ok(template(&owned, &extension, operations.clone()))
        }));
        self
    }
}

impl Extension for ScriptedExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "scripted extension"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn templates(&self) -> Vec<TemplateDescriptor> {
        self.templates.clone()
    }

    fn upgrade_steps(&self) -> Vec<UpgradeStepDescriptor> {
        self.steps.clone()
    }

    fn probe(&self, _application_folder: &Path) -> Probe {
        if let Some(message) = &self.panic_message {
            panic!("{message}");
        }
        self.probe.clone()
    }

    fn detect_version(&self, _application_folder: &Path) -> Option<String> {
        if let Some(message) = &self.panic_message {
            panic!("{message}");
        }
        self.detected_version.clone()
    }
}
