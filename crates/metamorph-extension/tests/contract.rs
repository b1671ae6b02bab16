//! Extension contract as seen by an extension author

use metamorph_extension::prelude::*;
use pretty_assertions::assert_eq;
use std::path::Path;

#[derive(Debug)]
struct Touch(&'static str);

impl Operation for Touch {
    fn description(&self) -> String {
        format!("Touch {}", self.0)
    }

    fn execute(
        &self,
        tree: &Path,
        _context: &TransformationContext,
    ) -> Result<OperationOutcome, OperationError> {
        let path = tree.join(self.0);
        std::fs::write(&path, "").map_err(|e| OperationError::io(&path, e))?;
        Ok(OperationOutcome::new(format!("{} touched", self.0)).with_attribute("touched", self.0))
    }
}

#[derive(Debug)]
struct Sample;

impl Extension for Sample {
    fn name(&self) -> &str {
        "sample"
    }

    fn templates(&self) -> Vec<TemplateDescriptor> {
        vec![TemplateDescriptor::new("touch", || {
            Ok(TransformationTemplate::builder("touch", "sample")
                .add(Touch("a.txt"))
                .add_group(
                    OperationGroup::new("extra")
                        .when(Condition::IfAttribute("touched".into()))
                        .add(Touch("b.txt")),
                )
                .build())
        })
        .with_description("Create marker files")]
    }

    fn upgrade_steps(&self) -> Vec<UpgradeStepDescriptor> {
        vec![UpgradeStepDescriptor::new("to-2", "2.0", || {
            Ok(TransformationTemplate::builder("to-2", "sample").build())
        })]
    }
}

#[test]
fn descriptors_describe_contributions() {
    let templates = Sample.templates();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].id().as_str(), "touch");
    assert_eq!(templates[0].description(), "Create marker files");

    let template = templates[0].instantiate().unwrap();
    assert_eq!(template.operation_count(), 2);

    let steps = Sample.upgrade_steps();
    let step = steps[0].instantiate().unwrap();
    assert_eq!(step.version(), "2.0");
    assert_eq!(step.template().id().as_str(), "to-2");
}

#[test]
fn default_hooks() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(Sample.probe(dir.path()), Probe::NoOpinion);
    assert_eq!(Sample.detect_version(dir.path()), None);
    assert_eq!(Sample.version(), "0.0.0");
}

#[test]
fn operation_outcome_publishes_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = Touch("a.txt")
        .execute(dir.path(), &TransformationContext::new())
        .unwrap();
    assert_eq!(outcome.message(), "a.txt touched");
    assert_eq!(
        outcome.attributes().to_vec(),
        vec![("touched".to_string(), serde_json::json!("a.txt"))]
    );
    assert!(dir.path().join("a.txt").is_file());
}
