//! End to end transformations through the facade

use metamorph_core::prelude::*;
use metamorph_core::{ArgumentError, EngineError, EnvironmentError, OutputMode};
use metamorph_test_utils::{
    assert_abort, assert_transformation, init_tracing, journal, list_tree, ApplicationFixture,
    ScriptedExtension, ScriptedOperation,
};
use pretty_assertions::assert_eq;
use std::fs::File;
use std::sync::Arc;

const NO_PROPERTIES: [(&str, &str); 0] = [];

fn facade(extension: ScriptedExtension) -> TransformationFacade {
    init_tracing();
    let registry = ExtensionRegistry::builder()
        .register(extension)
        .build()
        .unwrap();
    TransformationFacade::new(Arc::new(registry), EngineConfig::default()).unwrap()
}

#[tokio::test]
async fn attributes_flow_between_operations() {
    let log = journal();
    let facade = facade(ScriptedExtension::new("maven").with_template(
        "java-upgrade",
        vec![
            ScriptedOperation::succeed("detect").publish("java_version", "17"),
            ScriptedOperation::succeed("apply")
                .observe("java_version")
                .journal(&log),
        ],
    ));
    let app = ApplicationFixture::sample("app");
    let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();

    let result = facade
        .transform(app.path(), "java-upgrade", config)
        .unwrap()
        .await
        .unwrap();

    assert_eq!(result.outcome(), TransformationOutcome::Success);
    assert_eq!(result.transformed_folder(), result.application_folder());
    assert_eq!(*log.lock(), vec!["apply", "apply: java_version=\"17\""]);
    assert_eq!(
        result.statuses(),
        vec![OperationStatus::Succeeded, OperationStatus::Succeeded]
    );
    assert_eq!(result.operation("detect").unwrap().message(), Some("detect done"));
}

#[tokio::test]
async fn non_critical_failure_keeps_going() {
    let facade = facade(ScriptedExtension::new("maven").with_template(
        "t",
        vec![
            ScriptedOperation::fail("first", "nothing to do here"),
            ScriptedOperation::succeed("second").critical(),
        ],
    ));
    let app = ApplicationFixture::sample("app");
    let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();

    let result = facade.transform(app.path(), "t", config).unwrap().await.unwrap();

    assert_eq!(result.outcome(), TransformationOutcome::Failed);
    assert_eq!(
        result.statuses(),
        vec![OperationStatus::Failed, OperationStatus::Succeeded]
    );
    let failed = result.operation("first").unwrap();
    assert!(failed.message().unwrap().contains("nothing to do here"));
    assert!(result.abort().is_none());
}

#[tokio::test]
async fn critical_failure_aborts() {
    let log = journal();
    let facade = facade(ScriptedExtension::new("maven").with_template(
        "t",
        vec![
            ScriptedOperation::succeed("first").journal(&log),
            ScriptedOperation::fail("second", "pom.xml is broken").critical(),
            ScriptedOperation::succeed("third").journal(&log),
        ],
    ));
    let app = ApplicationFixture::sample("app");
    let config = facade.new_folder_configuration(NO_PROPERTIES, true).unwrap();

    let result = facade.transform(app.path(), "t", config).unwrap().await.unwrap();

    assert_eq!(result.outcome(), TransformationOutcome::Aborted);
    assert_eq!(result.operations().len(), 2);
    assert_eq!(*log.lock(), vec!["first"]);
    let abort = result.abort().unwrap();
    assert_eq!(abort.operation, "second");
    assert_eq!(abort.template.as_str(), "t");
    assert!(abort.error.contains("pom.xml is broken"));
    assert!(result.archive().is_none());
    assert_abort(&result, "pom.xml is broken");
}

#[tokio::test]
async fn request_properties_are_readable_but_not_attributes() {
    let log = journal();
    let facade = facade(ScriptedExtension::new("maven").with_template(
        "t",
        vec![
            ScriptedOperation::succeed("read")
                .observe_property("java.version")
                .observe_property("missing")
                .observe("java.version")
                .journal(&log),
            ScriptedOperation::succeed("skip tests")
                .requires_property("skip.tests")
                .journal(&log),
            ScriptedOperation::succeed("format")
                .requires_property("format")
                .journal(&log),
        ],
    ));
    let app = ApplicationFixture::sample("app");
    let config = facade
        .in_place_configuration([
            ("java.version", "17"),
            ("skip.tests", "false"),
            ("format", "true"),
        ])
        .unwrap();

    let result = facade.transform(app.path(), "t", config).unwrap().await.unwrap();

    assert!(result.is_success());
    assert_eq!(
        *log.lock(),
        vec![
            "read",
            "read: java.version=<unset>",
            "read: property java.version=17",
            "read: property missing=<unset>",
            "format",
        ]
    );
    assert_eq!(
        result.operation("skip tests").unwrap().status(),
        OperationStatus::Skipped
    );
}

#[tokio::test]
async fn unmet_precondition_is_skipped() {
    let facade = facade(ScriptedExtension::new("maven").with_template(
        "t",
        vec![
            ScriptedOperation::succeed("scan").publish("has_tests", false),
            ScriptedOperation::succeed("fix tests").requires("has_tests"),
        ],
    ));
    let app = ApplicationFixture::sample("app");
    let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();

    let result = facade.transform(app.path(), "t", config).unwrap().await.unwrap();

    assert_eq!(result.outcome(), TransformationOutcome::Success);
    let skipped = result.operation("fix tests").unwrap();
    assert_eq!(skipped.status(), OperationStatus::Skipped);
    assert_eq!(skipped.message(), None);
}

#[tokio::test]
async fn panicking_operation_is_a_failure() {
    let facade = facade(ScriptedExtension::new("maven").with_template(
        "t",
        vec![
            ScriptedOperation::panic("explode", "boom"),
            ScriptedOperation::succeed("after"),
        ],
    ));
    let app = ApplicationFixture::sample("app");
    let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();

    let result = facade.transform(app.path(), "t", config).unwrap().await.unwrap();

    assert_eq!(result.outcome(), TransformationOutcome::Failed);
    assert_eq!(
        result.operation("explode").unwrap().message(),
        Some("operation panicked: boom")
    );
    assert_eq!(
        result.operation("after").unwrap().status(),
        OperationStatus::Succeeded
    );
}

#[tokio::test]
async fn new_folder_leaves_original_untouched() {
    let facade = facade(ScriptedExtension::new("maven").with_template(
        "t",
        vec![ScriptedOperation::succeed("write").write("NOTES.md", "migrated\n")],
    ));
    let app = ApplicationFixture::sample("app");
    let baseline = app.snapshot("baseline");
    let config = facade.new_folder_configuration(NO_PROPERTIES, false).unwrap();
    assert_eq!(config.mode(), OutputMode::NewFolder);

    let result = facade.transform(app.path(), "t", config).unwrap().await.unwrap();

    assert_transformation(&baseline, app.path());
    let transformed = result.transformed_folder();
    assert_ne!(transformed, app.path());
    assert_eq!(transformed.parent(), app.path().canonicalize().unwrap().parent());
    let name = transformed.file_name().unwrap().to_string_lossy();
    assert!(name.starts_with("app-transformed-"), "{name}");
    assert!(list_tree(transformed).contains(&"NOTES.md".to_string()));
}

#[tokio::test]
async fn staged_and_in_place_runs_produce_the_same_tree() {
    let operations = vec![
        ScriptedOperation::succeed("notes").write("NOTES.md", "migrated\n"),
        ScriptedOperation::succeed("config").write("src/main/resources/application.yml", "a: 1\n"),
    ];
    let facade = facade(ScriptedExtension::new("maven").with_template("t", operations));

    let staged_app = ApplicationFixture::sample("app");
    let in_place_app = ApplicationFixture::sample("app");

    let staged = facade
        .transform(
            staged_app.path(),
            "t",
            facade.new_folder_configuration(NO_PROPERTIES, false).unwrap(),
        )
        .unwrap()
        .await
        .unwrap();
    facade
        .transform(
            in_place_app.path(),
            "t",
            facade.in_place_configuration(NO_PROPERTIES).unwrap(),
        )
        .unwrap()
        .await
        .unwrap();

    assert_transformation(staged.transformed_folder(), in_place_app.path());
}

#[tokio::test]
async fn compressed_output_is_a_zip_of_the_transformed_tree() {
    let facade = facade(ScriptedExtension::new("maven").with_template(
        "t",
        vec![ScriptedOperation::succeed("write").write("NOTES.md", "migrated\n")],
    ));
    let app = ApplicationFixture::sample("app");
    let config = facade.new_folder_configuration(NO_PROPERTIES, true).unwrap();

    let result = facade.transform(app.path(), "t", config).unwrap().await.unwrap();

    let archive = result.archive().unwrap();
    assert_eq!(archive.extension().unwrap(), "zip");
    let zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let names: Vec<&str> = zip.file_names().collect();
    assert!(names.contains(&"NOTES.md"));
    assert!(names.contains(&"src/main/java/App.java"));
}

#[tokio::test]
async fn every_request_starts_with_an_empty_context() {
    let log = journal();
    let facade = facade(ScriptedExtension::new("maven").with_template(
        "t",
        vec![ScriptedOperation::succeed("count")
            .observe("visited")
            .publish("visited", true)
            .journal(&log)],
    ));
    let app = ApplicationFixture::sample("app");

    for _ in 0..2 {
        let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();
        facade.transform(app.path(), "t", config).unwrap().await.unwrap();
    }

    assert_eq!(
        *log.lock(),
        vec!["count", "count: visited=<unset>", "count", "count: visited=<unset>"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_on_distinct_folders() {
    let facade = facade(ScriptedExtension::new("maven").with_template(
        "t",
        vec![ScriptedOperation::succeed("write").write("NOTES.md", "migrated\n")],
    ));
    let apps: Vec<ApplicationFixture> = (0..6)
        .map(|i| ApplicationFixture::sample(&format!("app{i}")))
        .collect();

    let handles: Vec<TransformationHandle> = apps
        .iter()
        .map(|app| {
            let config = facade.new_folder_configuration(NO_PROPERTIES, false).unwrap();
            facade.transform(app.path(), "t", config).unwrap()
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let request = handle.request_id();
        let result = handle.await.unwrap();
        assert_eq!(result.id(), request);
        assert!(result.is_success());
        ids.push(result.id());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), apps.len());
    for app in &apps {
        assert_eq!(app.siblings().len(), 1);
    }
    assert_eq!(facade.pool_stats().completed, 6);
}

#[tokio::test]
async fn unknown_template_fails_the_handle() {
    let facade = facade(ScriptedExtension::new("maven"));
    let app = ApplicationFixture::sample("app");
    let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();

    let err = facade
        .transform(app.path(), "missing", config)
        .unwrap()
        .await
        .unwrap_err();
    assert!(matches!(err, EnvironmentError::TemplateNotFound(id) if id.as_str() == "missing"));
}

#[tokio::test]
async fn argument_errors_are_synchronous() {
    let facade = facade(ScriptedExtension::new("maven").with_template("t", Vec::new()));
    let app = ApplicationFixture::sample("app");

    let blank = facade
        .transform(app.path(), "  ", facade.in_place_configuration(NO_PROPERTIES).unwrap())
        .unwrap_err();
    assert!(blank.is_argument_error());

    let missing = facade
        .transform(
            app.path().join("nope"),
            "t",
            facade.in_place_configuration(NO_PROPERTIES).unwrap(),
        )
        .unwrap_err();
    assert!(missing.is_argument_error());

    let inside = facade
        .new_folder_configuration_at(NO_PROPERTIES, app.path().join("src"), false)
        .unwrap();
    assert!(facade.transform(app.path(), "t", inside).unwrap_err().is_argument_error());

    assert!(facade
        .in_place_configuration([("bad name!", "x")])
        .unwrap_err()
        .is_argument_error());
}

#[tokio::test]
async fn broken_factory_is_an_environment_error() {
    let facade = facade(ScriptedExtension::new("maven").with_broken_template("t", "missing resource"));
    let app = ApplicationFixture::sample("app");
    let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();

    let err = facade.transform(app.path(), "t", config).unwrap().await.unwrap_err();
    assert!(matches!(err, EnvironmentError::Instantiation { .. }));
    assert!(err.to_string().contains("missing resource"));
}

fn spring(log: &metamorph_test_utils::Journal) -> ScriptedExtension {
    ScriptedExtension::new("spring")
        .with_detected_version("1.0")
        .with_step("spring-2.0", "2.0", vec![ScriptedOperation::succeed("to 2.0").journal(log)])
        .with_step("spring-1.0", "1.0", vec![ScriptedOperation::succeed("to 1.0").journal(log)])
        .with_step("spring-1.1", "1.1", vec![ScriptedOperation::succeed("to 1.1").journal(log)])
}

#[tokio::test]
async fn upgrade_detects_current_version() {
    let log = journal();
    let facade = facade(spring(&log));
    let app = ApplicationFixture::sample("app");
    let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();

    let result = facade
        .upgrade(app.path(), UpgradeRequest::new("spring"), config)
        .unwrap()
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.current_version(), Some("1.0"));
    assert_eq!(*log.lock(), vec!["to 1.1", "to 2.0"]);
    let templates: Vec<&str> = result.templates().iter().map(TemplateId::as_str).collect();
    assert_eq!(templates, vec!["spring-1.1", "spring-2.0"]);
}

#[tokio::test]
async fn context_carries_across_upgrade_steps() {
    let log = journal();
    let facade = facade(
        ScriptedExtension::new("spring")
            .with_detected_version("1.0")
            .with_step("spring-1.0", "1.0", Vec::new())
            .with_step("spring-1.1", "1.1", vec![ScriptedOperation::succeed("count").publish("x", 5)])
            .with_step(
                "spring-2.0",
                "2.0",
                vec![ScriptedOperation::succeed("read").observe("x").journal(&log)],
            ),
    );
    let app = ApplicationFixture::sample("app");
    let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();

    let result = facade
        .upgrade(app.path(), UpgradeRequest::new("spring"), config)
        .unwrap()
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(*log.lock(), vec!["read", "read: x=5"]);
}

#[tokio::test]
async fn critical_failure_stops_later_upgrade_steps() {
    let log = journal();
    let facade = facade(
        ScriptedExtension::new("spring")
            .with_detected_version("1.0")
            .with_step("spring-1.0", "1.0", Vec::new())
            .with_step("spring-1.1", "1.1", vec![ScriptedOperation::succeed("one").journal(&log)])
            .with_step(
                "spring-1.2",
                "1.2",
                vec![
                    ScriptedOperation::succeed("two").journal(&log),
                    ScriptedOperation::fail("migrate", "descriptor is corrupt").critical(),
                    ScriptedOperation::succeed("after").journal(&log),
                ],
            )
            .with_step("spring-2.0", "2.0", vec![ScriptedOperation::succeed("three").journal(&log)]),
    );
    let app = ApplicationFixture::sample("app");
    let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();

    let result = facade
        .upgrade(app.path(), UpgradeRequest::new("spring"), config)
        .unwrap()
        .await
        .unwrap();

    assert_eq!(result.outcome(), TransformationOutcome::Aborted);
    assert_eq!(
        result.statuses(),
        vec![
            OperationStatus::Succeeded,
            OperationStatus::Succeeded,
            OperationStatus::Failed,
        ]
    );
    assert_eq!(*log.lock(), vec!["one", "two"]);
    let templates: Vec<&str> = result.templates().iter().map(TemplateId::as_str).collect();
    assert_eq!(templates, vec!["spring-1.1", "spring-1.2"]);
    let abort = result.abort().unwrap();
    assert_eq!(abort.template.as_str(), "spring-1.2");
    assert_eq!(abort.operation, "migrate");
    assert_abort(&result, "descriptor is corrupt");
}

#[tokio::test]
async fn panicking_version_detection_is_an_argument_error() {
    let facade = facade(
        ScriptedExtension::new("spring")
            .panicking("cannot read manifest")
            .with_step("spring-1.0", "1.0", Vec::new())
            .with_step("spring-2.0", "2.0", Vec::new()),
    );
    let app = ApplicationFixture::sample("app");
    let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();

    let err = facade
        .upgrade(app.path(), UpgradeRequest::new("spring"), config)
        .unwrap_err();

    assert!(err.is_argument_error());
    match err {
        EngineError::Argument(ArgumentError::VersionDetectionFailed { extension, reason }) => {
            assert_eq!(extension, "spring");
            assert_eq!(reason, "cannot read manifest");
        }
        other => panic!("unexpected error: {other}"),
    }

    let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();
    let request = UpgradeRequest::new("spring").with_current_version("1.0");
    let result = facade.upgrade(app.path(), request, config).unwrap().await.unwrap();
    assert_eq!(result.current_version(), Some("1.0"));
}

#[tokio::test]
async fn upgrade_honors_explicit_versions() {
    let log = journal();
    let facade = facade(spring(&log));
    let app = ApplicationFixture::sample("app");
    let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();

    let request = UpgradeRequest::new("spring")
        .with_current_version("")
        .with_target_version("1.1");
    facade.upgrade(app.path(), request, config).unwrap().await.unwrap();
    assert_eq!(*log.lock(), vec!["to 1.1"]);

    let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();
    let err = facade
        .upgrade(app.path(), UpgradeRequest::new("gradle"), config)
        .unwrap_err();
    assert!(err.is_argument_error());
}

#[tokio::test]
async fn transforming_a_step_runs_the_rest_of_the_path() {
    let log = journal();
    let facade = facade(spring(&log));
    let app = ApplicationFixture::sample("app");
    let config = facade.in_place_configuration(NO_PROPERTIES).unwrap();

    facade
        .transform(app.path(), "spring-1.0", config)
        .unwrap()
        .await
        .unwrap();
    assert_eq!(*log.lock(), vec!["to 1.0", "to 1.1", "to 2.0"]);
}

#[tokio::test]
async fn extensions_are_listed() {
    let facade = facade(spring(&journal()).with_template("spring-boot-fix", Vec::new()));
    let info = facade.extensions();
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].name, "spring");
    assert_eq!(info[0].templates.len(), 1);
    assert_eq!(info[0].upgrade_steps.len(), 3);
    assert_eq!(facade.engine_version(), metamorph_core::VERSION);
}
