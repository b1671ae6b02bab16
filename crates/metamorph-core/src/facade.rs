//! Transformation facade
//!
//! The public entry point of the engine. It:
//! - Validates every request synchronously (arguments, configuration,
//!   upgrade path)
//! - Hands valid requests to its bounded [`WorkerPool`]
//! - Returns a [`TransformationHandle`] immediately
//!
//! Nothing on disk is touched before validation succeeds.

use crate::application::Application;
use crate::config::{Configuration, EngineConfig};
use crate::error::{ArgumentError, EngineError, EnvironmentError};
use crate::guard;
use crate::handle::TransformationHandle;
use crate::pipeline::ExecutionPipeline;
use crate::pool::{PoolStats, WorkerPool};
use crate::properties::PropertyBag;
use crate::registry::{ExtensionRegistry, RegisteredTemplate};
use crate::resolver::{ResolvedTemplate, Resolver};
use crate::result::TransformationResult;
use crate::upgrade::{UpgradePath, UpgradePathBuilder};
use metamorph_extension::TemplateId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use uuid::Uuid;

/// Upgrade request for one extension
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeRequest {
    /// Extension whose upgrade steps are used
    pub extension: String,
    /// Declared current version; detected by the extension when absent
    pub current_version: Option<String>,
    /// Version to stop at; latest when absent or blank
    pub target_version: Option<String>,
}

impl UpgradeRequest {
    /// Create request upgrading to the latest version
    #[inline]
    #[must_use]
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            ..Self::default()
        }
    }

    /// With declared current version
    #[inline]
    #[must_use]
    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = Some(version.into());
        self
    }

    /// With target version
    #[inline]
    #[must_use]
    pub fn with_target_version(mut self, version: impl Into<String>) -> Self {
        self.target_version = Some(version.into());
        self
    }
}

/// Registered extension summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionInfo {
    /// Extension name
    pub name: String,
    /// Extension description
    pub description: String,
    /// Extension version
    pub version: String,
    /// Ids of contributed templates
    pub templates: Vec<TemplateId>,
    /// Ids of contributed upgrade steps
    pub upgrade_steps: Vec<TemplateId>,
}

/// Public asynchronous entry point
#[derive(Debug, Clone)]
pub struct TransformationFacade {
    registry: Arc<ExtensionRegistry>,
    config: EngineConfig,
    pool: WorkerPool,
    pipeline: Arc<ExecutionPipeline>,
}

impl TransformationFacade {
    /// Create facade on the current Tokio runtime
    ///
    /// # Errors
    /// - `ArgumentError::InvalidEngineConfig` for a bad configuration
    /// - `EnvironmentError::NoRuntime` outside a Tokio runtime
    pub fn new(registry: Arc<ExtensionRegistry>, config: EngineConfig) -> Result<Self, EngineError> {
        let runtime = Handle::try_current().map_err(|_| EnvironmentError::NoRuntime)?;
        Self::with_runtime(registry, config, runtime)
    }

    /// Create facade whose workers run on `runtime`
    ///
    /// # Errors
    /// `ArgumentError::InvalidEngineConfig` for a bad configuration.
    pub fn with_runtime(
        registry: Arc<ExtensionRegistry>,
        config: EngineConfig,
        runtime: Handle,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        tracing::info!(
            "Metamorph {} ready with {} extensions and {} workers",
            crate::VERSION,
            registry.len(),
            config.max_workers
        );
        Ok(Self {
            pool: WorkerPool::new(config.max_workers, runtime),
            pipeline: Arc::new(ExecutionPipeline::new(config.folder_suffix.clone())),
            registry,
            config,
        })
    }

    /// Engine version
    #[inline]
    #[must_use]
    pub fn engine_version(&self) -> &'static str {
        crate::VERSION
    }

    /// Registered extensions
    #[must_use]
    pub fn extensions(&self) -> Vec<ExtensionInfo> {
        self.registry
            .extensions()
            .map(|extension| {
                let name = extension.name();
                let mut templates = Vec::new();
                let mut upgrade_steps = Vec::new();
                for id in self.registry.template_ids() {
                    match self.registry.template(id) {
                        Some(RegisteredTemplate::Template { extension, .. }) if extension == name => {
                            templates.push(id.clone());
                        }
                        Some(RegisteredTemplate::UpgradeStep { extension, .. })
                            if extension == name =>
                        {
                            upgrade_steps.push(id.clone());
                        }
                        _ => {}
                    }
                }
                ExtensionInfo {
                    name: name.to_string(),
                    description: extension.description().to_string(),
                    version: extension.version().to_string(),
                    templates,
                    upgrade_steps,
                }
            })
            .collect()
    }

    /// Extension registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Engine configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Worker pool statistics
    #[inline]
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Configuration transforming the original folder
    ///
    /// # Errors
    /// `ArgumentError::InvalidPropertyName`.
    pub fn in_place_configuration<I, K, V>(&self, properties: I) -> Result<Configuration, EngineError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Ok(Configuration::in_place(PropertyBag::from_pairs(properties)?))
    }

    /// Configuration transforming a sibling copy
    ///
    /// # Errors
    /// `ArgumentError::InvalidPropertyName`.
    pub fn new_folder_configuration<I, K, V>(
        &self,
        properties: I,
        compress: bool,
    ) -> Result<Configuration, EngineError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Ok(Configuration::new_folder(
            PropertyBag::from_pairs(properties)?,
            compress,
        ))
    }

    /// Configuration transforming a copy placed in `output_folder`
    ///
    /// # Errors
    /// `ArgumentError::InvalidPropertyName` or
    /// `ArgumentError::InvalidOutputFolder`.
    pub fn new_folder_configuration_at<I, K, V>(
        &self,
        properties: I,
        output_folder: impl Into<PathBuf>,
        compress: bool,
    ) -> Result<Configuration, EngineError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Ok(Configuration::new_folder_at(
            PropertyBag::from_pairs(properties)?,
            output_folder,
            compress,
        )?)
    }

    /// Detect which template applies to `application_folder`
    ///
    /// # Errors
    /// `ArgumentError::InvalidApplicationFolder` or a `ResolutionError`.
    pub fn automatic_resolution(
        &self,
        application_folder: impl Into<PathBuf>,
    ) -> Result<Option<ResolvedTemplate>, EngineError> {
        let application = Application::new(application_folder)?;
        let resolved = Resolver::new(&self.registry).resolve(application.folder())?;
        match &resolved {
            Some(template) => tracing::info!("Resolved template {}", template),
            None => tracing::info!("No template resolved for {}", application.folder().display()),
        }
        Ok(resolved)
    }

    /// Run template `template_id` against `application_folder`
    ///
    /// If `template_id` names an upgrade step, the application is upgraded
    /// starting at that step up to the latest version.
    ///
    /// # Errors
    /// Argument errors, plus upgrade path errors for step ids. An unknown
    /// template id is reported through the handle.
    pub fn transform(
        &self,
        application_folder: impl Into<PathBuf>,
        template_id: impl Into<TemplateId>,
        configuration: Configuration,
    ) -> Result<TransformationHandle, EngineError> {
        self.transform_to_version(application_folder, template_id, None, configuration)
    }

    /// Same as [`transform`](Self::transform), stopping an upgrade at
    /// `target_version`
    ///
    /// `target_version` is ignored for plain templates.
    ///
    /// # Errors
    /// As for [`transform`](Self::transform), plus
    /// `UpgradePathError::UnknownTargetVersion`.
    pub fn transform_to_version(
        &self,
        application_folder: impl Into<PathBuf>,
        template_id: impl Into<TemplateId>,
        target_version: Option<&str>,
        configuration: Configuration,
    ) -> Result<TransformationHandle, EngineError> {
        let template_id = template_id.into();
        if template_id.is_blank() {
            return Err(ArgumentError::BlankTemplateId.into());
        }
        let application = self.application(application_folder, &configuration)?;
        let request_id = Uuid::new_v4();

        let sources = match self.registry.template(&template_id) {
            None => {
                tracing::error!(request = %request_id, template = %template_id, "template not registered");
                return Ok(TransformationHandle::ready(
                    request_id,
                    Err(EnvironmentError::TemplateNotFound(template_id)),
                ));
            }
            Some(entry @ RegisteredTemplate::Template { .. }) => vec![entry.clone()],
            Some(RegisteredTemplate::UpgradeStep { extension, .. }) => {
                let path = UpgradePathBuilder::new(
                    extension.clone(),
                    self.registry.upgrade_steps(extension),
                )
                .build_from_step(&template_id, target_version)?;
                step_sources(&path)
            }
        };

        Ok(self.dispatch(request_id, application, configuration, sources))
    }

    /// Upgrade `application_folder` with one extension's steps
    ///
    /// # Errors
    /// - `ArgumentError::UnknownExtension`
    /// - `ArgumentError::VersionDetectionFailed` if version detection panicked
    /// - other argument errors
    /// - any `UpgradePathError`
    pub fn upgrade(
        &self,
        application_folder: impl Into<PathBuf>,
        request: UpgradeRequest,
        configuration: Configuration,
    ) -> Result<TransformationHandle, EngineError> {
        let extension = self
            .registry
            .extension(&request.extension)
            .ok_or_else(|| ArgumentError::UnknownExtension(request.extension.clone()))?;
        let mut application = self.application(application_folder, &configuration)?;

        let current_version = match request.current_version.filter(|v| !v.trim().is_empty()) {
            Some(version) => Some(version),
            None => guard::catch_panic(|| extension.detect_version(application.folder()))
                .map_err(|reason| ArgumentError::VersionDetectionFailed {
                    extension: request.extension.clone(),
                    reason,
                })?,
        };
        if let Some(version) = &current_version {
            application = application.with_current_version(version.clone());
        }

        let path = UpgradePathBuilder::new(
            request.extension.clone(),
            self.registry.upgrade_steps(&request.extension),
        )
        .build(current_version.as_deref(), request.target_version.as_deref())?;

        let request_id = Uuid::new_v4();
        tracing::info!(
            request = %request_id,
            extension = %request.extension,
            current = ?current_version,
            target = ?path.target_version(),
            steps = path.len(),
            "upgrade path built"
        );

        Ok(self.dispatch(request_id, application, configuration, step_sources(&path)))
    }

    fn application(
        &self,
        application_folder: impl Into<PathBuf>,
        configuration: &Configuration,
    ) -> Result<Application, EngineError> {
        let application = Application::new(application_folder)?
            .with_properties(configuration.properties().clone());
        configuration.validate(application.folder())?;
        Ok(application)
    }

    fn dispatch(
        &self,
        request_id: Uuid,
        application: Application,
        configuration: Configuration,
        sources: Vec<RegisteredTemplate>,
    ) -> TransformationHandle {
        let pipeline = Arc::clone(&self.pipeline);
        let receiver = self.pool.submit(move || -> Result<TransformationResult, EnvironmentError> {
            let templates = sources
                .iter()
                .map(|source| {
                    source
                        .instantiate()
                        .map_err(|e| EnvironmentError::Instantiation {
                            id: source.id().clone(),
                            source: e,
                        })
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| {
                    tracing::error!(request = %request_id, error = %e, "template instantiation failed");
                    e
                })?;
            pipeline.run(request_id, &application, &configuration, &templates)
        });
        TransformationHandle::new(request_id, receiver)
    }
}

fn step_sources(path: &UpgradePath) -> Vec<RegisteredTemplate> {
    path.steps()
        .iter()
        .map(|descriptor| RegisteredTemplate::UpgradeStep {
            extension: path.extension().to_string(),
            descriptor: descriptor.clone(),
        })
        .collect()
}
