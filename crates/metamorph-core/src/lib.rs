//! Metamorph Core
//!
//! The transformation resolution and execution engine.
//!
//! # Architecture
//!
//! ```text
//! TransformationFacade ─► Resolver (optional)
//!         │           ─► UpgradePathBuilder (when upgrading)
//!         ▼
//!    WorkerPool ─► ExecutionPipeline ─► TransformationResult
//!         │                                     │
//!         └──────── TransformationHandle ◄──────┘
//! ```
//!
//! # Core Concepts
//!
//! - [`ExtensionRegistry`]: Registered extensions and the id → factory table
//! - [`Resolver`]: Detects which template applies to an application
//! - [`UpgradePathBuilder`]: Orders versioned steps into an upgrade path
//! - [`ExecutionPipeline`]: Stages the tree and runs operations in order
//! - [`TransformationFacade`]: Asynchronous entry point with a bounded pool
//!
//! # Example
//!
//! ```rust,ignore
//! use metamorph_core::prelude::*;
//! use std::sync::Arc;
//!
//! let registry = ExtensionRegistry::builder().register(MyExtension).build()?;
//! let facade = TransformationFacade::new(Arc::new(registry), EngineConfig::default())?;
//!
//! let configuration = facade.new_folder_configuration([("java.version", "17")], false)?;
//! let result = facade.transform("my-app", "java-upgrade", configuration)?.await?;
//! assert!(result.is_success());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod application;
mod config;
mod error;
mod facade;
mod guard;
mod handle;
mod pipeline;
mod pool;
mod properties;
mod registry;
mod resolver;
mod result;
mod staging;
mod upgrade;
mod version;

pub use application::Application;
pub use config::{Configuration, EngineConfig, OutputMode};
pub use error::{
    ArgumentError, EngineError, EnvironmentError, RegistryError, ResolutionError,
    UpgradePathError,
};
pub use facade::{ExtensionInfo, TransformationFacade, UpgradeRequest};
pub use handle::TransformationHandle;
pub use pipeline::ExecutionPipeline;
pub use pool::{PoolStats, WorkerPool};
pub use properties::{validate_property_name, PropertyBag};
pub use registry::{ExtensionRegistry, ExtensionRegistryBuilder, RegisteredTemplate};
pub use resolver::{Rejection, ResolvedTemplate, Resolver};
pub use result::{
    AbortDetail, OperationResult, OperationStatus, TransformationOutcome, TransformationResult,
};
pub use upgrade::{UpgradePath, UpgradePathBuilder};
pub use version::StepVersion;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the engine
    pub use crate::{
        Configuration, EngineConfig, EngineError, ExtensionRegistry, OperationStatus,
        TransformationFacade, TransformationHandle, TransformationOutcome, TransformationResult,
        UpgradeRequest,
    };
    pub use metamorph_extension::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
