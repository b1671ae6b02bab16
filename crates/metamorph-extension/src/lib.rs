//! Metamorph Extension API
//!
//! Everything an extension author needs to package migration logic.
//!
//! # Core Concepts
//!
//! - [`Operation`]: One pluggable, preconditioned, possibly critical mutation
//! - [`TransformationTemplate`]: Ordered set of operations implementing one migration
//! - [`UpgradeStep`]: Template tagged with the version it upgrades to
//! - [`Extension`]: Contributor of templates, upgrade steps and a resolution probe
//! - [`TransformationContext`]: Per-run attribute store shared between operations
//!
//! # Example
//!
//! ```rust,ignore
//! use metamorph_extension::prelude::*;
//!
//! #[derive(Debug)]
//! struct MyExtension;
//!
//! impl Extension for MyExtension {
//!     fn name(&self) -> &str { "my-extension" }
//!
//!     fn templates(&self) -> Vec<TemplateDescriptor> {
//!         vec![TemplateDescriptor::new("my-template", || {
//!             Ok(TransformationTemplate::builder("my-template", "my-extension")
//!                 .add(MyOperation::new())
//!                 .build())
//!         })]
//!     }
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod condition;
mod context;
mod extension;
mod operation;
mod template;

pub use condition::Condition;
pub use context::TransformationContext;
pub use extension::{
    Extension, ExtensionError, Probe, TemplateDescriptor, TemplateFactory, UpgradeStepDescriptor,
};
pub use operation::{Operation, OperationError, OperationOutcome};
pub use template::{
    OperationGroup, TemplateBuilder, TemplateEntry, TemplateId, TransformationTemplate,
    UpgradeStep,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing extensions
    pub use crate::{
        Condition, Extension, ExtensionError, Operation, OperationError, OperationGroup,
        OperationOutcome, Probe, TemplateDescriptor, TemplateId, TransformationContext,
        TransformationTemplate, UpgradeStep, UpgradeStepDescriptor,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
