//! Testing utilities for Metamorph
//!
//! - [`ApplicationFixture`]: temporary application folders
//! - [`ScriptedOperation`] / [`ScriptedExtension`]: deterministic doubles
//! - [`assert_transformation`]: compare a transformed tree with a baseline
//! - [`assert_abort`]: check why a transformation aborted
//! - [`init_tracing`]: route engine logs to the test harness

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

mod fixture;
mod outcome;
mod script;
mod tree;

pub use fixture::{copy_dir, ApplicationFixture};
pub use outcome::assert_abort;
pub use script::{journal, template, Journal, ScriptedExtension, ScriptedOperation};
pub use tree::{
    assert_transformation, assert_transformation_with, compare_trees, compare_trees_with,
    list_tree, Comparison, TreeDiff,
};

use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

static TRACING: Lazy<()> = Lazy::new(|| {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
});

/// Install a test subscriber once per process
///
/// Honors `RUST_LOG`; defaults to `warn`.
pub fn init_tracing() {
    Lazy::force(&TRACING);
}
