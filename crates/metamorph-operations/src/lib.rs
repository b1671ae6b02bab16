//! Metamorph Basic Operations
//!
//! Ready-made [`Operation`](metamorph_extension::Operation)s for templates:
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`AddLine`] | append a line to a file |
//! | [`ReplaceText`] | regex replacement inside a file |
//! | [`CopyFile`] | copy a file inside the application |
//! | [`DeleteFile`] | remove a file |
//! | [`FileExists`] | publish a boolean attribute |
//!
//! Every operation names its file through a [`FileTarget`]: either a path
//! relative to the application root, or a context attribute holding one.
//! Paths that would leave the application are refused.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod file;
mod target;
mod text;

pub use file::{CopyFile, DeleteFile, FileExists};
pub use target::FileTarget;
pub use text::{AddLine, ReplaceText};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
