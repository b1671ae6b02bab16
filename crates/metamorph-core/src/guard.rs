//! Panic containment around extension code

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Run `f`, returning the panic message instead of unwinding
pub(crate) fn catch_panic<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| panic_message(payload.as_ref()).to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
