//! Assertions on serialized transformation results
//!
//! Results are inspected through their serialized form, so any type that
//! serializes like the engine's result (an `outcome` field and an optional
//! `abort` record carrying `error`) can be checked.

use serde::Serialize;
use serde_json::Value;

/// Assert that `result` aborted with an error containing `expected`
///
/// # Panics
/// When the result did not abort, or aborted for another reason.
pub fn assert_abort(result: &impl Serialize, expected: &str) {
    let value = serde_json::to_value(result)
        .unwrap_or_else(|e| panic!("cannot inspect transformation result: {e}"));
    let outcome = value.get("outcome").and_then(Value::as_str).unwrap_or("<none>");
    assert!(
        outcome == "ABORTED",
        "expected the transformation to abort with '{expected}', but its outcome was {outcome}"
    );

    let error = value
        .get("abort")
        .and_then(|abort| abort.get("error"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    assert!(
        error.contains(expected),
        "expected the transformation to abort with '{expected}', but it aborted with '{error}'"
    );
}
