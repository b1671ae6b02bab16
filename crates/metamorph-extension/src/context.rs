//! Per-run attribute store shared between operations
//!
//! Provides [`TransformationContext`], the ordered key/value store that
//! operations read from. Operations never write into it directly: the
//! attributes they return in their [`OperationOutcome`](crate::OperationOutcome)
//! are inserted by the engine after the operation has finished, so a value is
//! only ever visible to operations that run strictly later.
//!
//! The context also exposes the request's properties, read-only. They are
//! kept apart from the attributes: a fresh context has no attributes even
//! when the request carries properties.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Ordered attribute store scoped to a single transformation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransformationContext {
    attributes: IndexMap<String, Value>,
    #[serde(skip)]
    properties: Arc<BTreeMap<String, String>>,
}

impl TransformationContext {
    /// Create empty context
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty context carrying the request's properties
    pub fn with_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            attributes: IndexMap::new(),
            properties: Arc::new(
                properties
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Get request property
    #[inline]
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Truthiness used by property conditions
    ///
    /// Absent, blank and `false` (any case) are falsy.
    #[must_use]
    pub fn is_property_true(&self, name: &str) -> bool {
        self.property(name)
            .map(str::trim)
            .is_some_and(|v| !v.is_empty() && !v.eq_ignore_ascii_case("false"))
    }

    /// Iterate request properties sorted by name
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Insert or replace an attribute
    ///
    /// Replacing keeps the attribute's original position.
    /// Returns the previous value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(name.into(), value.into())
    }

    /// Get attribute value
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Get attribute as string slice
    #[inline]
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Get attribute as boolean
    #[inline]
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.attributes.get(name).and_then(Value::as_bool)
    }

    /// Check whether an attribute has been set
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Truthiness used by attribute conditions
    ///
    /// Absent, `null` and `false` are falsy; every other value is truthy.
    #[must_use]
    pub fn is_truthy(&self, name: &str) -> bool {
        match self.attributes.get(name) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => true,
        }
    }

    /// Number of attributes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if no attribute has been set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Attribute names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Iterate attributes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }
}
