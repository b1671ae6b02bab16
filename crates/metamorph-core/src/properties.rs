//! Validated configuration properties
//!
//! Property names are checked for syntax only: non blank, ASCII letters,
//! `.`, `_` and `-`. Values are free-form strings. The engine never
//! interprets properties; they are handed to the application untouched.

use crate::error::ArgumentError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[allow(clippy::expect_used)]
static PROPERTY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z._-]+$").expect("property name pattern is valid"));

/// Check a property name
///
/// # Errors
/// `ArgumentError::InvalidPropertyName` when the name is blank or contains
/// a forbidden character.
pub fn validate_property_name(name: &str) -> Result<(), ArgumentError> {
    if PROPERTY_NAME.is_match(name) {
        Ok(())
    } else {
        Err(ArgumentError::InvalidPropertyName(name.to_string()))
    }
}

/// Immutable, validated property bag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag {
    entries: BTreeMap<String, String>,
}

impl PropertyBag {
    /// Create empty bag
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bag from key/value pairs, validating every name
    ///
    /// # Errors
    /// The first `ArgumentError::InvalidPropertyName` encountered.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ArgumentError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries = BTreeMap::new();
        for (key, value) in pairs {
            let key = key.into();
            validate_property_name(&key)?;
            entries.insert(key, value.into());
        }
        Ok(Self { entries })
    }

    /// Re-check every name, used after deserialisation
    ///
    /// # Errors
    /// `ArgumentError::InvalidPropertyName` for the first bad name.
    pub fn validate(&self) -> Result<(), ArgumentError> {
        self.entries.keys().try_for_each(|k| validate_property_name(k))
    }

    /// Get property value
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Check if property is set
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of properties
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        for name in ["a", "spring.profile", "my_prop", "some-name", "A.b_C-d"] {
            assert!(validate_property_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_invalid_names() {
        for name in ["", " ", "a b", "prop1", "a=b", "ünïcode", "a/b", "a\n"] {
            assert!(
                matches!(
                    validate_property_name(name),
                    Err(ArgumentError::InvalidPropertyName(_))
                ),
                "{name:?} should be invalid"
            );
        }
    }

    #[test]
    fn bag_from_pairs() {
        let bag = PropertyBag::from_pairs([("b.key", "2"), ("a.key", "1")]).unwrap();
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get("a.key"), Some("1"));
        assert!(bag.contains("b.key"));
        let names: Vec<_> = bag.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a.key", "b.key"]);
    }

    #[test]
    fn bag_rejects_bad_name() {
        let err = PropertyBag::from_pairs([("ok", "1"), ("not ok", "2")]).unwrap_err();
        assert!(err.to_string().contains("not ok"));
    }

    #[test]
    fn deserialised_bag_is_revalidated() {
        let bag: PropertyBag = serde_json::from_str(r#"{"bad name": "x"}"#).unwrap();
        assert!(bag.validate().is_err());

        let bag: PropertyBag = serde_json::from_str(r#"{"good.name": "x"}"#).unwrap();
        assert!(bag.validate().is_ok());
    }
}
