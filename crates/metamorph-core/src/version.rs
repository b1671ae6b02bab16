//! Numeric dot-separated versions used to order upgrade steps

use crate::error::UpgradePathError;
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Parsed step version such as `1.10.2`
///
/// Missing trailing components compare as zero, so `1.0` and `1.0.0` are
/// equal.
#[derive(Debug, Clone)]
pub struct StepVersion {
    raw: String,
    components: Vec<u64>,
}

impl StepVersion {
    /// Parse a version string
    ///
    /// # Errors
    /// `UpgradePathError::InvalidVersion` when the string is blank or any
    /// component is not an unsigned integer.
    pub fn parse(raw: &str) -> Result<Self, UpgradePathError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid(raw, "version is blank"));
        }

        let components = trimmed
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid(raw, format!("component '{part}' is not numeric")));
                }
                part.parse::<u64>()
                    .map_err(|e| invalid(raw, format!("component '{part}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            components,
        })
    }

    /// Original text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric components
    #[inline]
    #[must_use]
    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

fn invalid(version: &str, reason: impl Into<String>) -> UpgradePathError {
    UpgradePathError::InvalidVersion {
        version: version.to_string(),
        reason: reason.into(),
    }
}

impl FromStr for StepVersion {
    type Err = UpgradePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for StepVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for StepVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for StepVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for StepVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for StepVersion {}
