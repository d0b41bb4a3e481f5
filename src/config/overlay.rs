//! Command-line setting overlays
// (c) 2024 Ross Younger

use std::{fmt::Display, str::FromStr};

use super::{lines::split_entry, AssignmentError, Settings};

/// A single `KEY=VALUE` given on the command line.
///
/// The syntax is the same as an entry in the configuration file: `=` or `:` separates
/// the key from the value, and the key is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// The setting key, lower-cased
    pub key: String,
    /// The value
    pub value: String,
}

impl FromStr for Assignment {
    type Err = AssignmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) =
            split_entry(s).ok_or_else(|| AssignmentError::MissingDelimiter(s.to_owned()))?;
        if key.is_empty() {
            return Err(AssignmentError::EmptyKey(s.to_owned()));
        }
        Ok(Self { key, value })
    }
}

impl Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Collapses a list of assignments into a setting map.
///
/// Repeating a key adds another line to its value, which is how multi-line settings
/// such as `open` or `environment` are expressed on the command line.
#[must_use]
pub fn overlay(assignments: &[Assignment]) -> Settings {
    let mut settings = Settings::new();
    for a in assignments {
        let _ = settings
            .entry(a.key.clone())
            .and_modify(|v| {
                v.push('\n');
                v.push_str(&a.value);
            })
            .or_insert_with(|| a.value.clone());
    }
    settings
}
