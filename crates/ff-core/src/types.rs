//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// An audit entry did not name the flag it touched.
    #[error("audit entry {id} does not reference a flag")]
    MissingFlag { id: String },

    /// An audit entry carried no timestamp.
    #[error("audit entry {id} has no date")]
    MissingDate { id: String },
}

/// Generates a validated string key newtype with common trait implementations.
macro_rules! define_string_key {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new key after validation.
            pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
                let key = key.into();
                if key.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(key))
            }

            /// Returns the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(key: $name) -> Self {
                key.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_key!(
    /// A validated flag key.
    ///
    /// Flag keys are unique within a project and identify one event stream
    /// for correlation.
    FlagKey, "flag key"
);

/// Which targeting slot a measured rollout runs on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSlot {
    /// The flag's default rule.
    Fallthrough,
    /// A named targeting rule. `None` when the entry did not carry a rule id.
    Rule(Option<String>),
}

impl RuleSlot {
    /// Rollout type as written to reports.
    #[must_use]
    pub const fn rollout_type(&self) -> RolloutType {
        match self {
            Self::Fallthrough => RolloutType::Fallthrough,
            Self::Rule(_) => RolloutType::Rule,
        }
    }
}

/// Rollout type column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RolloutType {
    Fallthrough,
    Rule,
}

impl RolloutType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fallthrough => "fallthrough",
            Self::Rule => "rule",
        }
    }
}

impl fmt::Display for RolloutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// How a measured rollout was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackType {
    /// Stopped by rollout monitoring.
    Automatic,
    /// Stopped by a person editing the flag.
    Manual,
}

impl RollbackType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for RollbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders an epoch-millisecond timestamp as `YYYY-MM-DD HH:MM:SS` in UTC.
///
/// Out-of-range values render as the raw millisecond count.
pub fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms).map_or_else(
        || ms.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}
