//! Audit-log action enum as the single source of truth for action strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Audit-log actions that take part in flag lifecycle reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    /// Flag targeting was switched on or off.
    UpdateOn,
    /// A measured rollout was placed on the fallthrough rule.
    UpdateFallthroughWithMeasuredRollout,
    /// A measured rollout was placed on a targeting rule.
    UpdateRulesWithMeasuredRollout,
    /// The fallthrough measured rollout was stopped.
    StopMeasuredRolloutOnFlagFallthrough,
    /// A rule's measured rollout was stopped.
    StopMeasuredRolloutOnFlagRule,
}

impl AuditAction {
    /// Every tracked action, in the order they are requested from the API.
    pub const ALL: [Self; 5] = [
        Self::UpdateOn,
        Self::UpdateFallthroughWithMeasuredRollout,
        Self::UpdateRulesWithMeasuredRollout,
        Self::StopMeasuredRolloutOnFlagFallthrough,
        Self::StopMeasuredRolloutOnFlagRule,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UpdateOn => "updateOn",
            Self::UpdateFallthroughWithMeasuredRollout => "updateFallthroughWithMeasuredRollout",
            Self::UpdateRulesWithMeasuredRollout => "updateRulesWithMeasuredRollout",
            Self::StopMeasuredRolloutOnFlagFallthrough => "stopMeasuredRolloutOnFlagFallthrough",
            Self::StopMeasuredRolloutOnFlagRule => "stopMeasuredRolloutOnFlagRule",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

impl Serialize for AuditAction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AuditAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for action strings outside the tracked set.
#[derive(Debug, Clone)]
pub struct UnknownAction(String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown audit action: {}", self.0)
    }
}

impl std::error::Error for UnknownAction {}
