//! Report row projection.
//!
//! Turns paired results into the three lifecycle tables, and raw turn-off
//! events into the consolidated turned-off table.

use std::cmp::Reverse;
use std::collections::HashSet;

use serde::Serialize;

use crate::classify::{ClassifiedEvent, EventCategory};
use crate::correlate::{PairKind, PairedResult};
use crate::types::{RollbackType, RolloutType, format_timestamp};

/// Placeholder for missing identity fields in on/off tables.
pub const SYSTEM_ACTOR: &str = "API/System";

/// Placeholder for missing emails in rollout tables.
pub const UNKNOWN_ACTOR: &str = "Unknown/API";

/// A row type with a fixed column order.
///
/// `COLUMNS` must list the serialized field names in declaration order.
pub trait Tabular: Serialize {
    const COLUMNS: &'static [&'static str];
}

/// How long a flag stayed on before it was turned off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnDurationRow {
    pub flag_key: String,
    pub flag_name: String,
    pub site_href: String,
    pub turn_off_date: String,
    pub turn_on_date: String,
    pub duration_seconds: i64,
    pub turned_off_by_first_name: String,
    pub turned_off_by_last_name: String,
    pub turned_off_by_email: String,
    pub project_key: String,
    pub comment: String,
}

impl Tabular for OnDurationRow {
    const COLUMNS: &'static [&'static str] = &[
        "flag_key",
        "flag_name",
        "site_href",
        "turn_off_date",
        "turn_on_date",
        "duration_seconds",
        "turned_off_by_first_name",
        "turned_off_by_last_name",
        "turned_off_by_email",
        "project_key",
        "comment",
    ];
}

impl OnDurationRow {
    pub fn from_pair(pair: &PairedResult) -> Self {
        let off = &pair.end.event;
        Self {
            flag_key: off.flag_key.to_string(),
            flag_name: off.flag_name.clone(),
            site_href: off.site_href.clone(),
            turn_off_date: format_timestamp(off.timestamp_ms),
            turn_on_date: format_timestamp(pair.start.timestamp_ms()),
            duration_seconds: pair.duration_seconds,
            turned_off_by_first_name: off.actor.first_name_or(SYSTEM_ACTOR).to_string(),
            turned_off_by_last_name: off.actor.last_name_or(SYSTEM_ACTOR).to_string(),
            turned_off_by_email: off.actor.email_or(SYSTEM_ACTOR).to_string(),
            project_key: off.project_key.clone(),
            comment: off.comment.clone().unwrap_or_default(),
        }
    }
}

/// A measured rollout from start to rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolloutRow {
    pub flag_key: String,
    pub flag_name: String,
    pub site_href: String,
    pub project_key: String,
    pub rollout_start_date: String,
    pub rollout_end_date: String,
    pub duration_seconds: i64,
    pub rollout_type: RolloutType,
    pub rollback_type: RollbackType,
    pub started_by_email: String,
    pub ended_by_email: String,
    pub start_comment: String,
    pub end_comment: String,
}

impl Tabular for RolloutRow {
    const COLUMNS: &'static [&'static str] = &[
        "flag_key",
        "flag_name",
        "site_href",
        "project_key",
        "rollout_start_date",
        "rollout_end_date",
        "duration_seconds",
        "rollout_type",
        "rollback_type",
        "started_by_email",
        "ended_by_email",
        "start_comment",
        "end_comment",
    ];
}

impl RolloutRow {
    pub fn from_pair(pair: &PairedResult, rollback_type: RollbackType) -> Self {
        let start = &pair.start.event;
        let end = &pair.end.event;
        let rollout_type = pair
            .start
            .slot
            .as_ref()
            .map_or(RolloutType::Fallthrough, |slot| slot.rollout_type());
        Self {
            flag_key: end.flag_key.to_string(),
            flag_name: end.flag_name.clone(),
            site_href: end.site_href.clone(),
            project_key: end.project_key.clone(),
            rollout_start_date: format_timestamp(start.timestamp_ms),
            rollout_end_date: format_timestamp(end.timestamp_ms),
            duration_seconds: pair.duration_seconds,
            rollout_type,
            rollback_type,
            started_by_email: start.actor.email_or(UNKNOWN_ACTOR).to_string(),
            ended_by_email: end.actor.email_or(UNKNOWN_ACTOR).to_string(),
            start_comment: start.comment.clone().unwrap_or_default(),
            end_comment: end.comment.clone().unwrap_or_default(),
        }
    }
}

/// The three lifecycle tables.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportSet {
    pub on_durations: Vec<OnDurationRow>,
    pub automatic_rollbacks: Vec<RolloutRow>,
    pub manual_rollbacks: Vec<RolloutRow>,
}

impl ReportSet {
    /// Buckets pairs by kind, keeping their order.
    pub fn from_pairs(pairs: &[PairedResult]) -> Self {
        let mut set = Self::default();
        for pair in pairs {
            match pair.kind {
                PairKind::OnOff => set.on_durations.push(OnDurationRow::from_pair(pair)),
                PairKind::RolloutAutomatic => set
                    .automatic_rollbacks
                    .push(RolloutRow::from_pair(pair, RollbackType::Automatic)),
                PairKind::RolloutManual => set
                    .manual_rollbacks
                    .push(RolloutRow::from_pair(pair, RollbackType::Manual)),
            }
        }
        set
    }
}

/// One consolidated turn-off.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TurnedOffRow {
    pub name: String,
    pub site_href: String,
    pub date: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub project_key: String,
}

impl Tabular for TurnedOffRow {
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "site_href",
        "date",
        "first_name",
        "last_name",
        "email",
        "project_key",
    ];
}

/// Distinct turn-off events, newest first, then by flag name.
pub fn turned_off_rows(events: &[ClassifiedEvent]) -> Vec<TurnedOffRow> {
    let mut seen = HashSet::new();
    let mut rows: Vec<(i64, TurnedOffRow)> = events
        .iter()
        .filter(|event| event.category == EventCategory::FlagTurnedOff)
        .map(|event| {
            let raw = &event.event;
            let row = TurnedOffRow {
                name: raw.flag_name.clone(),
                site_href: raw.site_href.clone(),
                date: format_timestamp(raw.timestamp_ms),
                first_name: raw.actor.first_name_or(SYSTEM_ACTOR).to_string(),
                last_name: raw.actor.last_name_or(SYSTEM_ACTOR).to_string(),
                email: raw.actor.email_or(SYSTEM_ACTOR).to_string(),
                project_key: raw.project_key.clone(),
            };
            (raw.timestamp_ms, row)
        })
        .filter(|(_, row)| seen.insert(row.clone()))
        .collect();

    rows.sort_by(|(a_ts, a), (b_ts, b)| (Reverse(a_ts), &a.name).cmp(&(Reverse(b_ts), &b.name)));
    rows.into_iter().map(|(_, row)| row).collect()
}
