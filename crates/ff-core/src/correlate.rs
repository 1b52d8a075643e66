//! Lifecycle correlation.
//!
//! Pairs start events with the next matching end event of the same flag.
//!
//! # Algorithm Summary
//!
//! 1. Drop ignored events and group the rest by (project, flag), ordering
//!    flags by their earliest event and each flag's events by time
//! 2. Walk each flag's events keeping one open slot for the on/off pair and
//!    one per rollout rule slot
//! 3. A repeated start replaces the open one (last start wins); an end with
//!    nothing open is dropped; slots still open at the end are dropped

use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::classify::{ClassifiedEvent, EventCategory};
use crate::types::{FlagKey, RuleSlot};

/// Which report a paired result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairKind {
    /// Flag turned on, then off.
    OnOff,
    /// Measured rollout stopped by monitoring.
    RolloutAutomatic,
    /// Measured rollout stopped by hand.
    RolloutManual,
}

/// A start event and the end event that closed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedResult {
    pub kind: PairKind,
    pub start: ClassifiedEvent,
    pub end: ClassifiedEvent,
    /// Whole seconds between start and end.
    pub duration_seconds: i64,
}

impl PairedResult {
    fn new(kind: PairKind, start: ClassifiedEvent, end: ClassifiedEvent) -> Self {
        let duration_seconds = (end.timestamp_ms() - start.timestamp_ms()) / 1000;
        Self {
            kind,
            start,
            end,
            duration_seconds,
        }
    }
}

/// Open intervals for one flag.
#[derive(Debug, Default)]
struct FlagState {
    open_on: Option<ClassifiedEvent>,
    open_rollouts: HashMap<RuleSlot, ClassifiedEvent>,
}

/// Pairs the events of a single flag.
///
/// Events must be sorted by timestamp ascending.
pub fn correlate_flag(events: Vec<ClassifiedEvent>) -> Vec<PairedResult> {
    let mut state = FlagState::default();
    let mut results = Vec::new();

    for event in events {
        match event.category {
            EventCategory::FlagTurnedOn => {
                if let Some(orphan) = state.open_on.replace(event) {
                    tracing::debug!(
                        flag = %orphan.flag_key(),
                        at = orphan.timestamp_ms(),
                        "discarding turn-on superseded by a later turn-on"
                    );
                }
            }
            EventCategory::FlagTurnedOff => match state.open_on.take() {
                Some(start) => results.push(PairedResult::new(PairKind::OnOff, start, event)),
                None => tracing::debug!(
                    flag = %event.flag_key(),
                    at = event.timestamp_ms(),
                    "turn-off without an open turn-on"
                ),
            },
            EventCategory::RolloutStarted => {
                let Some(slot) = event.slot.clone() else {
                    continue;
                };
                if let Some(orphan) = state.open_rollouts.insert(slot, event) {
                    tracing::debug!(
                        flag = %orphan.flag_key(),
                        at = orphan.timestamp_ms(),
                        "discarding rollout start superseded by a later start"
                    );
                }
            }
            EventCategory::RolloutEndedAutomatic | EventCategory::RolloutEndedManual => {
                let kind = if event.category == EventCategory::RolloutEndedAutomatic {
                    PairKind::RolloutAutomatic
                } else {
                    PairKind::RolloutManual
                };
                match event.slot.as_ref().and_then(|slot| state.open_rollouts.remove(slot)) {
                    Some(start) => results.push(PairedResult::new(kind, start, event)),
                    None => tracing::debug!(
                        flag = %event.flag_key(),
                        at = event.timestamp_ms(),
                        "rollout end without an open rollout"
                    ),
                }
            }
            EventCategory::Ignored => {}
        }
    }

    let still_open = usize::from(state.open_on.is_some()) + state.open_rollouts.len();
    if still_open > 0 {
        tracing::debug!(still_open, "dropping intervals that are still active");
    }

    results
}

/// Groups correlatable events per (project, flag).
///
/// Ignored events are dropped. Flags are ordered by their earliest event and
/// each group is stable-sorted by timestamp.
pub fn group_by_flag(events: Vec<ClassifiedEvent>) -> Vec<Vec<ClassifiedEvent>> {
    let mut index: HashMap<(String, FlagKey), usize> = HashMap::new();
    let mut groups: Vec<Vec<ClassifiedEvent>> = Vec::new();

    for event in events {
        if event.category == EventCategory::Ignored {
            continue;
        }
        let key = (event.event.project_key.clone(), event.flag_key().clone());
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(event);
    }

    for group in &mut groups {
        group.sort_by_key(ClassifiedEvent::timestamp_ms);
    }
    groups.sort_by_key(|group| group.first().map_or(i64::MAX, ClassifiedEvent::timestamp_ms));
    groups
}

/// Correlates every flag, preserving flag order in the output.
pub fn correlate(events: Vec<ClassifiedEvent>) -> Vec<PairedResult> {
    group_by_flag(events)
        .into_par_iter()
        .map(correlate_flag)
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}
