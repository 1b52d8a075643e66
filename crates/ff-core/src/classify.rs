//! Event classification.
//!
//! Maps an audit action plus the shape of its payload to a lifecycle
//! category. The lookup is fixed:
//!
//! | action                                 | payload               | category                  |
//! |----------------------------------------|-----------------------|---------------------------|
//! | `updateOn`                             | flag now on           | `FlagTurnedOn`            |
//! | `updateOn`                             | flag now off          | `FlagTurnedOff`           |
//! | `updateFallthroughWithMeasuredRollout` |                       | `RolloutStarted`          |
//! | `updateRulesWithMeasuredRollout`       |                       | `RolloutStarted`          |
//! | `stopMeasuredRolloutOnFlag*`           | `delta.automatic`     | `RolloutEndedAutomatic`   |
//! | `stopMeasuredRolloutOnFlag*`           | no `delta.automatic`  | `RolloutEndedManual`      |
//!
//! Everything else is `Ignored`.

use serde::Serialize;
use serde_json::Value;

use crate::action::AuditAction;
use crate::event::RawAuditEvent;
use crate::types::{FlagKey, RuleSlot};

const TURNED_ON_VERB: &str = "turned on the flag";
const TURNED_OFF_VERB: &str = "turned off the flag";

/// Lifecycle category of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    FlagTurnedOn,
    FlagTurnedOff,
    RolloutStarted,
    RolloutEndedAutomatic,
    RolloutEndedManual,
    Ignored,
}


/// An audit event tagged with its lifecycle category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedEvent {
    #[serde(flatten)]
    pub event: RawAuditEvent,
    pub category: EventCategory,
    /// Set for rollout categories only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<RuleSlot>,
}

impl ClassifiedEvent {
    pub fn flag_key(&self) -> &FlagKey {
        &self.event.flag_key
    }

    pub const fn timestamp_ms(&self) -> i64 {
        self.event.timestamp_ms
    }
}

/// Classifies a single event. Never fails; unusable events are `Ignored`.
pub fn classify(event: RawAuditEvent) -> ClassifiedEvent {
    let (category, slot) = match event.action.parse::<AuditAction>() {
        Ok(AuditAction::UpdateOn) => match flag_now_on(&event) {
            Some(true) => (EventCategory::FlagTurnedOn, None),
            Some(false) => (EventCategory::FlagTurnedOff, None),
            None => (EventCategory::Ignored, None),
        },
        Ok(AuditAction::UpdateFallthroughWithMeasuredRollout) => {
            (EventCategory::RolloutStarted, Some(RuleSlot::Fallthrough))
        }
        Ok(AuditAction::UpdateRulesWithMeasuredRollout) => (
            EventCategory::RolloutStarted,
            Some(RuleSlot::Rule(rule_id(&event))),
        ),
        Ok(AuditAction::StopMeasuredRolloutOnFlagFallthrough) => {
            (rollout_end(&event), Some(RuleSlot::Fallthrough))
        }
        Ok(AuditAction::StopMeasuredRolloutOnFlagRule) => {
            (rollout_end(&event), Some(RuleSlot::Rule(rule_id(&event))))
        }
        Err(_) => (EventCategory::Ignored, None),
    };

    if category == EventCategory::Ignored {
        tracing::debug!(
            id = %event.id,
            flag = %event.flag_key,
            action = %event.action,
            "ignoring audit event"
        );
    }

    ClassifiedEvent {
        event,
        category,
        slot,
    }
}

/// Classifies a batch, preserving order.
pub fn classify_all(events: impl IntoIterator<Item = RawAuditEvent>) -> Vec<ClassifiedEvent> {
    events.into_iter().map(classify).collect()
}

fn delta_field<'a>(event: &'a RawAuditEvent, field: &str) -> Option<&'a Value> {
    event.delta.as_ref().and_then(|delta| delta.get(field))
}

/// New flag state from `delta.on`, falling back to the title verb.
fn flag_now_on(event: &RawAuditEvent) -> Option<bool> {
    if let Some(on) = delta_field(event, "on").and_then(Value::as_bool) {
        return Some(on);
    }
    match event.title_verb.as_deref() {
        Some(verb) if verb.contains(TURNED_ON_VERB) => Some(true),
        Some(verb) if verb.contains(TURNED_OFF_VERB) => Some(false),
        _ => None,
    }
}

fn rule_id(event: &RawAuditEvent) -> Option<String> {
    delta_field(event, "ruleId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Rollout monitoring sets `delta.automatic`; anything else is a manual stop.
fn rollout_end(event: &RawAuditEvent) -> EventCategory {
    if delta_field(event, "automatic").and_then(Value::as_bool) == Some(true) {
        EventCategory::RolloutEndedAutomatic
    } else {
        EventCategory::RolloutEndedManual
    }
}
