//! Core domain logic for flag audit reports.
//!
//! This crate contains the fundamental types and logic for:
//! - Normalization: turning audit-log entries into per-flag events
//! - Classification: tagging events with a lifecycle category
//! - Correlation: pairing start and end events into durations
//! - Reports: projecting paired results into table rows

pub mod action;
pub mod classify;
pub mod correlate;
pub mod event;
pub mod report;
pub mod types;

pub use action::{AuditAction, UnknownAction};
pub use classify::{ClassifiedEvent, EventCategory, classify, classify_all};
pub use correlate::{PairKind, PairedResult, correlate, correlate_flag, group_by_flag};
pub use event::{Actor, AuditLogEntry, RawAuditEvent};
pub use report::{
    OnDurationRow, ReportSet, RolloutRow, SYSTEM_ACTOR, Tabular, TurnedOffRow, UNKNOWN_ACTOR,
    turned_off_rows,
};
pub use types::{FlagKey, RollbackType, RolloutType, RuleSlot, ValidationError, format_timestamp};
