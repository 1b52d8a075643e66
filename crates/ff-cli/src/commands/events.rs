//! Implementation of the `ffaudit events` command.
//!
//! Prints every fetched audit entry with its classification as JSONL,
//! oldest first. Useful for checking why an entry did or did not pair.

use std::io::{self, Write};

use anyhow::{Context, Result};
use ff_core::{ClassifiedEvent, classify_all};

use crate::Config;
use crate::commands::fetch::fetch_events;

/// Runs the events command.
pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let events = classify_all(fetch_events(config)?);
    write_events(writer, &events)
}

/// Writes events as one JSON object per line.
pub fn write_events<W: Write>(writer: &mut W, events: &[ClassifiedEvent]) -> Result<()> {
    for event in events {
        let mut line = serde_json::to_vec(event).context("failed to serialize event")?;
        line.push(b'\n');
        if let Err(err) = writer.write_all(&line) {
            // Reader went away (e.g., piped to `head`)
            if err.kind() == io::ErrorKind::BrokenPipe {
                break;
            }
            return Err(err).context("failed to write event");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ff_core::{AuditLogEntry, RawAuditEvent, classify};
    use serde_json::{Value, json};

    use super::*;

    fn classified(action: &str, delta: Value) -> ClassifiedEvent {
        let entry: AuditLogEntry = serde_json::from_value(json!({
            "_id": "e1",
            "date": 1_729_497_600_000_i64,
            "name": "Checkout",
            "accesses": [{"action": action, "resource": "proj/web:env/production:flag/checkout"}],
            "delta": delta
        }))
        .unwrap();
        classify(RawAuditEvent::from_entry(entry, "https://app.launchdarkly.com").unwrap())
    }

    #[test]
    fn test_writes_one_line_per_event() {
        let events = vec![
            classified("updateOn", json!({"on": true})),
            classified("updateRulesWithMeasuredRollout", json!({"ruleId": "r1"})),
        ];
        let mut buf = Vec::new();
        write_events(&mut buf, &events).unwrap();

        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["flag_key"], "checkout");
        assert_eq!(lines[0]["category"], "flag_turned_on");
        assert_eq!(lines[1]["category"], "rollout_started");
    }

    /// Accepts `budget` writes, then fails with `kind`.
    struct FailingWriter {
        budget: usize,
        kind: io::ErrorKind,
        written: Vec<u8>,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(self.kind, "writer failed"));
            }
            self.budget -= 1;
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn two_events() -> Vec<ClassifiedEvent> {
        vec![
            classified("updateOn", json!({"on": true})),
            classified("updateOn", json!({"on": false})),
        ]
    }

    #[test]
    fn test_broken_pipe_stops_quietly() {
        let mut writer = FailingWriter {
            budget: 1,
            kind: io::ErrorKind::BrokenPipe,
            written: Vec::new(),
        };
        write_events(&mut writer, &two_events()).unwrap();
        assert_eq!(String::from_utf8(writer.written).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_other_write_errors_propagate() {
        let mut writer = FailingWriter {
            budget: 0,
            kind: io::ErrorKind::PermissionDenied,
            written: Vec::new(),
        };
        let err = write_events(&mut writer, &two_events()).unwrap_err();
        assert!(err.to_string().contains("failed to write event"));
    }

    #[test]
    fn test_empty_input_writes_nothing() {
        let mut buf = Vec::new();
        write_events(&mut buf, &[]).unwrap();
        assert!(buf.is_empty());
    }
}
