//! Shared utilities for CLI commands.

use std::io;
use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;

/// "N units ago", e.g. "30 days ago".
static RELATIVE_CUTOFF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*(minute|hour|day|week)s?\s+ago$").unwrap());

/// Relative cutoffs reach back at most ~100 years.
const MAX_LOOKBACK_MINUTES: i64 = 100 * 366 * 24 * 60;

/// Parse a cutoff as epoch milliseconds.
///
/// Supports:
/// - Epoch milliseconds: "1729451496000"
/// - RFC 3339: "2024-10-20T19:11:36Z"
/// - Relative: "2 hours ago", "30 days ago", "1 week ago"
pub fn parse_cutoff(s: &str) -> anyhow::Result<i64> {
    let s = s.trim();
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse()
            .with_context(|| format!("cutoff out of range: {s}"));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }

    let Some(caps) = RELATIVE_CUTOFF_RE.captures(s) else {
        anyhow::bail!(
            "invalid cutoff: {s:?} (expected epoch milliseconds, RFC 3339 such as 2024-10-20T19:11:36Z, or '30 days ago')"
        );
    };
    let minutes_per_unit: i64 = match &caps[2] {
        "minute" => 1,
        "hour" => 60,
        "day" => 24 * 60,
        _ => 7 * 24 * 60,
    };
    let minutes = caps[1]
        .parse::<i64>()
        .ok()
        .and_then(|amount| amount.checked_mul(minutes_per_unit))
        .filter(|minutes| *minutes <= MAX_LOOKBACK_MINUTES)
        .with_context(|| format!("cutoff too far in the past: {s}"))?;

    Ok((Utc::now() - Duration::minutes(minutes)).timestamp_millis())
}

/// Treats a closed pipe on stdout (e.g. `ffaudit events | head`) as success.
pub fn ignore_broken_pipe(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cutoff_accepts_epoch_millis() {
        assert_eq!(parse_cutoff("1729451496000").unwrap(), 1_729_451_496_000);
        assert_eq!(parse_cutoff(" 0 ").unwrap(), 0);
    }

    #[test]
    fn parse_cutoff_accepts_rfc3339() {
        assert_eq!(
            parse_cutoff("2024-10-20T19:11:36Z").unwrap(),
            1_729_451_496_000
        );
        assert_eq!(
            parse_cutoff("2024-10-20T21:11:36+02:00").unwrap(),
            1_729_451_496_000
        );
    }

    #[test]
    fn parse_cutoff_accepts_relative() {
        let before = Utc::now().timestamp_millis();
        let cutoff = parse_cutoff("2 days ago").unwrap();
        let expected = before - 2 * 24 * 60 * 60 * 1000;
        assert!((cutoff - expected).abs() < 60_000);

        let week = parse_cutoff("1 week ago").unwrap();
        assert!(week < cutoff);
    }

    #[test]
    fn parse_cutoff_rejects_garbage() {
        assert!(parse_cutoff("").is_err());
        assert!(parse_cutoff("soon").is_err());
        assert!(parse_cutoff("99999999999999999999999").is_err());
        assert!(parse_cutoff("1000000 weeks ago").is_err());
        assert!(parse_cutoff("99999999999999999999 minutes ago").is_err());
    }

    #[test]
    fn broken_pipe_is_ignored_other_errors_are_not() {
        let broken = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
        assert!(ignore_broken_pipe(Err(broken)).is_ok());

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = ignore_broken_pipe(Err(denied)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }
}
