//! End-to-end tests for the report commands.
//!
//! Runs the `ffaudit` binary against a mock audit-log API and checks the
//! CSV files it writes.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// 2024-10-21 08:00:00 UTC
const BASE: i64 = 1_729_497_600_000;
const MINUTE: i64 = 60_000;

fn ffaudit_binary() -> String {
    env!("CARGO_BIN_EXE_ffaudit").to_string()
}

fn entry(flag: &str, action: &str, date: i64, email: Option<&str>, delta: &Value) -> Value {
    json!({
        "_id": format!("{flag}-{date}"),
        "date": date,
        "name": flag,
        "accesses": [{
            "action": action,
            "resource": format!("proj/web:env/production:flag/{flag}")
        }],
        "member": email.map(|email| json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": email
        })),
        "_links": {"site": {"href": format!("/web/production/features/{flag}")}},
        "delta": delta
    })
}

/// Newest first, as the API returns them.
fn audit_page() -> Value {
    json!({
        "items": [
            entry("checkout", "updateOn", BASE + 120 * MINUTE, None, &json!({"on": false})),
            entry("search", "stopMeasuredRolloutOnFlagRule", BASE + 90 * MINUTE,
                Some("ada@example.com"), &json!({"ruleId": "r1"})),
            entry("search", "updateRulesWithMeasuredRollout", BASE + 60 * MINUTE,
                Some("ada@example.com"), &json!({"ruleId": "r1"})),
            entry("search", "stopMeasuredRolloutOnFlagFallthrough", BASE + 40 * MINUTE,
                None, &json!({"automatic": true})),
            entry("search", "updateFallthroughWithMeasuredRollout", BASE + 10 * MINUTE,
                Some("dev@example.com"), &json!({})),
            entry("checkout", "updateOn", BASE, Some("ada@example.com"), &json!({"on": true}))
        ],
        "_links": {}
    })
}

async fn mock_api() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/auditlog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(audit_page()))
        .mount(&server)
        .await;
    server
}

/// Runs the binary off the async runtime so the mock server keeps serving.
async fn run_ffaudit(server: &MockServer, home: &Path, args: &[&str]) -> Output {
    let base_url = server.uri();
    let home = home.to_path_buf();
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
    tokio::task::spawn_blocking(move || {
        Command::new(ffaudit_binary())
            .current_dir(&home)
            .env("HOME", &home)
            .env_remove("XDG_CONFIG_HOME")
            .env("FFAUDIT_BASE_URL", base_url)
            .env("LAUNCHDARKLY_API_KEY", "api-test-key")
            .args(&args)
            .output()
            .expect("failed to run ffaudit")
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_report_writes_three_tables() {
    let server = mock_api().await;
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("reports");

    let output = run_ffaudit(
        &server,
        temp.path(),
        &["report", "--output-dir", out.to_str().unwrap()],
    )
    .await;
    assert!(
        output.status.success(),
        "ffaudit report should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Wrote 1 row to"), "summary: {stdout}");

    let on = fs::read_to_string(out.join("flag_on_durations.csv")).unwrap();
    let rows: Vec<&str> = on.lines().collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[1].starts_with("checkout,checkout,"));
    assert!(rows[1].contains(",2024-10-21 10:00:00,2024-10-21 08:00:00,7200,API/System,"));

    let automatic = fs::read_to_string(out.join("rollouts_automatic_rollback.csv")).unwrap();
    let rows: Vec<&str> = automatic.lines().collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[1].contains(",1800,fallthrough,automatic,dev@example.com,Unknown/API,"));

    let manual = fs::read_to_string(out.join("rollouts_manual_rollback.csv")).unwrap();
    let rows: Vec<&str> = manual.lines().collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[1].contains(",1800,rule,manual,ada@example.com,ada@example.com,"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_turned_off_writes_consolidated_list() {
    let server = mock_api().await;
    let temp = TempDir::new().unwrap();

    let output = run_ffaudit(&server, temp.path(), &["turned-off", "--output-dir", "."]).await;
    assert!(
        output.status.success(),
        "ffaudit turned-off should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(
        String::from_utf8_lossy(&output.stdout)
            .starts_with("Extracted and consolidated 1 unique entries")
    );

    let content = fs::read_to_string(temp.path().join("turned_off_flags.csv")).unwrap();
    let rows: Vec<&str> = content.lines().collect();
    assert_eq!(rows[0], "name,site_href,date,first_name,last_name,email,project_key");
    assert_eq!(rows.len(), 2);
    assert!(rows[1].starts_with("checkout,"));
    assert!(rows[1].ends_with(",2024-10-21 10:00:00,API/System,API/System,API/System,web"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_events_prints_jsonl_oldest_first() {
    let server = mock_api().await;
    let temp = TempDir::new().unwrap();

    let output = run_ffaudit(&server, temp.path(), &["events"]).await;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let events: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.len(), 6);
    assert_eq!(events[0]["category"], "flag_turned_on");
    assert_eq!(events[5]["category"], "flag_turned_off");
}

#[test]
fn test_missing_api_key_fails() {
    let temp = TempDir::new().unwrap();
    let output = Command::new(ffaudit_binary())
        .current_dir(temp.path())
        .env("HOME", temp.path())
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("LAUNCHDARKLY_API_KEY")
        .env_remove("FFAUDIT_API_KEY")
        .arg("report")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("LAUNCHDARKLY_API_KEY"));
}
