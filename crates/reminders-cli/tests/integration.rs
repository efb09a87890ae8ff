#![allow(deprecated)]
use assert_cmd::Command;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use std::collections::BTreeMap;
use tempfile::TempDir;

const DAY: i64 = 86_400;

fn reminders(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ntfy-csv-reminders").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("NTFY_REMINDERS_TOPIC")
        .env_remove("CALDAV_TASKS_API_URL")
        .env_remove("RUST_LOG")
        .args(["--min-spacing", "0"]);
    cmd
}

fn write_catalog(dir: &TempDir, content: &str) {
    std::fs::write(dir.path().join("inputs.csv"), content).unwrap();
}

fn read_states(dir: &TempDir) -> BTreeMap<String, Vec<i64>> {
    let data = std::fs::read_to_string(dir.path().join("states.json")).unwrap();
    serde_json::from_str(&data).unwrap()
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn endpoint(server: &Server) -> String {
    format!("{}/alerts", server.url())
}

// ---------------------------------------------------------------------------
// Successful runs
// ---------------------------------------------------------------------------

#[test]
fn first_run_notifies_every_task_and_creates_state() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "# reminders\n3,water plants\n30,call mom\n");
    let mut server = Server::new();
    let plants = server
        .mock("POST", "/alerts")
        .match_header("title", "Reminder - water plants")
        .match_body("First run")
        .with_status(200)
        .create();
    let mom = server
        .mock("POST", "/alerts")
        .match_header("title", "Reminder - call mom")
        .with_status(200)
        .create();

    reminders(&dir).arg(endpoint(&server)).assert().success();

    plants.assert();
    mom.assert();
    let states = read_states(&dir);
    assert_eq!(states.len(), 2);
    assert_eq!(states["water plants"].len(), 1);
    assert_eq!(states["call mom"].len(), 1);
}

#[test]
fn second_run_right_away_stays_quiet() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "1000000,rare\n");
    std::fs::write(
        dir.path().join("states.json"),
        format!(r#"{{"rare": [{}]}}"#, now()),
    )
    .unwrap();
    let mut server = Server::new();
    let mock = server.mock("POST", Matcher::Any).expect(0).create();

    reminders(&dir).arg(endpoint(&server)).assert().success();
    mock.assert();
    assert_eq!(read_states(&dir)["rare"].len(), 1);
}

#[test]
fn overdue_reminder_fires_and_appends() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "5,stretch\n");
    let old = now() - 6 * DAY;
    std::fs::write(
        dir.path().join("states.json"),
        format!(r#"{{"stretch": [{old}]}}"#),
    )
    .unwrap();
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/alerts")
        .match_header("title", "Reminder - stretch")
        .match_body("Message every 5 days")
        .with_status(200)
        .create();

    reminders(&dir).arg(endpoint(&server)).assert().success();
    mock.assert();
    let stamps = &read_states(&dir)["stretch"];
    assert_eq!(stamps.len(), 2);
    assert_eq!(stamps[0], old);
    assert!(stamps[1] >= old + 6 * DAY);
}

#[test]
fn delay_sets_scheduled_delivery() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "1,a\n");
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/alerts")
        .match_header("at", Matcher::Regex(r"^\d+$".into()))
        .with_status(200)
        .create();

    reminders(&dir)
        .args(["--delay", "600"])
        .arg(endpoint(&server))
        .assert()
        .success();
    mock.assert();
}

#[test]
fn custom_paths_and_json_summary() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("conf")).unwrap();
    std::fs::write(dir.path().join("conf/list.csv"), "2,floss\n").unwrap();
    let mut server = Server::new();
    let _mock = server.mock("POST", "/alerts").with_status(200).create();

    let out = reminders(&dir)
        .args([
            "--input-csv",
            "conf/list.csv",
            "--states-path",
            "conf/history.json",
            "--json",
        ])
        .arg(endpoint(&server))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(summary["outcomes"][0]["task"], "floss");
    assert_eq!(summary["outcomes"][0]["reason"], "first_run");
    assert_eq!(summary["outcomes"][0]["fired"], true);
    assert!(dir.path().join("conf/history.json").exists());
    assert!(!dir.path().join("states.json").exists());
}

#[test]
fn topic_from_environment() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "1,a\n");
    let mut server = Server::new();
    let mock = server.mock("POST", "/alerts").with_status(200).create();

    reminders(&dir)
        .env("NTFY_REMINDERS_TOPIC", endpoint(&server))
        .assert()
        .success();
    mock.assert();
}

// ---------------------------------------------------------------------------
// Validation failures: exit status only, nothing sent
// ---------------------------------------------------------------------------

#[test]
fn duplicate_tasks_fail_without_sending() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "1,floss\n2,read\n3,floss\n");
    let mut server = Server::new();
    let mock = server.mock("POST", Matcher::Any).expect(0).create();

    reminders(&dir)
        .arg(endpoint(&server))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("'floss' (records 0, 2)"));
    mock.assert();
    assert!(!dir.path().join("states.json").exists());
}

#[test]
fn missing_catalog_fails() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new();
    let mock = server.mock("POST", Matcher::Any).expect(0).create();

    reminders(&dir)
        .arg(endpoint(&server))
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read catalog"));
    mock.assert();
}

#[test]
fn bad_interval_fails() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "1,ok\n0,never\n");

    reminders(&dir)
        .arg("http://127.0.0.1:9/unused")
        .assert()
        .failure()
        .stderr(predicate::str::contains("record 1 (line 2)"));
}

#[test]
fn blank_topic_fails() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "1,a\n");

    reminders(&dir)
        .arg("   ")
        .assert()
        .failure()
        .stderr(predicate::str::contains("notification channel identifier is empty"));
}

#[test]
fn blank_topic_fails_before_startup_jitter() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "1,a\n");

    let started = std::time::Instant::now();
    reminders(&dir)
        .args(["--startup-jitter", "86400"])
        .arg("   ")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("notification channel identifier is empty"));
    assert!(started.elapsed() < std::time::Duration::from_secs(30));
}

#[test]
fn missing_topic_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    reminders(&dir).assert().failure().code(2);
}

// ---------------------------------------------------------------------------
// Runtime failures: reported through the channel, then non-zero exit
// ---------------------------------------------------------------------------

#[test]
fn corrupt_history_is_reported() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "1,a\n");
    std::fs::write(dir.path().join("states.json"), "[1, 2, 3]").unwrap();
    let mut server = Server::new();
    let error = server
        .mock("POST", "/alerts")
        .match_header("title", Matcher::Regex("^Reminder - Error: ".into()))
        .with_status(200)
        .create();

    reminders(&dir)
        .arg(endpoint(&server))
        .assert()
        .failure()
        .stderr(predicate::str::contains("is corrupt"));
    error.assert();
    assert_eq!(
        std::fs::read_to_string(dir.path().join("states.json")).unwrap(),
        "[1, 2, 3]"
    );
}

#[test]
fn rejected_dispatch_stops_the_run() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "1,a\n1,b\n");
    let mut server = Server::new();
    // first reminder rejected, then the error notification is attempted
    let mock = server
        .mock("POST", "/alerts")
        .with_status(500)
        .expect(2)
        .create();

    reminders(&dir)
        .arg(endpoint(&server))
        .assert()
        .failure()
        .stderr(predicate::str::contains("dispatch failed"));
    mock.assert();
    assert!(read_states(&dir).is_empty());
}

// ---------------------------------------------------------------------------
// CalDAV integration
// ---------------------------------------------------------------------------

#[test]
fn caldav_without_configuration_is_skipped() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "1,a\n");
    let mut server = Server::new();
    let mock = server.mock("POST", "/alerts").with_status(200).expect(1).create();

    let out = reminders(&dir)
        .arg("--also-add-to-caldav")
        .arg(endpoint(&server))
        .assert()
        .success()
        .get_output()
        .stderr
        .clone();
    mock.assert();

    let stderr = String::from_utf8_lossy(&out);
    assert_eq!(stderr.matches("WARN").count(), 1, "{stderr}");
    assert!(stderr.contains("CALDAV_TASKS_API_URL is not set"));
}

#[test]
fn caldav_failure_does_not_block_reminders() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "1,a\n");
    let mut server = Server::new();
    let put = server
        .mock("PUT", Matcher::Regex(r"^/dav/chores/.+\.ics$".into()))
        .with_status(500)
        .create();
    let caldav_error = server
        .mock("POST", "/alerts")
        .match_header("title", Matcher::Regex("^CalDAV Error: ".into()))
        .with_status(200)
        .create();
    let reminder = server
        .mock("POST", "/alerts")
        .match_header("title", "Reminder - a")
        .with_status(200)
        .create();

    reminders(&dir)
        .env("CALDAV_TASKS_API_URL", format!("{}/dav", server.url()))
        .env("CALDAV_TASKS_API_LIST_UID", "chores")
        .arg("--also-add-to-caldav")
        .arg(endpoint(&server))
        .assert()
        .success();
    put.assert();
    caldav_error.assert();
    reminder.assert();
    assert_eq!(read_states(&dir)["a"].len(), 1);
}

#[test]
fn version_flag() {
    let dir = TempDir::new().unwrap();
    reminders(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
