use assert_cmd::Command;
use predicates::str::contains;
use tempfile::tempdir;

#[test]
fn help_lists_every_command() {
    Command::cargo_bin("equipment-history")
        .expect("binary exists")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("ingest"))
        .stdout(contains("summary"))
        .stdout(contains("history"))
        .stdout(contains("report"))
        .stdout(contains("clear"))
        .stdout(contains("inspect"));
}

#[test]
fn store_location_can_come_from_environment() {
    let dir = tempdir().expect("temp dir");
    let store = dir.path().join("env.db");
    Command::cargo_bin("equipment-history")
        .expect("binary exists")
        .env("EQUIPMENT_HISTORY_STORE", &store)
        .arg("clear")
        .assert()
        .success()
        .stdout(contains("History cleared"));
    assert!(store.exists());
}

#[test]
fn invalid_delimiter_is_rejected_by_argument_parsing() {
    Command::cargo_bin("equipment-history")
        .expect("binary exists")
        .args(["ingest", "-i", "x.csv", "--delimiter", "ab"])
        .assert()
        .failure()
        .stderr(contains("Delimiter must be a single character"));
}
