//! End-to-end tests for the medtrain binary
//!
//! Every test runs against its own data directory and covers:
//! - Initialization and login
//! - Catalog setup by an administrator
//! - Quiz attempt, lock and unlock
//! - Certificate issue
//! - Audit trail export and verification

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const ADMIN_PASSWORD: &str = "admin-secret";
const TRAINEE_PASSWORD: &str = "alice-secret";

/// Command bound to `data_dir` with a clean environment
fn medtrain(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("medtrain").unwrap();
    cmd.arg("--data-dir")
        .arg(data_dir)
        .env("NO_COLOR", "1")
        .env_remove("MEDTRAIN_DATA_DIR")
        .env_remove("MEDTRAIN_ISSUER")
        .env_remove("MEDTRAIN_TEMPLATE")
        .env_remove("MEDTRAIN_PASSWORD")
        .env_remove("MEDTRAIN_ADMIN_PASSWORD")
        .env_remove("LOG_LEVEL")
        .env_remove("LOG_OUTPUT")
        .env_remove("LOG_FILTER")
        .env_remove("RUST_LOG");
    cmd
}

/// Run and return stdout, asserting success
fn run_ok(data_dir: &Path, args: &[&str]) -> String {
    let output = medtrain(data_dir).args(args).assert().success().get_output().clone();
    String::from_utf8(output.stdout).unwrap()
}

/// Id printed in the trailing parentheses of a success line
fn trailing_id(stdout: &str) -> String {
    let line = stdout.lines().find(|line| line.contains('(')).unwrap();
    let start = line.rfind('(').unwrap() + 1;
    let end = line.rfind(')').unwrap();
    line[start..end].to_string()
}

fn init(data_dir: &Path) {
    medtrain(data_dir)
        .args(["init", "--admin-password", ADMIN_PASSWORD])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized MedTrain data directory"));
}

fn login(data_dir: &Path, username: &str, password: &str) {
    medtrain(data_dir)
        .args(["login", "-u", username, "-p", password])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as"));
}

/// Training with one two-question device, plus trainee `alice` granted to it.
/// Returns the device id.
fn setup_catalog(data_dir: &Path) -> String {
    init(data_dir);
    login(data_dir, "admin", ADMIN_PASSWORD);

    let training = trailing_id(&run_ok(
        data_dir,
        &["training", "create", "-t", "Infusion Therapy", "-d", "Pumps and lines"],
    ));
    let device = trailing_id(&run_ok(
        data_dir,
        &["device", "add", &training, "-t", "Infusion Pump X", "-d", "Volumetric pump", "--passing", "50"],
    ));

    run_ok(
        data_dir,
        &["question", "add", &device, "-t", "Maximum rate?", "-o", "10 ml/h", "-o", "999 ml/h", "-c", "1"],
    );
    run_ok(
        data_dir,
        &[
            "question", "add", &device, "-t", "Which alarms exist?", "--type", "multiple",
            "-o", "Occlusion", "-o", "Weather", "-o", "Air in line", "-c", "0", "-c", "2",
        ],
    );

    run_ok(data_dir, &["user", "create", "alice", "-p", TRAINEE_PASSWORD]);
    run_ok(data_dir, &["grant", "set", "alice", &training, "--all-devices"]);

    device
}

fn exported_events(data_dir: &Path, output: &Path) -> Vec<serde_json::Value> {
    run_ok(data_dir, &["audit", "export", output.to_str().unwrap()]);
    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
    exported["events"].as_array().unwrap().clone()
}

// ============================================================================
// Setup and Sessions
// ============================================================================

#[test]
fn test_commands_require_init() {
    let temp = TempDir::new().unwrap();

    medtrain(temp.path())
        .args(["training", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("medtrain init"));
}

#[test]
fn test_init_twice_needs_force() {
    let temp = TempDir::new().unwrap();
    init(temp.path());

    medtrain(temp.path())
        .args(["init", "--admin-password", ADMIN_PASSWORD])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));

    medtrain(temp.path())
        .args(["init", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Existing administrator accounts were kept"));
}

#[test]
fn test_login_rejects_wrong_password() {
    let temp = TempDir::new().unwrap();
    init(temp.path());

    medtrain(temp.path())
        .args(["login", "-u", "admin", "-p", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid username or password"));

    medtrain(temp.path())
        .args(["whoami"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn test_trainee_cannot_administer() {
    let temp = TempDir::new().unwrap();
    setup_catalog(temp.path());
    login(temp.path(), "alice", TRAINEE_PASSWORD);

    medtrain(temp.path())
        .args(["training", "create", "-t", "Other", "-d", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires an administrator"));
}

#[test]
fn test_malformed_env_file_is_reported() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(".env"), "BROKEN LINE WITHOUT EQUALS\n").unwrap();

    medtrain(temp.path())
        .current_dir(temp.path())
        .args(["init", "--admin-password", ADMIN_PASSWORD])
        .assert()
        .success()
        .stderr(predicate::str::contains("Ignoring unreadable .env file"));
}

// ============================================================================
// Quiz Workflow
// ============================================================================

#[test]
fn test_full_training_workflow() {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path();
    let device = setup_catalog(data_dir);

    login(data_dir, "alice", TRAINEE_PASSWORD);
    medtrain(data_dir)
        .args(["device", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Infusion Pump X"))
        .stdout(predicate::str::contains("open"));

    medtrain(data_dir)
        .args(["quiz", "take", &device, "--answers", "1;0,2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASSED"))
        .stdout(predicate::str::contains("100.0%"));

    // Completed attempts lock the test
    medtrain(data_dir)
        .args(["quiz", "take", &device, "--answers", "1;0,2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("locked"));

    let certificates = temp.path().join("certificates");
    medtrain(data_dir)
        .args(["certificate", "issue", &device, "-o", certificates.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Certificate written to"));
    let pdf = std::fs::read(certificates.join("Zertifikat-alice.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));

    // Admin unlocks the result for a retake
    login(data_dir, "admin", ADMIN_PASSWORD);
    let events = exported_events(data_dir, &temp.path().join("audit.json"));
    let result_id = events
        .iter()
        .find(|event| event["event_type"] == "test_complete")
        .and_then(|event| event["subject"].as_str())
        .unwrap()
        .to_string();
    assert!(events.iter().any(|event| event["event_type"] == "certificate_issue"));

    medtrain(data_dir)
        .args(["result", "unlock", &result_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unlocked alice's result"));

    login(data_dir, "alice", TRAINEE_PASSWORD);
    medtrain(data_dir)
        .args(["quiz", "take", &device, "--answers", "0;1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAILED"))
        .stdout(predicate::str::contains("0.0%"));

    medtrain(data_dir)
        .args(["audit", "verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Audit trail verified successfully"));
}

#[test]
fn test_quiz_answers_must_match_questions() {
    let temp = TempDir::new().unwrap();
    let device = setup_catalog(temp.path());
    login(temp.path(), "alice", TRAINEE_PASSWORD);

    medtrain(temp.path())
        .args(["quiz", "take", &device, "--answers", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("answer group"));

    // Nothing was stored, so the test is still open
    medtrain(temp.path())
        .args(["result", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No test results"));
}

#[test]
fn test_certificate_requires_pass() {
    let temp = TempDir::new().unwrap();
    let device = setup_catalog(temp.path());
    login(temp.path(), "alice", TRAINEE_PASSWORD);

    medtrain(temp.path())
        .args(["certificate", "issue", &device, "-o", temp.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No passed test"));
}

#[test]
fn test_ungranted_trainee_sees_nothing() {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path();
    let device = setup_catalog(data_dir);
    run_ok(data_dir, &["user", "create", "bob", "-p", "bob-secret"]);

    login(data_dir, "bob", "bob-secret");
    medtrain(data_dir)
        .args(["training", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No trainings available"));

    medtrain(data_dir)
        .args(["quiz", "take", &device, "--answers", "1;0,2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not available to you"));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_set_and_get_issuer() {
    let temp = TempDir::new().unwrap();
    init(temp.path());
    login(temp.path(), "admin", ADMIN_PASSWORD);

    run_ok(temp.path(), &["config", "set", "issuer", "Klinikum Nord"]);
    medtrain(temp.path())
        .args(["config", "get", "issuer"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Klinikum Nord"));

    medtrain(temp.path())
        .args(["config", "get", "server_url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown key"));
}
