//! CLI account command tests
//!
//! Each test runs the built binary against a fresh store file.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_claritydash"))
        .arg("--db")
        .arg(db)
        .args(args)
        .env_remove("CLARITYDASH_DB")
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_list_seeds_baseline_accounts() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");

    let output = run(&db, &["users", "list"]);
    assert_success(&output);

    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "user1@example.com\tAlice\tpro".to_string(),
            "user2@example.com\tBob\tfree".to_string(),
        ]
    );
}

#[test]
fn test_seed_twice_reports_already_seeded() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");

    assert_success(&run(&db, &["seed"]));
    let second = run(&db, &["seed"]);
    assert_success(&second);
    assert!(stdout(&second).contains("Already seeded"));
}

#[test]
fn test_signup_login_and_patch_flow() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");

    assert_success(&run(
        &db,
        &[
            "users", "signup", "--name", "Carol", "--email", "carol@example.com", "--password",
            "hunter2",
        ],
    ));

    let duplicate = run(
        &db,
        &[
            "users", "signup", "--name", "Carol", "--email", "carol@example.com", "--password",
            "x",
        ],
    );
    assert!(!duplicate.status.success());
    assert!(String::from_utf8_lossy(&duplicate.stderr).contains("ERR_ALREADY_EXISTS"));

    let login = run(
        &db,
        &["users", "login", "--email", "carol@example.com", "--password", "hunter2"],
    );
    assert_success(&login);
    assert!(!stdout(&login).contains("passwordHash"));

    let bad_login = run(
        &db,
        &["users", "login", "--email", "carol@example.com", "--password", "wrong"],
    );
    assert!(!bad_login.status.success());

    assert_success(&run(
        &db,
        &["users", "rename", "--email", "carol@example.com", "--name", "Caroline"],
    ));
    assert_success(&run(
        &db,
        &["users", "set-tier", "--email", "carol@example.com", "--tier", "premium"],
    ));

    let show = run(&db, &["users", "show", "carol@example.com"]);
    assert_success(&show);
    let profile: serde_json::Value = serde_json::from_slice(&show.stdout).unwrap();
    assert_eq!(profile["name"], "Caroline");
    assert_eq!(profile["subscriptionTier"], "premium");
    assert!(profile.get("passwordHash").is_none());
}

#[test]
fn test_seeded_account_logs_in_with_baseline_password() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");

    assert_success(&run(&db, &["seed"]));
    assert_success(&run(
        &db,
        &["users", "login", "--email", "user1@example.com", "--password", "123"],
    ));
}

#[test]
fn test_delete_then_check_is_consistent() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("store.db");

    assert_success(&run(&db, &["seed"]));
    assert_success(&run(&db, &["users", "delete", "user2@example.com"]));

    let missing = run(&db, &["users", "show", "user2@example.com"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("ERR_NOT_FOUND"));

    assert_success(&run(&db, &["check"]));
    let reconcile = run(&db, &["reconcile"]);
    assert_success(&reconcile);
    assert!(stdout(&reconcile).contains("Nothing to repair"));
}
