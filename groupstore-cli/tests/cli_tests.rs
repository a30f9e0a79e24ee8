//! End-to-end tests for the groupstore binary
//!
//! Every test works on its own store file in a temporary directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct Cli {
    _dir: TempDir,
    store: PathBuf,
}

impl Cli {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("groupstore.json");
        Self { _dir: dir, store }
    }

    fn run_with(&self, extra: &[&str], args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_groupstore"))
            .env_remove("RUST_LOG")
            .env_remove("GROUPSTORE_MEMBERSHIP_SPLIT_THRESHOLD")
            .env_remove("GROUPSTORE_MEMBERSHIP_AUTO_SAVE")
            .env_remove("GROUPSTORE_STORE_DATA_FILE")
            .env_remove("GROUPSTORE_LOG_LEVEL")
            .env_remove("GROUPSTORE_LOG_JSON")
            .arg("--store")
            .arg(&self.store)
            .args(["--log-level", "error"])
            .args(extra)
            .args(args)
            .output()
            .unwrap()
    }

    fn ok(&self, args: &[&str]) -> String {
        self.ok_with(&[], args)
    }

    fn ok_with(&self, extra: &[&str], args: &[&str]) -> String {
        let out = self.run_with(extra, args);
        assert!(
            out.status.success(),
            "groupstore {:?} failed: {}",
            args,
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8(out.stdout).unwrap()
    }

    fn lines(&self, args: &[&str]) -> Vec<String> {
        self.ok(args).lines().map(str::to_string).collect()
    }

    fn store(&self) -> &Path {
        &self.store
    }
}

#[test]
fn test_init_creates_store_file() {
    let cli = Cli::new();
    cli.ok(&["init"]);
    assert!(cli.store().exists());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(cli.store()).unwrap()).unwrap();
    assert_eq!(json["workspace"], "default");
}

#[test]
fn test_nested_membership_workflow() {
    let cli = Cli::new();
    cli.ok(&["add-group", "staff"]);
    cli.ok(&["add-group", "admins"]);
    cli.ok(&["add-user", "alice"]);
    cli.ok(&["add-user", "bob"]);

    assert_eq!(cli.ok(&["add-member", "staff", "admins"]).trim(), "added");
    assert_eq!(cli.ok(&["add-member", "staff", "bob"]).trim(), "added");
    assert_eq!(cli.ok(&["add-member", "admins", "alice"]).trim(), "added");
    assert_eq!(cli.ok(&["add-member", "admins", "alice"]).trim(), "unchanged");

    assert_eq!(cli.lines(&["members", "staff"]), ["admins", "alice", "bob"]);
    assert_eq!(cli.lines(&["members", "staff", "--declared"]), ["admins", "bob"]);
    assert_eq!(cli.lines(&["members", "staff", "--filter", "groups"]), ["admins"]);
    assert_eq!(cli.lines(&["member-of", "alice"]), ["admins", "staff"]);
    assert_eq!(cli.lines(&["member-of", "alice", "--declared"]), ["admins"]);
}

#[test]
fn test_cycle_and_self_membership_unchanged() {
    let cli = Cli::new();
    cli.ok(&["add-group", "a"]);
    cli.ok(&["add-group", "b"]);
    cli.ok(&["add-member", "a", "b"]);

    assert_eq!(cli.ok(&["add-member", "b", "a"]).trim(), "unchanged");
    assert_eq!(cli.ok(&["add-member", "a", "a"]).trim(), "unchanged");
    assert!(cli.lines(&["members", "b"]).is_empty());
}

#[test]
fn test_indexed_groups_via_split_threshold() {
    let cli = Cli::new();
    let indexed = ["--split-threshold", "4"];
    cli.ok_with(&indexed, &["add-group", "big"]);
    for i in 0..12 {
        let id = format!("user{i:02}");
        cli.ok_with(&indexed, &["add-user", &id]);
        cli.ok_with(&indexed, &["add-member", "big", &id]);
    }

    // the group stays indexed when read without the threshold
    let members = cli.lines(&["members", "big"]);
    assert_eq!(members.len(), 12);
    assert_eq!(members[0], "user00");
    assert_eq!(cli.ok(&["remove-member", "big", "user03"]).trim(), "removed");
    assert_eq!(cli.lines(&["members", "big"]).len(), 11);
}

#[test]
fn test_delete_leaves_dangling_entry_ignored() {
    let cli = Cli::new();
    cli.ok(&["add-group", "g"]);
    cli.ok(&["add-user", "alice"]);
    cli.ok(&["add-user", "bob"]);
    cli.ok(&["add-member", "g", "alice"]);
    cli.ok(&["add-member", "g", "bob"]);

    cli.ok(&["delete", "alice"]);
    assert_eq!(cli.lines(&["members", "g"]), ["bob"]);
}

#[test]
fn test_principal_json() {
    let cli = Cli::new();
    cli.ok(&["add-group", "g", "--principal-name", "Group G"]);
    cli.ok(&["add-user", "alice", "--principal-name", "Alice"]);
    cli.ok(&["add-member", "g", "alice"]);

    let json: serde_json::Value = serde_json::from_str(&cli.ok(&["principal", "g"])).unwrap();
    assert_eq!(json, serde_json::json!({ "name": "Group G", "members": ["Alice"] }));
}

#[test]
fn test_errors_exit_non_zero() {
    let cli = Cli::new();
    cli.ok(&["add-user", "alice"]);

    assert!(!cli.run_with(&[], &["add-user", "alice"]).status.success());
    assert!(!cli.run_with(&[], &["members", "nobody"]).status.success());
    assert!(!cli.run_with(&[], &["members", "alice"]).status.success());
    assert!(!cli
        .run_with(&["--split-threshold", "1"], &["init"])
        .status
        .success());
}
