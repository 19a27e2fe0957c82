//! Command-line behavior of the `pomfold` binary.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const AGGREGATOR: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
    <artifactId>aggregate</artifactId>
    <packaging>pom</packaging>
    <modules>
        <module>stale</module>
    </modules>
</project>
"#;

fn pomfold() -> Command {
    Command::cargo_bin("pomfold").expect("pomfold binary")
}

/// Stock layout: `multi-module-project/pom.xml` next to `downloaded_sources/`.
fn create_layout(trees: &[&str]) -> TempDir {
    let td = tempfile::tempdir().expect("tempdir");
    let root = td.path();
    fs::create_dir_all(root.join("multi-module-project")).unwrap();
    fs::write(root.join("multi-module-project/pom.xml"), AGGREGATOR).unwrap();
    for name in trees {
        let dir = root.join("downloaded_sources").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("pom.xml"),
            format!("<project><artifactId>{name}</artifactId></project>\n"),
        )
        .unwrap();
    }
    td
}

fn aggregator(root: &Path) -> String {
    fs::read_to_string(root.join("multi-module-project/pom.xml")).unwrap()
}

#[test]
fn test_help_lists_commands() {
    pomfold()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("patch"))
        .stdout(predicate::str::contains("inject"))
        .stdout(predicate::str::contains("restore"));
}

#[test]
fn test_no_subcommand_is_usage_error() {
    pomfold().assert().failure().code(2);
}

#[test]
fn test_sync_with_defaults() {
    let temp = create_layout(&["alpha", "beta"]);

    pomfold()
        .current_dir(temp.path())
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("synced 2 module(s)"));

    let text = aggregator(temp.path());
    assert!(text.contains("<module>alpha</module>"));
    assert!(text.contains("<module>beta</module>"));
    assert!(!text.contains("<module>stale</module>"));
    assert!(
        fs::read_to_string(temp.path().join("multi-module-project/alpha/pom.xml"))
            .unwrap()
            .contains("maven-surefire-plugin")
    );
}

#[test]
fn test_sync_twice_is_byte_identical() {
    let temp = create_layout(&["alpha"]);
    pomfold().current_dir(temp.path()).arg("sync").assert().success();
    let first = aggregator(temp.path());
    pomfold().current_dir(temp.path()).arg("sync").assert().success();
    assert_eq!(aggregator(temp.path()), first);
}

#[test]
fn test_sync_malformed_aggregator_exits_two() {
    let temp = create_layout(&["alpha"]);
    fs::write(
        temp.path().join("multi-module-project/pom.xml"),
        "<project><modules>",
    )
    .unwrap();

    pomfold()
        .current_dir(temp.path())
        .arg("sync")
        .assert()
        .failure()
        .code(2);
    assert!(!temp.path().join("multi-module-project/alpha").exists());
}

#[test]
fn test_run_applies_config_rules() {
    let temp = create_layout(&["a", "b", "c"]);
    fs::write(
        temp.path().join("pomfold.toml"),
        r#"
[[patch]]
match = "b"
action = "rename"
suffix = "/x"

[[patch]]
match = "c"
action = "disable"
"#,
    )
    .unwrap();

    pomfold()
        .current_dir(temp.path())
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 applied, 0 unmatched"));

    let text = aggregator(temp.path());
    assert!(text.contains("<module>b/x</module>"));
    assert!(text.contains("<!--<module>c</module>-->"));
}

#[test]
fn test_patch_dry_run_prints_diff_only() {
    let temp = create_layout(&[]);
    fs::write(
        temp.path().join("pomfold.toml"),
        "[[patch]]\nmatch = \"stale\"\naction = \"disable\"\n",
    )
    .unwrap();

    pomfold()
        .current_dir(temp.path())
        .args(["patch", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dry-run"))
        .stdout(predicate::str::contains("-        <module>stale</module>"));

    assert_eq!(aggregator(temp.path()), AGGREGATOR);
}

#[test]
fn test_patch_without_modules_section_exits_two() {
    let temp = create_layout(&[]);
    fs::write(
        temp.path().join("multi-module-project/pom.xml"),
        "<project><artifactId>x</artifactId></project>",
    )
    .unwrap();

    pomfold()
        .current_dir(temp.path())
        .arg("patch")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_inject_explicit_descriptors() {
    let temp = create_layout(&["alpha"]);
    let pom = temp.path().join("downloaded_sources/alpha/pom.xml");

    pomfold()
        .current_dir(temp.path())
        .args(["inject", "downloaded_sources/alpha/pom.xml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("injected"));
    assert!(fs::read_to_string(&pom).unwrap().contains("failIfNoTests"));

    pomfold()
        .current_dir(temp.path())
        .args(["inject", "downloaded_sources/alpha/pom.xml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already-present"));
}

#[test]
fn test_inject_requires_a_path() {
    pomfold().arg("inject").assert().failure().code(2);
}

#[test]
fn test_inject_missing_descriptor_fails() {
    let temp = create_layout(&[]);
    pomfold()
        .current_dir(temp.path())
        .args(["inject", "nope/pom.xml"])
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::contains("failed"));
}

#[test]
fn test_restore_after_sync() {
    let temp = create_layout(&["alpha"]);
    pomfold().current_dir(temp.path()).arg("sync").assert().success();
    assert_ne!(aggregator(temp.path()), AGGREGATOR);

    pomfold()
        .current_dir(temp.path())
        .arg("restore")
        .assert()
        .success();
    assert_eq!(aggregator(temp.path()), AGGREGATOR);
}

#[test]
fn test_restore_without_backup_fails() {
    let temp = create_layout(&[]);
    pomfold()
        .current_dir(temp.path())
        .arg("restore")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_report_is_written() {
    let temp = create_layout(&["alpha"]);
    pomfold()
        .current_dir(temp.path())
        .args(["sync", "--report", "out/report.json"])
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp.path().join("out/report.json")).unwrap())
            .unwrap();
    assert_eq!(json["schema"], "pomfold.report.v1");
    assert_eq!(json["command"], "sync");
    assert_eq!(json["summary"]["modules"], 1);
}

#[test]
fn test_rules_json_lists_config_rules() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(
        temp.path().join("pomfold.toml"),
        "[[patch]]\nmatch = \"b\"\naction = \"relocate\"\nto = \"nested/b\"\n",
    )
    .unwrap();

    let output = pomfold()
        .current_dir(temp.path())
        .args(["rules", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["match"], "b");
    assert_eq!(json[0]["action"], "relocate");
    assert_eq!(json[0]["to"], "nested/b");
}

#[test]
fn test_rules_text_without_config() {
    let temp = tempfile::tempdir().unwrap();
    pomfold()
        .current_dir(temp.path())
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("No patch rules configured."));
}

#[test]
fn test_invalid_config_exits_one() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("pomfold.toml"), "[[patch]]\nmatch = 1\n").unwrap();
    pomfold()
        .current_dir(temp.path())
        .arg("rules")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_explicit_config_path() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(
        temp.path().join("custom.toml"),
        "[[patch]]\nmatch = \"x\"\naction = \"disable\"\n",
    )
    .unwrap();
    pomfold()
        .current_dir(temp.path())
        .args(["--config", "custom.toml", "rules"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disable"));
}
