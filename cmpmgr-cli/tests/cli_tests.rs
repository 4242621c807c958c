//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;

/// Build command for the cmpmgr-cli binary (finds it in target/debug when run via cargo test).
fn cmpmgr_cli() -> Command {
    let mut cmd = cargo_bin_cmd!("cmpmgr-cli");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Path to cmpmgr library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("cmpmgr")
        .join("tests")
        .join("fixtures")
}

/// Copy the amplifier project and an empty settings file into a scratch directory.
fn scratch() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    for name in ["amplifier.sch", "power.sch"] {
        fs::copy(fixtures_dir().join(name), dir.path().join(name)).unwrap();
    }
    let config = dir.path().join("cmpmgr.json");
    fs::write(&config, "{}").unwrap();
    let root = dir.path().join("amplifier.sch");
    (dir, root, config)
}

#[test]
fn test_cli_help() {
    let mut cmd = cmpmgr_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("KiCad"));
}

#[test]
fn test_cli_version() {
    let mut cmd = cmpmgr_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_list_human() {
    let (_dir, root, config) = scratch();
    let mut cmd = cmpmgr_cli();

    cmd.arg("list").arg(&root).arg("--config").arg(&config);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("R1"))
        .stdout(predicate::str::contains("U3"))
        .stdout(predicate::str::contains("Components: 8"));
}

#[test]
fn test_cli_list_json() {
    let (_dir, root, config) = scratch();
    let mut cmd = cmpmgr_cli();

    cmd.arg("list")
        .arg(&root)
        .arg("--format")
        .arg("json")
        .arg("--config")
        .arg(&config);

    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["version"], 4);
    assert_eq!(json["components"].as_array().unwrap().len(), 7);
    let u1 = json["components"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["reference"] == "U1")
        .unwrap();
    assert_eq!(u1["units"], serde_json::json!([1, 2]));
}

#[test]
fn test_cli_list_with_ignore_flag() {
    let (_dir, root, config) = scratch();
    let mut cmd = cmpmgr_cli();

    cmd.arg("list")
        .arg(&root)
        .arg("--ignore")
        .arg("#PWR")
        .arg("--ignore")
        .arg("TP")
        .arg("--config")
        .arg(&config);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("TP1").not())
        .stdout(predicate::str::contains("#PWR01").not())
        .stdout(predicate::str::contains("References: 5"));
}

#[test]
fn test_cli_show_fields() {
    let (_dir, root, config) = scratch();
    let mut cmd = cmpmgr_cli();

    cmd.arg("show").arg(&root).arg("R1").arg("--config").arg(&config);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("LibRef    : R"))
        .stdout(predicate::str::contains("MPN"))
        .stdout(predicate::str::contains("RC0603FR-0710KL"))
        .stdout(predicate::str::contains("Horizontal"));
}

#[test]
fn test_cli_show_unknown_reference() {
    let (_dir, root, config) = scratch();
    let mut cmd = cmpmgr_cli();

    cmd.arg("show").arg(&root).arg("R99").arg("--config").arg(&config);

    cmd.assert()
        .code(3)
        .stderr(predicate::str::contains("R99"));
}

#[test]
fn test_cli_set_updates_file_and_writes_backup() {
    let (dir, root, config) = scratch();
    let mut cmd = cmpmgr_cli();

    cmd.arg("set")
        .arg(&root)
        .arg("R1")
        .arg("Value")
        .arg("4k7")
        .arg("--config")
        .arg(&config);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Updated 1 component(s)"));

    let saved = fs::read_to_string(&root).unwrap();
    assert!(saved.contains("F 1 \"4k7\" H 3070 1955 50  0000 L CNN\n"));
    assert!(dir.path().join("amplifier.~").exists());
}

#[test]
fn test_cli_set_adds_missing_field_to_every_unit() {
    let (_dir, root, config) = scratch();
    let mut cmd = cmpmgr_cli();

    cmd.arg("set")
        .arg(&root)
        .arg("U1")
        .arg("MPN")
        .arg("LM358DR")
        .arg("--config")
        .arg(&config);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Updated 2 component(s)"));

    let saved = fs::read_to_string(&root).unwrap();
    assert_eq!(saved.matches("F 4 \"LM358DR\"").count(), 2);
}

#[test]
fn test_cli_set_missing_fixed_field_uses_fixed_slot() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("bare.sch");
    fs::write(
        &root,
        "EESchema Schematic File Version 4\n\
         $Comp\n\
         L Device:R R5\n\
         U 1 1 5C8A5B40\n\
         P 2000 2000\n\
         F 0 \"R5\" H 2070 2046 50  0000 L CNN\n\
         F 1 \"1k\" H 2070 1955 50  0000 L CNN\n\
         F 4 \"RC0603FR-071KL\" H 2000 2000 50  0001 C CNN \"MPN\"\n\
         \t1    2000 2000\n\
         \t1    0    0    -1\n\
         $EndComp\n\
         $EndSCHEMATC\n",
    )
    .unwrap();
    let config = dir.path().join("cmpmgr.json");
    fs::write(&config, "{}").unwrap();
    let mut cmd = cmpmgr_cli();

    cmd.arg("set")
        .arg(&root)
        .arg("R5")
        .arg("Footprint")
        .arg("Resistor_SMD:R_0603_1608Metric")
        .arg("--config")
        .arg(&config);

    cmd.assert().success();

    let saved = fs::read_to_string(&root).unwrap();
    assert!(saved.contains(
        "F 1 \"1k\" H 2070 1955 50  0000 L CNN\n\
         F 2 \"Resistor_SMD:R_0603_1608Metric\" H 2000 2000 50  0000 C CNN\n\
         F 4 \"RC0603FR-071KL\""
    ));
    assert!(!saved.contains("\"Footprint\""));
}

#[test]
fn test_cli_remove_field() {
    let (_dir, root, config) = scratch();
    let mut cmd = cmpmgr_cli();

    cmd.arg("remove-field")
        .arg(&root)
        .arg("R1")
        .arg("MPN")
        .arg("--config")
        .arg(&config);

    cmd.assert().success();
    assert!(!fs::read_to_string(&root).unwrap().contains("\"MPN\""));
}

#[test]
fn test_cli_remove_fixed_field_is_refused() {
    let (_dir, root, config) = scratch();
    let original = fs::read_to_string(&root).unwrap();
    let mut cmd = cmpmgr_cli();

    cmd.arg("remove-field")
        .arg(&root)
        .arg("R1")
        .arg("Footprint")
        .arg("--config")
        .arg(&config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("fixed field"));
    assert_eq!(fs::read_to_string(&root).unwrap(), original);
}

#[test]
fn test_cli_remove_unknown_field() {
    let (_dir, root, config) = scratch();
    let mut cmd = cmpmgr_cli();

    cmd.arg("remove-field")
        .arg(&root)
        .arg("C1")
        .arg("MPN")
        .arg("--config")
        .arg(&config);

    cmd.assert().code(3);
}

#[test]
fn test_cli_name_template() {
    let (_dir, root, config) = scratch();
    let mut cmd = cmpmgr_cli();

    cmd.arg("name")
        .arg(&root)
        .arg("$Ref-$Value")
        .arg("--config")
        .arg(&config);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("R1\tR1-10k"))
        .stdout(predicate::str::contains("U3\tU3-AMS1117-3.3"));
}

#[test]
fn test_cli_unannotated_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("cmpmgr.json");
    fs::write(&config, "{}").unwrap();
    let mut cmd = cmpmgr_cli();

    cmd.arg("list")
        .arg(fixtures_dir().join("unannotated.sch"))
        .arg("--config")
        .arg(&config);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("R?"));
}

#[test]
fn test_cli_missing_file() {
    let (dir, _root, config) = scratch();
    let mut cmd = cmpmgr_cli();

    cmd.arg("list")
        .arg(dir.path().join("nope.sch"))
        .arg("--config")
        .arg(&config);

    cmd.assert().code(1);
}

#[test]
fn test_cli_bad_config() {
    let (dir, root, _config) = scratch();
    let config = dir.path().join("broken.json");
    fs::write(&config, "{ \"log_level\": \"loud\" }").unwrap();
    let mut cmd = cmpmgr_cli();

    cmd.arg("list").arg(&root).arg("--config").arg(&config);

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("loud"));
}

#[test]
fn test_cli_ignore_add_list_remove() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("settings").join("cmpmgr.json");

    cmpmgr_cli()
        .args(["ignore", "add", "TP", "--config"])
        .arg(&config)
        .assert()
        .success();
    assert!(config.exists());

    cmpmgr_cli()
        .args(["ignore", "list", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("TP"));

    cmpmgr_cli()
        .args(["ignore", "remove", "TP", "--config"])
        .arg(&config)
        .assert()
        .success();

    cmpmgr_cli()
        .args(["ignore", "remove", "TP", "--config"])
        .arg(&config)
        .assert()
        .code(3);
}

#[test]
fn test_cli_persisted_ignore_applies_to_list() {
    let (_dir, root, config) = scratch();
    fs::write(&config, r#"{ "component_ignore": ["TP"] }"#).unwrap();
    let mut cmd = cmpmgr_cli();

    cmd.arg("list").arg(&root).arg("--config").arg(&config);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("TP1").not());
}
