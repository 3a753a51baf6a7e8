//! End-to-end tests for the srcplan binary.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use srcplan_types::component::ComponentDeps;
use srcplan_types::configured::ConfiguredPackage;
use srcplan_types::description::{FlagAssignment, PackageDescription};
use srcplan_types::identity::{ConfiguredId, PackageId};
use srcplan_types::location::PackageLocation;
use srcplan_types::outcome::{BuildFailure, BuildSuccess, CauseKind, FailureCause};
use srcplan_types::source::SourcePackage;
use std::fs;
use tempfile::TempDir;

fn srcplan() -> Command {
    Command::cargo_bin("srcplan").expect("srcplan binary")
}

fn pid(s: &str) -> PackageId {
    s.parse().expect("package id")
}

fn planned(id: &str, deps: &[&str]) -> ConfiguredPackage {
    let source = SourcePackage {
        package_id: pid(id),
        description: PackageDescription::new(pid(id)),
        location: PackageLocation::LocalUnpacked {
            path: format!("/src/{id}").into(),
        },
        description_override: None,
    };
    let deps = deps.iter().map(|d| ConfiguredId::planned(pid(d))).collect();
    ConfiguredPackage::new(
        source,
        FlagAssignment::new(),
        vec![],
        ComponentDeps::from_lib(deps),
    )
}

#[test]
fn component_id_prints_synthesized_id() {
    srcplan()
        .args(["component-id", "text", "2.0.1"])
        .assert()
        .success()
        .stdout("fake-installed-text-2.0.1\n");
}

#[test]
fn component_id_rejects_bad_version() {
    srcplan()
        .args(["component-id", "text", "two"])
        .assert()
        .failure();
}

#[test]
fn repos_reads_config_file() {
    let temp = TempDir::new().expect("tempdir");
    fs::write(
        temp.path().join("srcplan.toml"),
        r#"
[cache]
dir = "/var/cache/srcplan"

[network]
dual_protocol_hosts = ["packages.example.org"]

[[repository]]
name = "main"
url = "http://packages.example.org/"

[[repository]]
name = "vendored"
dir = "vendor"

[preferences]
base = "<5"
"#,
    )
    .expect("write config");

    srcplan()
        .current_dir(temp.path())
        .arg("repos")
        .assert()
        .success()
        .stdout(predicate::str::contains("cache: /var/cache/srcplan"))
        .stdout(predicate::str::contains(
            "remote main http://packages.example.org/ secure=false try_https=true \
             cache=/var/cache/srcplan/main",
        ))
        .stdout(predicate::str::contains("local vendor"))
        .stdout(predicate::str::contains("prefer base <5"));
}

#[test]
fn repos_cli_flags_override_config() {
    let temp = TempDir::new().expect("tempdir");
    fs::write(temp.path().join("srcplan.toml"), "[preferences]\nbase = \"<5\"\n")
        .expect("write config");

    let output = srcplan()
        .current_dir(temp.path())
        .args([
            "repos",
            "--cache-dir",
            "/tmp/srcplan-cache",
            "--prefer",
            "base=>=4",
            "--format",
            "json",
        ])
        .output()
        .expect("run");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["cache_dir"], "/tmp/srcplan-cache");
    assert_eq!(value["preferences"]["base"], ">=4");
    assert_eq!(value["repos"], serde_json::json!([]));
}

#[test]
fn repos_rejects_insecure_repo_with_keys() {
    let temp = TempDir::new().expect("tempdir");
    fs::write(
        temp.path().join("srcplan.toml"),
        r#"
[[repository]]
name = "main"
url = "https://packages.example.org/"
root_keys = ["aa01"]
"#,
    )
    .expect("write config");

    srcplan()
        .current_dir(temp.path())
        .arg("repos")
        .assert()
        .failure();
}

#[test]
fn order_lists_dependencies_first() {
    let temp = TempDir::new().expect("tempdir");
    let plan = vec![
        planned("app-1.0", &["text-2.0"]),
        planned("text-2.0", &["base-4.0"]),
        planned("base-4.0", &[]),
    ];
    let path = temp.path().join("plan.json");
    fs::write(&path, serde_json::to_string(&plan).unwrap()).expect("write plan");

    srcplan()
        .arg("order")
        .arg(&path)
        .assert()
        .success()
        .stdout(
            "base-4.0 fake-installed-base-4.0\n\
             text-2.0 fake-installed-text-2.0\n\
             app-1.0 fake-installed-app-1.0\n",
        );
}

#[test]
fn order_fails_on_cycle() {
    let temp = TempDir::new().expect("tempdir");
    let plan = vec![planned("a-1.0", &["b-1.0"]), planned("b-1.0", &["a-1.0"])];
    let path = temp.path().join("plan.json");
    fs::write(&path, serde_json::to_string(&plan).unwrap()).expect("write plan");

    srcplan().arg("order").arg(&path).assert().failure();
}

#[test]
fn order_check_rejects_undeclared_dependency() {
    let temp = TempDir::new().expect("tempdir");
    let plan = vec![planned("app-1.0", &["base-4.0"]), planned("base-4.0", &[])];
    let path = temp.path().join("plan.json");
    fs::write(&path, serde_json::to_string(&plan).unwrap()).expect("write plan");

    srcplan()
        .arg("order")
        .arg(&path)
        .arg("--check")
        .assert()
        .failure();
}

#[test]
fn report_writes_markdown() {
    let temp = TempDir::new().expect("tempdir");
    let results = serde_json::json!({
        "base-4.0": { "Ok": serde_json::to_value(BuildSuccess::default()).unwrap() },
        "app-1.0": {
            "Err": serde_json::to_value(BuildFailure::InstallFailed(
                FailureCause::new(CauseKind::Io, "permission denied"),
            )).unwrap()
        },
    });
    let path = temp.path().join("results.json");
    fs::write(&path, results.to_string()).expect("write results");
    let out = temp.path().join("out").join("report.md");

    srcplan()
        .arg("report")
        .arg(&path)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let md = fs::read_to_string(&out).expect("read report");
    assert!(md.contains("| `app-1.0` | install failed | - | - | permission denied |"));
    assert!(md.contains("| `base-4.0` | built | not tried | not tried | - |"));
}

#[test]
fn report_rejects_malformed_results() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("results.json");
    fs::write(&path, r#"{ "not a package id": { "Ok": {} } }"#).expect("write results");

    srcplan().arg("report").arg(&path).assert().failure();
}
