//! End-to-end runs of the `kustgraph` binary.

use crate::common::TestApps;
use assert_cmd::Command;
use kustgraph_cli::test_utils::KustomizationFixture;
use predicates::prelude::*;

#[test]
fn test_list_root_apps() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    let output = apps.run(&["list-root-apps"]).unwrap();
    output.assert_success();
    assert_eq!(
        output.lines(),
        vec!["Root Applications:", "  - web/overlays/prod", "  - web/overlays/staging"]
    );
}

#[test]
fn test_list_root_apps_empty() {
    let apps = TestApps::new().unwrap();

    apps.run(&["list-root-apps"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("No root applications found in:");
}

#[test]
fn test_list_root_apps_yaml_output() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    let output = apps.run(&["list-root-apps", "-o", "roots.yaml"]).unwrap();
    output.assert_success();
    assert!(output.stdout.is_empty(), "unexpected stdout: {}", output.stdout);

    let yaml = std::fs::read_to_string(apps.path("roots.yaml")).unwrap();
    assert_eq!(yaml, "root-apps:\n- web/overlays/prod\n- web/overlays/staging\n");
}

#[test]
fn test_affected_apps() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    let output = apps
        .run(&[
            "affected-apps",
            "apps/web/base/service.yaml",
            "apps/web/overlays/prod/replicas.yaml",
        ])
        .unwrap();
    output.assert_success();
    assert_eq!(
        output.lines(),
        vec![
            "Affected Applications:",
            "Affected apps by web/base/service.yaml:",
            "  - web/overlays/prod",
            "  - web/overlays/staging",
            "Affected apps by web/overlays/prod/replicas.yaml:",
            "  - web/overlays/prod",
        ]
    );
}

#[test]
fn test_affected_apps_by_kustomization_file() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    apps.run(&["affected-apps", "apps/web/base/kustomization.yaml"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("  - web/overlays/prod")
        .assert_stdout_contains("  - web/overlays/staging");
}

#[test]
fn test_affected_apps_unreferenced_file() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();
    apps.write("apps/web/README.md", "# web\n").unwrap();

    apps.run(&["affected-apps", "apps/web/README.md"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Affected apps by web/README.md:")
        .assert_stdout_contains("is not referenced by any app")
        .assert_stdout_contains(
            "Summary: No applications were found to be affected by the specified file(s).",
        );
}

#[test]
fn test_affected_apps_from_file_list() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();
    apps.write("changed.txt", "apps/web/overlays/staging/app.env\n\n").unwrap();

    let output = apps.run(&["affected-apps", "-f", "changed.txt", "-o", "affected.yaml"]).unwrap();
    output.assert_success();

    let yaml = std::fs::read_to_string(apps.path("affected.yaml")).unwrap();
    assert_eq!(
        yaml,
        "affected-apps:\n  web/overlays/staging/app.env:\n  - web/overlays/staging\n"
    );
}

#[test]
fn test_affected_apps_without_input() {
    let apps = TestApps::new().unwrap();

    apps.run(&["affected-apps"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("No modified files provided to check.");
}

#[test]
fn test_app_files() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    let output = apps.run(&["app-files", "apps/web/overlays/prod/kustomization.yaml"]).unwrap();
    output.assert_success();
    assert_eq!(
        output.lines(),
        vec![
            "Files used by application 'web/overlays/prod':",
            "  - kustomization.yaml",
            "  - replicas.yaml",
            "  - web/base/deployment.yaml",
            "  - web/base/kustomization.yaml",
            "  - web/base/service.yaml",
        ]
    );
}

#[test]
fn test_app_files_missing_path() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    apps.run(&["app-files", "apps/nope"])
        .unwrap()
        .assert_failure()
        .assert_stderr_contains("path does not exist");
}

#[test]
fn test_order_json() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    let output = apps.run(&["order", "apps/web/overlays/prod", "--format", "json"]).unwrap();
    output.assert_success();

    let json: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(json["overlay"], "web/overlays/prod");
    assert_eq!(json["order"], serde_json::json!(["web/base", "web/overlays/prod"]));
}

#[test]
fn test_paths_text() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    apps.run(&["paths", "apps/web/overlays/prod", "apps/web/base/service.yaml"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("web/overlays/prod -> web/base -> web/base/service.yaml");
}

#[test]
fn test_deps_reverse() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    let output = apps.run(&["deps", "apps/web/base", "--reverse"]).unwrap();
    output.assert_success();
    assert_eq!(
        output.lines(),
        vec![
            "Dependents of 'web/base':",
            "  Direct:",
            "    - web/overlays/prod",
            "    - web/overlays/staging",
        ]
    );
}

#[test]
fn test_invalid_format_is_rejected() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    apps.run(&["deps", "apps/web/base", "--format", "tree"])
        .unwrap()
        .assert_failure()
        .assert_stderr_contains("Invalid format 'tree'");
}

#[test]
fn test_build_error_names_reference() {
    let apps = TestApps::new().unwrap();
    apps.kustomization("apps/prod", KustomizationFixture::new().base("../base")).unwrap();
    apps.kustomization("apps/base", KustomizationFixture::new().resource("gone.yaml"))
        .unwrap();

    apps.run(&["list-root-apps"])
        .unwrap()
        .assert_failure()
        .assert_stderr_contains("Node not found")
        .assert_stderr_contains("gone.yaml");
}

#[test]
fn test_apps_dir_is_required() {
    Command::cargo_bin("kustgraph")
        .unwrap()
        .arg("list-root-apps")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--apps-dir"));
}

#[test]
fn test_missing_apps_dir_fails() {
    let apps = TestApps::new().unwrap();

    Command::cargo_bin("kustgraph")
        .unwrap()
        .args(["--no-progress", "-a"])
        .arg(apps.path("missing"))
        .arg("list-root-apps")
        .env("KUSTGRAPH_CONFIG", apps.path("kustgraph.toml"))
        .env("NO_COLOR", "1")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_invalid_config_fails() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();
    apps.write("kustgraph.toml", "max_parallel = 0\n").unwrap();

    apps.run(&["list-root-apps"])
        .unwrap()
        .assert_failure()
        .assert_stderr_contains("max_parallel");
}
