//! Integration tests: CLI smoke tests and end-to-end scan, conflict and
//! minSdkVersion scenarios against temporary project trees.

mod common;

use std::fs;
use std::path::Path;

use android_plugin_fixer::manifest::sdk::read_min_sdk;
use common::{manifest_with_min_sdk, path_arg, run_cli_case, run_cli_case_with_env, write_file};
use tempfile::TempDir;

const HUMAN: &[(&str, &str)] = &[("APF_OUTPUT_FORMAT", "human")];

/// Two versions of one archive, a library, two manifests and one misplaced
/// archive.
fn sample_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_file(root, "Assets/Plugins/Android/mylib-1.0.0.aar", "one");
    write_file(root, "Assets/Plugins/Android/mylib-2.1.aar", "two!");
    write_file(root, "Assets/Plugins/Android/libs/gson-2.8.jar", "jar");
    write_file(root, "Assets/Other/stray.aar", "stray");
    write_file(
        root,
        "Assets/Plugins/Android/AndroidManifest.xml",
        &manifest_with_min_sdk("19"),
    );
    write_file(
        root,
        "Assets/Plugins/Android/Vendor/AndroidManifest.xml",
        &manifest_with_min_sdk("21"),
    );
    dir
}

#[test]
fn help_command_prints_usage() {
    let result = run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: apf [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn version_command_prints_version() {
    let result = run_cli_case("version_command_prints_version", &["--version"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(
        result.stdout.contains("apf"),
        "missing version output; log: {}",
        result.log_path.display()
    );
}

#[test]
fn subcommand_help_flags_work() {
    for subcommand in [
        "scan",
        "check-conflicts",
        "normalize-sdk",
        "config",
        "completions",
    ] {
        let result = run_cli_case(&format!("help_{subcommand}"), &[subcommand, "--help"]);
        assert!(
            result.status.success(),
            "{subcommand} --help failed; log: {}",
            result.log_path.display()
        );
    }
}

#[test]
fn completions_generate_script() {
    let result = run_cli_case("completions_bash", &["completions", "bash"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("apf"));
}

#[test]
fn scan_lists_every_kind_as_json() {
    let project = sample_project();
    let result = run_cli_case("scan_json", &["scan", path_arg(project.path()), "--json"]);
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());

    let payload = result.json();
    assert_eq!(payload["command"], "scan");
    assert_eq!(payload["archives"].as_array().unwrap().len(), 3);
    assert_eq!(payload["libraries"].as_array().unwrap().len(), 1);
    assert_eq!(payload["manifests"].as_array().unwrap().len(), 2);
    assert_eq!(payload["highest_min_sdk"], 21);
    assert_eq!(payload["archives"][0]["display_path"], "Assets/Plugins/Android/mylib-1.0.0.aar");
    assert_eq!(payload["archives"][0]["size_bytes"], 3);
    assert_eq!(payload["archives"][0]["logical_name"], "mylib");
    assert_eq!(payload["archives"][0]["version"], "1.0.0");
    assert_eq!(payload["archives"][2]["logical_name"], "stray");
    assert!(payload["archives"][2]["version"].is_null());
}

#[test]
fn scan_empty_project_warns_on_stderr() {
    let dir = TempDir::new().unwrap();
    let result = run_cli_case("scan_empty", &["scan", path_arg(dir.path())]);
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("no Android plugin files found"));
    assert_eq!(result.json()["archives"].as_array().unwrap().len(), 0);
}

#[test]
fn scan_human_output_uses_project_relative_paths() {
    let project = sample_project();
    let result = run_cli_case_with_env("scan_human", &["scan", path_arg(project.path())], HUMAN);
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("Archives (3)"));
    assert!(result.stdout.contains("Assets/Plugins/Android/libs/gson-2.8.jar"));
    assert!(result.stdout.contains("minSdkVersion 19"));
    assert!(result.stdout.contains("Highest minSdkVersion: 21"));
}

#[test]
fn scan_missing_root_is_filesystem_failure() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    let result = run_cli_case("scan_missing_root", &["scan", path_arg(&missing)]);
    assert_eq!(result.code(), Some(2), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("APF-3002"));
}

#[test]
fn scan_file_root_is_not_a_directory() {
    let project = sample_project();
    let file = project.path().join("Assets/Other/stray.aar");
    let result = run_cli_case("scan_file_root", &["scan", path_arg(&file)]);
    assert_eq!(result.code(), Some(2), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("APF-3001"));
}

#[test]
fn check_conflicts_reports_duplicate_and_misplaced_archives() {
    let project = sample_project();
    let result = run_cli_case(
        "conflicts_json",
        &["check-conflicts", "archives", "--root", path_arg(project.path()), "--json"],
    );
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());

    let payload = result.json();
    assert_eq!(payload["kind"], "archives");
    assert_eq!(payload["clean"], false);
    assert_eq!(payload["groups"].as_array().unwrap().len(), 1);
    assert_eq!(payload["groups"][0]["logical_name"], "mylib");
    assert_eq!(payload["excluded"], 1);
    assert_eq!(payload["duplicates"], 1);
    assert!(!result.stdout.contains("already added"));
}

#[test]
fn check_conflicts_piped_json_still_reports_findings_on_stderr() {
    let project = sample_project();
    let result = run_cli_case(
        "conflicts_piped",
        &["check-conflicts", "archives", "--root", path_arg(project.path())],
    );
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());

    // stdout is a pipe here, so JSON is the default format.
    let payload = result.json();
    assert_eq!(payload["groups"][0]["logical_name"], "mylib");
    assert!(result.stderr.contains(".aar \"mylib\" already added:"));
    assert!(result.stderr.contains("mylib-2.1.aar"));
    assert!(result.stderr.contains("stray.aar file excluded from build (move to proper folder)"));
}

#[test]
fn check_conflicts_human_splits_findings_and_groups() {
    let project = sample_project();
    let result = run_cli_case_with_env(
        "conflicts_human",
        &["check-conflicts", "archives", "--root", path_arg(project.path()), "--no-color"],
        HUMAN,
    );
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());
    assert!(result.stderr.contains(".aar \"mylib\" already added:"));
    assert!(result.stderr.contains("stray.aar file excluded from build (move to proper folder)"));
    assert!(result.stdout.contains("mylib  Assets/Plugins/Android/mylib-1.0.0.aar"));
    assert!(!result.stdout.contains("already added"));
}

#[test]
fn quiet_mode_hides_location_warnings_but_not_duplicates() {
    let project = sample_project();
    let result = run_cli_case_with_env(
        "conflicts_quiet",
        &["check-conflicts", "archives", "--root", path_arg(project.path()), "-q"],
        HUMAN,
    );
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());
    assert!(!result.stderr.contains("excluded from build"));
    assert!(result.stderr.contains("already added"));
}

#[test]
fn check_conflicts_libraries_is_clean() {
    let project = sample_project();
    let result = run_cli_case_with_env(
        "conflicts_libraries",
        &["check-conflicts", "libraries", "--root", path_arg(project.path())],
        &[("APF_OUTPUT_FORMAT", "json")],
    );
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());
    let payload = result.json();
    assert_eq!(payload["clean"], true);
    assert_eq!(payload["groups"][0]["logical_name"], "gson");
}

#[test]
fn check_conflicts_rejects_unknown_kind() {
    let result = run_cli_case("conflicts_bad_kind", &["check-conflicts", "dlls"]);
    assert_eq!(result.code(), Some(2), "clap usage errors exit 2; log: {}", result.log_path.display());
}

#[test]
fn normalize_sdk_raises_every_manifest_to_highest() {
    let project = sample_project();
    let result = run_cli_case(
        "normalize_highest",
        &["normalize-sdk", path_arg(project.path()), "--json"],
    );
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());

    let payload = result.json();
    assert_eq!(payload["target"], 21);
    assert_eq!(payload["rewritten"], 1);
    for rel in [
        "Assets/Plugins/Android/AndroidManifest.xml",
        "Assets/Plugins/Android/Vendor/AndroidManifest.xml",
    ] {
        assert_eq!(read_min_sdk(&project.path().join(rel)).unwrap(), Some(21));
    }
}

#[test]
fn normalize_sdk_explicit_target_dry_run_leaves_files() {
    let project = sample_project();
    let manifest = project.path().join("Assets/Plugins/Android/AndroidManifest.xml");
    let before = fs::read_to_string(&manifest).unwrap();

    let result = run_cli_case_with_env(
        "normalize_dry_run",
        &["normalize-sdk", path_arg(project.path()), "--target", "26", "--dry-run"],
        HUMAN,
    );
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("19 -> 26"));
    assert!(result.stdout.contains("would rewrite 2 of 2 manifests"));
    assert_eq!(fs::read_to_string(&manifest).unwrap(), before);
}

#[test]
fn normalize_sdk_preserves_surrounding_text() {
    let project = sample_project();
    let manifest = project.path().join("Assets/Plugins/Android/AndroidManifest.xml");
    let before = fs::read_to_string(&manifest).unwrap();

    let result = run_cli_case(
        "normalize_bytes",
        &["normalize-sdk", path_arg(project.path()), "--target", "23", "--json"],
    );
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());
    let after = fs::read_to_string(&manifest).unwrap();
    assert_eq!(after, before.replace("\"19\"", "\"23\""));
}

#[test]
fn normalize_sdk_malformed_manifest_fails_but_others_are_written() {
    let project = sample_project();
    write_file(
        project.path(),
        "Assets/Plugins/Android/Broken/AndroidManifest.xml",
        "<manifest><uses-sdk></manifest>",
    );

    let result = run_cli_case(
        "normalize_malformed",
        &["normalize-sdk", path_arg(project.path()), "--json"],
    );
    assert_eq!(result.code(), Some(2), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("1 manifest(s) could not be processed"));
    assert_eq!(
        read_min_sdk(&project.path().join("Assets/Plugins/Android/AndroidManifest.xml")).unwrap(),
        Some(21)
    );
}

#[test]
fn normalize_sdk_parse_error_is_advisory() {
    let project = sample_project();
    write_file(
        project.path(),
        "Assets/Plugins/Android/Odd/AndroidManifest.xml",
        &manifest_with_min_sdk("twenty"),
    );

    let result = run_cli_case_with_env(
        "normalize_parse_error",
        &["normalize-sdk", path_arg(project.path())],
        HUMAN,
    );
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("APF-2002"));
    assert_eq!(
        read_min_sdk(&project.path().join("Assets/Plugins/Android/Odd/AndroidManifest.xml"))
            .unwrap(),
        Some(21)
    );
}

#[test]
fn missing_explicit_config_is_user_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    let result = run_cli_case(
        "missing_config",
        &["--config", path_arg(&missing), "scan", path_arg(dir.path())],
    );
    assert_eq!(result.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("APF-1002"));
}

#[test]
fn config_validate_rejects_zero_depth() {
    let dir = TempDir::new().unwrap();
    let config = write_file(dir.path(), "apf.toml", "[scanner]\nmax_depth = 0\n");
    let result = run_cli_case(
        "config_validate_invalid",
        &["--config", path_arg(&config), "config", "validate", "--json"],
    );
    assert_eq!(result.code(), Some(1), "log: {}", result.log_path.display());
    assert_eq!(result.json()["valid"], false);
}

#[test]
fn config_show_reflects_file_values() {
    let dir = TempDir::new().unwrap();
    let config = write_file(
        dir.path(),
        "apf.toml",
        "[layout]\nallowed_parents = [\"Plugins/Android\", \"aars\"]\n",
    );
    let result = run_cli_case(
        "config_show",
        &["--config", path_arg(&config), "config", "show", "--json"],
    );
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());
    let payload = result.json();
    assert_eq!(payload["config"]["layout"]["allowed_parents"][1], "aars");
    assert_eq!(payload["config"]["scanner"]["archive_pattern"], "*.aar");
}

#[test]
fn custom_layout_admits_configured_parent() {
    let project = sample_project();
    write_file(project.path(), "Assets/Plugins/Android/aars/extra-3.aar", "x");
    let config = write_file(
        project.path(),
        "apf.toml",
        "[layout]\nallowed_parents = [\"Plugins/Android\", \"aars\"]\n",
    );
    let result = run_cli_case(
        "custom_layout",
        &[
            "--config",
            path_arg(&config),
            "check-conflicts",
            "archives",
            "--root",
            path_arg(project.path()),
            "--json",
        ],
    );
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());
    let payload = result.json();
    let names: Vec<&str> = payload["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["logical_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["extra", "mylib"]);
}

#[test]
fn bad_env_override_is_config_error() {
    let project = sample_project();
    let result = run_cli_case_with_env(
        "bad_env",
        &["scan", path_arg(project.path())],
        &[("APF_SCANNER_MAX_DEPTH", "deep")],
    );
    assert_eq!(result.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("APF-1003"));
}

#[test]
fn activity_log_records_normalize_run() {
    let project = sample_project();
    let log = project.path().join("state/activity.jsonl");
    let result = run_cli_case_with_env(
        "activity_log",
        &["normalize-sdk", path_arg(project.path()), "--json"],
        &[
            ("APF_LOGGING_JSONL_ENABLED", "true"),
            ("APF_PATHS_JSONL_LOG", path_arg(&log)),
        ],
    );
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());

    let contents = fs::read_to_string(&log).unwrap();
    let events: Vec<serde_json::Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events[0]["event"], "scan_complete");
    assert!(events.iter().any(|e| e["event"] == "manifest_rewrite" && e["previous"] == "19"));
}

#[test]
fn scan_of_tree_without_assets_keeps_full_paths() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "Plugins/Android/a-1.aar", "a");
    let result = run_cli_case("scan_no_assets", &["scan", path_arg(dir.path()), "--json"]);
    assert_eq!(result.code(), Some(0), "log: {}", result.log_path.display());
    let payload = result.json();
    let shown = payload["archives"][0]["display_path"].as_str().unwrap();
    assert!(Path::new(shown).is_absolute(), "expected absolute path, got {shown}");
}
