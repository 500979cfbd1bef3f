/*
 * update_pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Filesystem tests for the update pipeline.
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pretty_assertions::assert_eq;
use yaml_updater::{
    EventLevel, NoopObserver, PathChange, Stage, UpdateConfig, UpdateError, UpdateObserver,
    UpdateSource, update,
};

fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

fn load_fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", name))
}

/// A temp dir holding a copy of `app.yml`.
fn workspace() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("app.yml");
    fs::write(&target, load_fixture("app.yml")).unwrap();
    (dir, target)
}

fn template_config(target: &Path) -> UpdateConfig {
    UpdateConfig::new(target, UpdateSource::file(fixture_path("app.template.yml")))
        .with_delete_path("server/legacy")
        .with_variable("host", "db")
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[derive(Default)]
struct RecordingObserver {
    stages: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
    failed: Mutex<bool>,
}

impl UpdateObserver for RecordingObserver {
    fn on_stage_complete(&self, name: &str, _index: usize, _total: usize) {
        self.stages.lock().unwrap().push(name.to_string());
    }

    fn on_event(&self, message: &str, level: EventLevel) {
        if level == EventLevel::Warn {
            self.warnings.lock().unwrap().push(message.to_string());
        }
    }

    fn on_pipeline_error(&self, _error: &UpdateError) {
        *self.failed.lock().unwrap() = true;
    }
}

#[test]
fn test_update_merges_and_backs_up() {
    let (dir, target) = workspace();
    let report = update(&template_config(&target), &NoopObserver::new()).unwrap();

    assert_eq!(fs::read_to_string(&target).unwrap(), load_fixture("expected.yml"));
    assert!(report.changed);
    assert!(!report.first_install);
    assert_eq!(report.applied_variables, vec!["host".to_string()]);
    assert_eq!(
        report.removed,
        vec![PathChange {
            path: "server/legacy".to_string(),
            line: 4,
            preview: "  legacy: true".to_string(),
        }]
    );
    let added: Vec<(&str, usize)> = report
        .added
        .iter()
        .map(|change| (change.path.as_str(), change.line))
        .collect();
    assert_eq!(added, vec![("server/host", 5), ("database/pool", 9)]);

    let backup = report.backup.unwrap();
    assert_eq!(backup.parent(), Some(dir.path()));
    assert!(backup.file_name().unwrap().to_string_lossy().starts_with("app.yml."));
    assert_eq!(fs::read_to_string(&backup).unwrap(), load_fixture("app.yml"));
    assert_eq!(dir_entries(dir.path()).len(), 2);
}

#[test]
fn test_backup_directory_and_disabled_backup() {
    let (dir, target) = workspace();
    let backups = dir.path().join("backups");
    let report = update(
        &template_config(&target).with_backup_dir(&backups),
        &NoopObserver::new(),
    )
    .unwrap();
    assert!(report.backup.unwrap().starts_with(&backups));

    let (dir, target) = workspace();
    let report = update(
        &template_config(&target).with_backup(false),
        &NoopObserver::new(),
    )
    .unwrap();
    assert_eq!(report.backup, None);
    assert_eq!(dir_entries(dir.path()), vec!["app.yml".to_string()]);
}

#[test]
fn test_dry_run_leaves_target_untouched() {
    let (dir, target) = workspace();
    let report = update(
        &template_config(&target).with_dry_run(true),
        &NoopObserver::new(),
    )
    .unwrap();

    assert!(report.dry_run);
    assert!(report.changed);
    assert_eq!(report.output.as_deref(), Some(load_fixture("expected.yml").as_str()));
    assert_eq!(report.backup, None);
    assert_eq!(fs::read_to_string(&target).unwrap(), load_fixture("app.yml"));
    assert_eq!(dir_entries(dir.path()), vec!["app.yml".to_string()]);
}

#[test]
fn test_first_install_writes_template() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("conf").join("app.yml");
    let config = UpdateConfig::new(
        &target,
        UpdateSource::text("# defaults\nhost: #{host}\nport: 80\n"),
    )
    .with_variable("host", "db");

    let report = update(&config, &NoopObserver::new()).unwrap();
    assert!(report.first_install);
    assert_eq!(report.backup, None);
    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "# defaults\nhost: db\nport: 80\n"
    );
}

#[test]
fn test_unchanged_file_is_not_rewritten() {
    let (dir, target) = workspace();
    let config = template_config(&target).with_backup(false);
    update(&config, &NoopObserver::new()).unwrap();

    let report = update(&config.clone().with_backup(true), &NoopObserver::new()).unwrap();
    assert!(!report.changed);
    assert_eq!(report.backup, None);
    assert_eq!(dir_entries(dir.path()), vec!["app.yml".to_string()]);
    assert_eq!(fs::read_to_string(&target).unwrap(), load_fixture("expected.yml"));
}

#[test]
fn test_parse_error_leaves_target_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("app.yml");
    let broken = "list:\n  - x\n what\n";
    fs::write(&target, broken).unwrap();

    let observer = RecordingObserver::default();
    let err = update(&template_config(&target), &observer).unwrap_err();
    match err {
        UpdateError::Parse { source_name, .. } => assert!(source_name.ends_with("app.yml")),
        other => panic!("unexpected error: {}", other),
    }
    assert!(*observer.failed.lock().unwrap());
    assert_eq!(fs::read_to_string(&target).unwrap(), broken);
    assert_eq!(dir_entries(dir.path()), vec!["app.yml".to_string()]);
}

#[test]
fn test_missing_update_file_is_an_io_error() {
    let (_dir, target) = workspace();
    let config = UpdateConfig::new(&target, UpdateSource::file("/nonexistent/template.yml"));
    let err = update(&config, &NoopObserver::new()).unwrap_err();
    assert!(matches!(err, UpdateError::Io { action: "read update file", .. }));
}

#[test]
fn test_observer_sees_stages_and_warnings() {
    let (_dir, target) = workspace();
    let observer = RecordingObserver::default();
    let config = template_config(&target).with_delete_path("no/such/path");
    let report = update(&config, &observer).unwrap();

    let expected: Vec<String> = Stage::ALL.iter().map(|s| s.name().to_string()).collect();
    assert_eq!(*observer.stages.lock().unwrap(), expected);
    assert_eq!(report.missing_deletions, vec!["no/such/path".to_string()]);
    let warnings = observer.warnings.lock().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("no/such/path"));
}

#[test]
fn test_line_separator_of_current_file_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("app.yml");
    fs::write(&target, "a: 1\r\n").unwrap();
    let config = UpdateConfig::new(&target, UpdateSource::text("a: 2\nb: 3\n")).with_backup(false);

    update(&config, &NoopObserver::new()).unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "a: 1\r\nb: 3\r\n");
}

#[test]
fn test_report_serializes_to_json() {
    let (_dir, target) = workspace();
    let report = update(
        &template_config(&target).with_dry_run(true),
        &NoopObserver::new(),
    )
    .unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["added"][0]["path"], "server/host");
    assert_eq!(json["applied_variables"][0], "host");
    assert!(json["output"].is_string());
}

#[test]
fn test_later_documents_are_kept_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("app.yml");
    fs::write(&target, "a: 1\n---\nb: 2\n").unwrap();
    let config = UpdateConfig::new(&target, UpdateSource::text("a: 2\nc: 3\n# end\n"))
        .with_backup(false);

    let report = update(&config, &NoopObserver::new()).unwrap();
    assert!(report.changed);
    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "a: 1\nc: 3\n# end\n---\nb: 2\n"
    );
}

#[test]
fn test_validation_failure_leaves_target_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("app.yml");
    // the duplicate key is compared with the first `a` on read-back
    let current = "a: 1\na: 2\n";
    fs::write(&target, current).unwrap();
    let config = UpdateConfig::new(&target, UpdateSource::text("a: 1\nb: 3\n"));

    let observer = RecordingObserver::default();
    let err = update(&config, &observer).unwrap_err();
    match &err {
        UpdateError::Validation { listing, .. } => {
            assert!(listing.contains("2| a: 2"));
            assert!(listing.contains("3| b: 3"));
        }
        other => panic!("unexpected error: {}", other),
    }
    let completed = observer.stages.lock().unwrap();
    assert_eq!(completed.last().map(String::as_str), Some(Stage::Serialize.name()));
    assert!(*observer.failed.lock().unwrap());
    assert_eq!(fs::read_to_string(&target).unwrap(), current);
    assert_eq!(dir_entries(dir.path()), vec!["app.yml".to_string()]);
}
