/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The update pipeline: parse, delete, merge, validate, replace.
 */

//! The update pipeline.
//!
//! Stages run strictly in order, each feeding the next:
//!
//! 1. read the current file (if any) and the update text, substituting
//!    variables into the latter
//! 2. parse the update document
//! 3. parse the current document
//! 4. remove the configured deletion paths from the current document
//! 5. merge and render with the current file's line separator
//! 6. write the result to a scratch file next to the target
//! 7. read the scratch file back and validate it against both documents
//! 8. back up the target and move the scratch file over it
//!
//! The target is only replaced in step 8. A failure anywhere before drops
//! the scratch file and leaves the target untouched.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use yaml_updater_core::diagnostic::numbered_listing;
use yaml_updater_core::{Document, merge, parse_document, parse_structure, render, validate};

use crate::backup::create_backup;
use crate::config::UpdateConfig;
use crate::error::{Result, UpdateError};
use crate::observer::{EventLevel, Stage, UpdateObserver};
use crate::report::{FileStats, PathChange, UpdateReport, added_paths};
use crate::variables::substitute;

/// Run a full update as described by `config`.
///
/// # Errors
///
/// Any error aborts the update before the target is replaced. Recoverable
/// problems are reported through `observer` and the returned report.
pub fn update(config: &UpdateConfig, observer: &dyn UpdateObserver) -> Result<UpdateReport> {
    let runner = StageRunner {
        observer,
        total: Stage::ALL.len(),
    };
    observer.on_pipeline_start(runner.total);
    match run_pipeline(config, &runner) {
        Ok(report) => {
            observer.on_pipeline_complete();
            Ok(report)
        }
        Err(e) => {
            observer.on_pipeline_error(&e);
            Err(e)
        }
    }
}

struct StageRunner<'a> {
    observer: &'a dyn UpdateObserver,
    total: usize,
}

impl StageRunner<'_> {
    fn run<T>(&self, stage: Stage, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let index = stage as usize;
        self.observer.on_stage_start(stage.name(), index, self.total);
        match f() {
            Ok(output) => {
                self.observer
                    .on_stage_complete(stage.name(), index, self.total);
                Ok(output)
            }
            Err(e) => {
                self.observer.on_stage_error(stage.name(), index, &e);
                Err(e)
            }
        }
    }

    fn event(&self, level: EventLevel, message: String) {
        self.observer.on_event(&message, level);
    }
}

struct Sources {
    /// `None` when the target does not exist yet.
    current: Option<String>,
    update: String,
    applied_variables: Vec<String>,
}

fn run_pipeline(config: &UpdateConfig, runner: &StageRunner<'_>) -> Result<UpdateReport> {
    let target = &config.target;
    let target_name = target.display().to_string();

    let sources = runner.run(Stage::ReadSources, || read_sources(config))?;
    let first_install = sources.current.is_none();
    let current_text = sources.current.as_deref().unwrap_or_default();
    let separator = line_separator(sources.current.as_deref(), &sources.update);
    if first_install {
        runner.event(
            EventLevel::Info,
            format!("{} does not exist, installing update", target_name),
        );
    }

    let update_name = config.update.name();
    let update_doc = runner.run(Stage::ParseUpdate, || {
        parse_document(&sources.update, &update_name).map_err(|e| UpdateError::parse(&update_name, e))
    })?;
    let mut current = runner.run(Stage::ParseCurrent, || {
        parse_document(current_text, &target_name).map_err(|e| UpdateError::parse(&target_name, e))
    })?;

    let (removed, missing_deletions) = runner.run(Stage::DeleteProperties, || {
        Ok(delete_paths(&mut current, current_text, &config.delete_paths))
    })?;
    for path in &missing_deletions {
        runner.event(EventLevel::Warn, format!("nothing to delete at '{}'", path));
    }

    let (text, unmatched, added) = runner.run(Stage::Merge, || {
        let summary = merge(&mut current.comments, &update_doc.comments);
        let text = render(&current.comments, separator);
        let unmatched: Vec<String> = summary.unmatched.iter().map(ToString::to_string).collect();
        Ok((text, unmatched, added_paths(&current.comments)))
    })?;
    for path in &unmatched {
        runner.event(
            EventLevel::Warn,
            format!("list item '{}' has no unique match in the update, left as is", path),
        );
    }

    let changed = first_install || text != current_text;
    let scratch = runner.run(Stage::Serialize, || {
        if config.dry_run || !changed {
            return Ok(None);
        }
        write_scratch(config.target_dir(), &text).map(Some)
    })?;

    runner.run(Stage::Validate, || {
        if !config.validate_result {
            runner.event(EventLevel::Debug, "result validation disabled".to_string());
            return Ok(());
        }
        let written = match &scratch {
            Some(file) => fs::read_to_string(file.path())
                .map_err(|e| UpdateError::io("read scratch file", file.path(), e))?,
            None => text.clone(),
        };
        let old = (!first_install).then_some(&current.structure);
        let validation_error = |source: yaml_updater_core::Error| UpdateError::Validation {
            source,
            listing: numbered_listing(&written),
        };
        let reparsed = parse_structure(&written).map_err(validation_error)?;
        validate(&reparsed, old, &update_doc.structure).map_err(validation_error)
    })?;

    let backup = runner.run(Stage::Write, || {
        let Some(scratch) = scratch else {
            let reason = if config.dry_run { "dry run" } else { "no changes" };
            runner.event(EventLevel::Info, format!("{} not written ({})", target_name, reason));
            return Ok(None);
        };
        replace_target(config, scratch, first_install)
    })?;

    Ok(UpdateReport {
        target: target.clone(),
        first_install,
        changed,
        dry_run: config.dry_run,
        before: FileStats::of(current_text),
        after: FileStats::of(&text),
        added,
        removed,
        missing_deletions,
        unmatched,
        applied_variables: sources.applied_variables,
        backup,
        output: config.dry_run.then(|| text.clone()),
    })
}

fn read_sources(config: &UpdateConfig) -> Result<Sources> {
    let current = match fs::read_to_string(&config.target) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(UpdateError::io("read", &config.target, e)),
    };
    let substitution = substitute(&config.update.load()?, &config.variables);
    Ok(Sources {
        current,
        update: substitution.text,
        applied_variables: substitution.applied,
    })
}

/// Separator for the merged file: the current file's, else the update's,
/// else the platform's.
pub(crate) fn line_separator(current: Option<&str>, update: &str) -> &'static str {
    let detect = |text: &str| {
        if text.contains("\r\n") {
            Some("\r\n")
        } else if text.contains('\n') {
            Some("\n")
        } else {
            None
        }
    };
    current
        .and_then(detect)
        .or_else(|| detect(update))
        .unwrap_or(if cfg!(windows) { "\r\n" } else { "\n" })
}

/// Remove `paths` from both trees, returning what was removed (with the
/// original line) and which paths matched nothing.
fn delete_paths(
    document: &mut Document,
    content: &str,
    paths: &[String],
) -> (Vec<PathChange>, Vec<String>) {
    let mut removed = Vec::new();
    let mut missing = Vec::new();
    for path in paths {
        let Some(id) = document.comments.resolve(path) else {
            missing.push(path.clone());
            continue;
        };
        let node = document.comments.node(id);
        let change = PathChange {
            path: document.comments.path(id).to_string(),
            line: node.line_num,
            preview: content
                .lines()
                .nth(node.line_num.saturating_sub(1))
                .unwrap_or_default()
                .to_string(),
        };
        if document.delete(path) {
            removed.push(change);
        }
    }
    (removed, missing)
}

fn write_scratch(dir: &Path, text: &str) -> Result<NamedTempFile> {
    fs::create_dir_all(dir).map_err(|e| UpdateError::io("create directory", dir, e))?;
    let mut file =
        NamedTempFile::new_in(dir).map_err(|e| UpdateError::io("create scratch file in", dir, e))?;
    file.write_all(text.as_bytes())
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| UpdateError::io("write scratch file", file.path(), e))?;
    Ok(file)
}

fn replace_target(
    config: &UpdateConfig,
    scratch: NamedTempFile,
    first_install: bool,
) -> Result<Option<PathBuf>> {
    let target = &config.target;
    let mut backup = None;
    if !first_install {
        if config.backup {
            backup = Some(create_backup(target, config.backup_dir.as_deref())?);
        }
        let permissions = fs::metadata(target)
            .map_err(|e| UpdateError::io("read permissions of", target, e))?
            .permissions();
        scratch
            .as_file()
            .set_permissions(permissions)
            .map_err(|e| UpdateError::io("copy permissions to", scratch.path(), e))?;
    }
    scratch
        .persist(target)
        .map_err(|e| UpdateError::io("replace", target, e.error))?;
    tracing::info!(target = %target.display(), "configuration written");
    Ok(backup)
}
