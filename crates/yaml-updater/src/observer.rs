/*
 * observer.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Observer for update pipeline progress and warnings.
 */

//! Observer abstraction for update pipeline events.
//!
//! The pipeline keeps no logging state of its own: every stage transition
//! and every recoverable problem (a deletion path that matched nothing, an
//! object list item left unmerged) is reported to the [`UpdateObserver`]
//! passed to [`crate::update`].

use crate::error::UpdateError;

/// The steps of an update, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ReadSources,
    ParseUpdate,
    ParseCurrent,
    DeleteProperties,
    Merge,
    Serialize,
    Validate,
    Write,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::ReadSources,
        Stage::ParseUpdate,
        Stage::ParseCurrent,
        Stage::DeleteProperties,
        Stage::Merge,
        Stage::Serialize,
        Stage::Validate,
        Stage::Write,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::ReadSources => "read-sources",
            Stage::ParseUpdate => "parse-update",
            Stage::ParseCurrent => "parse-current",
            Stage::DeleteProperties => "delete-properties",
            Stage::Merge => "merge",
            Stage::Serialize => "serialize",
            Stage::Validate => "validate",
            Stage::Write => "write",
        }
    }
}

/// Event severity level for pipeline events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Debug,
    Info,
    /// Something was skipped but the update goes on
    Warn,
}

/// Observer for update pipeline events.
///
/// All methods have empty default implementations, so observers only
/// implement the events they care about.
pub trait UpdateObserver: Send + Sync {
    /// Called when a stage begins.
    ///
    /// # Arguments
    ///
    /// * `name` - Stage name (see [`Stage::name`])
    /// * `index` - Zero-based index of the stage
    /// * `total` - Number of stages in the pipeline
    fn on_stage_start(&self, _name: &str, _index: usize, _total: usize) {}

    /// Called when a stage completes successfully.
    fn on_stage_complete(&self, _name: &str, _index: usize, _total: usize) {}

    /// Called when a stage fails. The pipeline stops right after.
    fn on_stage_error(&self, _name: &str, _index: usize, _error: &UpdateError) {}

    /// Called for warnings and details emitted while a stage runs.
    fn on_event(&self, _message: &str, _level: EventLevel) {}

    fn on_pipeline_start(&self, _total_stages: usize) {}

    fn on_pipeline_complete(&self) {}

    fn on_pipeline_error(&self, _error: &UpdateError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl NoopObserver {
    pub fn new() -> Self {
        Self
    }
}

impl UpdateObserver for NoopObserver {}

/// Observer that emits `tracing` events.
///
/// Stage transitions are logged at debug level; warnings keep their level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl UpdateObserver for TracingObserver {
    fn on_stage_start(&self, name: &str, index: usize, total: usize) {
        tracing::debug!(
            stage.name = name,
            stage.index = index,
            stage.total = total,
            "Starting stage"
        );
    }

    fn on_stage_complete(&self, name: &str, index: usize, total: usize) {
        tracing::debug!(
            stage.name = name,
            stage.index = index,
            stage.total = total,
            "Completed stage"
        );
    }

    fn on_stage_error(&self, name: &str, index: usize, error: &UpdateError) {
        tracing::error!(
            stage.name = name,
            stage.index = index,
            error = %error,
            "Stage failed"
        );
    }

    fn on_event(&self, message: &str, level: EventLevel) {
        match level {
            EventLevel::Debug => tracing::debug!("{}", message),
            EventLevel::Info => tracing::info!("{}", message),
            EventLevel::Warn => tracing::warn!("{}", message),
        }
    }

    fn on_pipeline_start(&self, total_stages: usize) {
        tracing::debug!(total_stages = total_stages, "Starting update");
    }

    fn on_pipeline_complete(&self) {
        tracing::debug!("Update completed");
    }

    fn on_pipeline_error(&self, error: &UpdateError) {
        tracing::debug!(error = %error, "Update failed");
    }
}
