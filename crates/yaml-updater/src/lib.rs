/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Update YAML configuration files from a newer template.
 */

//! # yaml-updater
//!
//! Brings a user's YAML configuration file up to date with a newer template
//! while keeping every value, comment and blank line the user wrote.
//!
//! ```no_run
//! use yaml_updater::{TracingObserver, UpdateConfig, UpdateSource, update};
//!
//! let config = UpdateConfig::new("app.yml", UpdateSource::file("app.template.yml"))
//!     .with_delete_path("server/legacy")
//!     .with_variable("host", "db.internal");
//! let report = update(&config, &TracingObserver::new())?;
//! println!("{}", report);
//! # Ok::<(), yaml_updater::UpdateError>(())
//! ```
//!
//! See [`pipeline`] for the order of operations and the guarantees around
//! the target file.

pub mod backup;
pub mod config;
mod error;
pub mod observer;
pub mod pipeline;
pub mod report;
pub mod variables;

pub use config::{UpdateConfig, UpdateSource};
pub use error::{Result, UpdateError};
pub use observer::{EventLevel, NoopObserver, Stage, TracingObserver, UpdateObserver};
pub use pipeline::update;
pub use report::{FileStats, PathChange, UpdateReport};
pub use variables::{Substitution, substitute};
