/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * yaml-updater command-line entry point.
 */

//! yaml-updater CLI - Main entry point

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yaml_rust2::{Yaml, YamlLoader};
use yaml_updater::{TracingObserver, UpdateConfig, UpdateSource, update};

#[derive(Parser)]
#[command(name = "yaml-updater")]
#[command(version)]
#[command(about = "Update a YAML configuration file from a newer template", long_about = None)]
struct Cli {
    /// Configuration file to update (created if missing)
    config: PathBuf,

    /// Template with the new configuration layout
    update: PathBuf,

    /// Remove a property before merging (e.g. server/port, list[0]/name)
    #[arg(short = 'd', long = "delete-path", value_name = "PATH")]
    delete_paths: Vec<String>,

    /// Template variable (NAME=VALUE), replaces #{NAME}
    #[arg(short = 'e', long = "env", value_name = "NAME=VALUE")]
    env: Vec<String>,

    /// YAML file with template variables (name: value)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Do not keep a copy of the previous file
    #[arg(long)]
    no_backup: bool,

    /// Directory for backup copies (defaults to the file's directory)
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// Skip re-parsing and checking the merged result
    #[arg(long)]
    no_validate: bool,

    /// Show what would change without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Show debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "yaml_updater=debug,yaml_updater_core=debug"
    } else {
        "yaml_updater=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut variables = BTreeMap::new();
    if let Some(path) = &cli.env_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read env file {}", path.display()))?;
        variables.extend(
            parse_env_file(&content)
                .with_context(|| format!("Invalid env file {}", path.display()))?,
        );
    }
    for pair in &cli.env {
        let (name, value) = parse_env_pair(pair)?;
        variables.insert(name, value);
    }

    let mut config = UpdateConfig::new(&cli.config, UpdateSource::file(&cli.update))
        .with_delete_paths(cli.delete_paths.iter().cloned())
        .with_variables(variables)
        .with_backup(!cli.no_backup)
        .with_validation(!cli.no_validate)
        .with_dry_run(cli.dry_run);
    if let Some(dir) = &cli.backup_dir {
        config = config.with_backup_dir(dir);
    }

    let report = update(&config, &TracingObserver::new())
        .with_context(|| format!("Failed to update {}", cli.config.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
        if let Some(output) = &report.output {
            println!();
            print!("{}", output);
        }
    }
    Ok(())
}

/// Split `NAME=VALUE`.
fn parse_env_pair(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => bail!("Invalid variable '{}', expected NAME=VALUE", pair),
    }
}

/// Read a flat `name: value` YAML mapping.
fn parse_env_file(content: &str) -> Result<BTreeMap<String, String>> {
    let docs = YamlLoader::load_from_str(content)?;
    let mut variables = BTreeMap::new();
    let hash = match docs.into_iter().next() {
        None | Some(Yaml::Null) => return Ok(variables),
        Some(Yaml::Hash(hash)) => hash,
        Some(_) => bail!("expected a mapping of names to values"),
    };
    for (key, value) in hash {
        let Some(name) = scalar_text(&key) else {
            bail!("variable names must be scalars");
        };
        let Some(value) = scalar_text(&value) else {
            bail!("value of '{}' must be a scalar", name);
        };
        variables.insert(name, value);
    }
    Ok(variables)
}

fn scalar_text(value: &Yaml) -> Option<String> {
    match value {
        Yaml::String(s) | Yaml::Real(s) => Some(s.clone()),
        Yaml::Integer(i) => Some(i.to_string()),
        Yaml::Boolean(b) => Some(b.to_string()),
        Yaml::Null => Some(String::new()),
        _ => None,
    }
}
