// src/cli/handlers/commons.rs

// Shared helpers for the handlers: workspace discovery, config loading and
// the runtime-dependent logger level.

use anyhow::{Context, Result};
use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    constants::{DEFAULT_TASK_RUNNER, WORKSPACE_ROOT_ENV},
    core::{config_store::ConfigStore, reporter},
    models::{AliasConfig, RuntimeOptions},
};

/// The workspace root: `PAE_WORKSPACE_ROOT` when set, else the current directory.
pub fn workspace_root() -> Result<PathBuf> {
    let raw = match env::var_os(WORKSPACE_ROOT_ENV) {
        Some(root) if !root.is_empty() => PathBuf::from(root),
        _ => env::current_dir().context("Could not determine the current directory")?,
    };
    dunce::canonicalize(&raw)
        .with_context(|| format!("Workspace root '{}' is not accessible", raw.display()))
}

/// Loads the workspace config and prints any validation warnings.
pub fn load_config(root: &Path) -> Result<(ConfigStore, Arc<AliasConfig>)> {
    let mut store = ConfigStore::for_workspace(root);
    let config = store.load().context("Failed to load the alias configuration")?;
    reporter::report_warnings(store.validation_errors());
    Ok((store, config))
}

/// The task-runner program: `taskRunner` from the config, with `~` and
/// `$VAR` expanded; relative paths with a separator resolve against `root`.
pub fn resolve_task_runner(config: &AliasConfig, root: &Path) -> Result<String> {
    let Some(raw) = config.task_runner.as_deref() else {
        return Ok(DEFAULT_TASK_RUNNER.to_string());
    };
    let expanded = shellexpand::full(raw)
        .with_context(|| format!("Could not expand taskRunner '{}'", raw))?;
    let path = Path::new(&*expanded);
    if path.is_relative() && expanded.contains('/') {
        return Ok(root.join(path).display().to_string());
    }
    Ok(expanded.into_owned())
}

/// Raises the global log level for the verbose and debug markers.
///
/// An explicit `RUST_LOG` always wins.
pub fn apply_log_level(options: &RuntimeOptions) {
    if env::var_os("RUST_LOG").is_some() {
        return;
    }
    let level = if options.debug {
        log::LevelFilter::Debug
    } else if options.verbose {
        log::LevelFilter::Info
    } else {
        return;
    };
    if level > log::max_level() {
        log::set_max_level(level);
    }
}
