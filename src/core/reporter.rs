// src/core/reporter.rs

//! Central mapping of failures to exit codes and user-facing output.
//!
//! Configuration errors are fatal, template and mutation errors fall back
//! softly, and execution errors are logged with the label of the call site.

use crate::{
    core::{config_store::ValidationIssue, mutation::MutationError},
    system::executor::ExecutionError,
};
use colored::*;

/// The exit code used when no more specific code is available.
pub const DEFAULT_FAILURE_CODE: i32 = 1;

/// Prints a fatal error with its cause chain.
pub fn report_fatal(error: &anyhow::Error) {
    eprintln!("\n{}: {}", "Error".red().bold(), error);
    for cause in error.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".dimmed(), cause);
    }
}

/// Prints the advisory findings of the last configuration parse.
pub fn report_warnings(issues: &[ValidationIssue]) {
    if issues.is_empty() {
        return;
    }
    eprintln!(
        "{} {} configuration issue(s) found; affected entries were skipped:",
        "Warning:".yellow().bold(),
        issues.len()
    );
    for issue in issues {
        eprintln!("  {} {}", "-".yellow(), issue);
    }
}

/// Reports a mutation that could not be applied; the caller keeps `value`.
pub fn report_template_fallback(flag: &str, expression: &str, value: &str, error: &MutationError) {
    log::warn!(
        "Mutation '{}' of flag '{}' failed for value '{}': {}. Using the value unchanged.",
        expression,
        flag,
        value,
        error
    );
}

/// Logs an executor-level failure with its call-site label.
///
/// Returns [`DEFAULT_FAILURE_CODE`]: a child that ran and exited non-zero is
/// not a failure here, its code is passed through by the executor.
pub fn report_execution_failure(label: &str, command: &str, error: &ExecutionError) -> i32 {
    log::error!("{} failed for '{}': {}", label, command, error);
    DEFAULT_FAILURE_CODE
}
