// src/system/executor.rs

use crate::{
    constants::{DIRECT_BINARIES, SHELL_SIGIL},
    core::{commons, reporter},
    models::{EchoScope, RuntimeOptions},
    system::registry::{self, ProcessRegistry},
};
use colored::*;
use std::{
    path::PathBuf,
    process::{ExitStatus, Stdio},
    time::Duration,
};
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command could not be parsed: {0}")]
    CommandParse(String),
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{command}' could not be started: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Waiting for '{command}' failed: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// How a command line is launched, decided by its first token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationKind {
    /// First token starts with `$`: run through the system shell.
    Shell,
    /// An allow-listed binary or the task runner itself.
    Direct,
    /// Anything else, prefixed with the task runner.
    TaskRunner,
}

impl InvocationKind {
    /// The call-site label used when reporting failures.
    pub fn label(self) -> &'static str {
        match self {
            Self::Shell | Self::Direct => "process execution",
            Self::TaskRunner => "task-runner execution",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Shell => "shell",
            Self::Direct => "direct",
            Self::TaskRunner => "task-runner",
        }
    }
}

/// A classified, ready-to-spawn program and argv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub kind: InvocationKind,
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// The program and its arguments as one shell-quoted line.
    pub fn command_line(&self) -> String {
        commons::format_command_line(&self.program, &self.args)
    }
}

/// Where a child's standard streams go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StdioMode {
    /// The child shares the terminal.
    #[default]
    Inherit,
    /// The child's stdin/stdout/stderr are discarded.
    Null,
}

impl StdioMode {
    fn stdio(self) -> Stdio {
        match self {
            Self::Inherit => Stdio::inherit(),
            Self::Null => Stdio::null(),
        }
    }
}

/// Per-run settings that are not part of the command itself.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub timeout: Option<Duration>,
    pub stdio: StdioMode,
    pub cwd: Option<PathBuf>,
}

/// Spawns resolved command lines, one at a time.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    registry: ProcessRegistry,
    options: RuntimeOptions,
    task_runner: String,
}

impl ProcessExecutor {
    /// Creates an executor that registers its children in `registry`.
    pub fn new(
        registry: ProcessRegistry,
        options: RuntimeOptions,
        task_runner: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            options,
            task_runner: task_runner.into(),
        }
    }

    /// The registry live children are tracked in.
    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Splits `command` and decides how it is launched.
    ///
    /// # Errors
    /// [`ExecutionError::CommandParse`] for unbalanced quoting and
    /// [`ExecutionError::EmptyCommand`] for a blank command.
    pub fn classify(
        &self,
        command: &str,
        args: &[String],
    ) -> Result<Invocation, ExecutionError> {
        let trimmed = command.trim();
        let tokens =
            shlex::split(trimmed).ok_or_else(|| ExecutionError::CommandParse(trimmed.to_string()))?;
        let (first, rest) = tokens.split_first().ok_or(ExecutionError::EmptyCommand)?;

        if first.starts_with(SHELL_SIGIL) {
            let mut script = trimmed.to_string();
            for arg in args {
                script.push(' ');
                script.push_str(&commons::quote(arg));
            }
            let (program, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
            return Ok(Invocation {
                kind: InvocationKind::Shell,
                program: program.to_string(),
                args: vec![flag.to_string(), script],
            });
        }

        let is_direct = DIRECT_BINARIES.contains(&first.as_str()) || *first == self.task_runner;
        if is_direct {
            return Ok(Invocation {
                kind: InvocationKind::Direct,
                program: first.clone(),
                args: rest.iter().chain(args).cloned().collect(),
            });
        }

        Ok(Invocation {
            kind: InvocationKind::TaskRunner,
            program: self.task_runner.clone(),
            args: tokens.iter().chain(args).cloned().collect(),
        })
    }

    /// Runs `command` with `args` and returns the exit code.
    ///
    /// In echo mode the command is printed and `0` returned without spawning,
    /// even when it cannot be classified. Failures are reported here and never
    /// propagate past the executor.
    pub async fn run(&self, command: &str, args: &[String], run_options: &RunOptions) -> i32 {
        let classified = self.classify(command, args);

        if let Some(scope) = self.options.echo_scope() {
            match classified {
                Ok(invocation) => {
                    for line in self.echo_lines(&invocation, scope, run_options) {
                        println!("{}", line);
                    }
                }
                Err(e) => {
                    log::debug!("Echoing '{}' unclassified: {}", command, e);
                    println!("{}", raw_command_line(command, args));
                }
            }
            return 0;
        }

        let invocation = match classified {
            Ok(invocation) => invocation,
            Err(e) => return reporter::report_execution_failure("process execution", command, &e),
        };

        if self.options.verbose {
            eprintln!("{} {}", "→".cyan(), invocation.command_line().bold());
        }

        match self.spawn_and_wait(&invocation, run_options).await {
            Ok(code) => code,
            Err(e) => reporter::report_execution_failure(
                invocation.kind.label(),
                &invocation.command_line(),
                &e,
            ),
        }
    }

    /// The lines printed for a dry run, filtered by the echo scope.
    pub fn echo_lines(
        &self,
        invocation: &Invocation,
        scope: &EchoScope,
        run_options: &RunOptions,
    ) -> Vec<String> {
        let mut lines = Vec::new();
        if self.options.echo_extended.is_some() {
            lines.push(format!("kind: {}", invocation.kind.name()));
            let cwd = run_options
                .cwd
                .as_ref()
                .map_or_else(|| ".".to_string(), |p| dunce::simplified(p).display().to_string());
            lines.push(format!("cwd: {}", cwd));
            let timeout = run_options
                .timeout
                .map_or_else(|| "none".to_string(), |t| format!("{}ms", t.as_millis()));
            lines.push(format!("timeout: {}", timeout));
        }
        if scope.shows("cmd") {
            lines.push(invocation.command_line());
        }
        if scope.shows("argv") {
            let argv: Vec<&str> = std::iter::once(invocation.program.as_str())
                .chain(invocation.args.iter().map(String::as_str))
                .collect();
            match serde_json::to_string(&argv) {
                Ok(json) => lines.push(json),
                Err(e) => log::warn!("Could not render argv as JSON: {}", e),
            }
        }
        if scope.shows("env") {
            lines.extend(
                self.options
                    .child_env()
                    .into_iter()
                    .map(|(key, value)| format!("{}={}", key, value)),
            );
        }
        lines
    }

    async fn spawn_and_wait(
        &self,
        invocation: &Invocation,
        run_options: &RunOptions,
    ) -> Result<i32, ExecutionError> {
        let display = invocation.command_line();
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(self.options.child_env())
            .stdin(run_options.stdio.stdio())
            .stdout(run_options.stdio.stdio())
            .stderr(run_options.stdio.stdio())
            .kill_on_drop(true);
        if let Some(cwd) = &run_options.cwd {
            command.current_dir(dunce::simplified(cwd));
        }

        let mut child = command.spawn().map_err(|source| ExecutionError::Spawn {
            command: display.clone(),
            source,
        })?;
        let _tracked = child.id().map(|pid| self.registry.register(pid));

        let waited = match run_options.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(result) => result,
                Err(_) => {
                    log::warn!(
                        "'{}' exceeded its {}ms timeout; sending SIGTERM.",
                        display,
                        limit.as_millis()
                    );
                    send_term(&mut child);
                    child.wait().await
                }
            },
            None => child.wait().await,
        };

        let status = waited.map_err(|source| ExecutionError::Wait {
            command: display.clone(),
            source,
        })?;
        let code = exit_code_of(status);
        log::debug!("'{}' finished with exit code {}.", display, code);
        Ok(code)
    }
}

/// The untouched command text plus quoted args, for echoing what could not be split.
fn raw_command_line(command: &str, args: &[String]) -> String {
    let mut line = command.trim().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&commons::quote(arg));
    }
    line
}

fn send_term(child: &mut tokio::process::Child) {
    let result = match child.id() {
        Some(pid) if cfg!(unix) => registry::terminate(pid),
        _ => child.start_kill(),
    };
    if let Err(e) = result {
        log::warn!("Failed to terminate child process: {}", e);
    }
}

/// The exit code of a finished child; signal deaths map to `128 + signal`.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    reporter::DEFAULT_FAILURE_CODE
}
