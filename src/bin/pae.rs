// src/bin/pae.rs

use clap::Parser;
use pae::{
    cli::{Action, Cli, handlers},
    core::reporter,
    system::registry::ProcessRegistry,
};
use std::env;

/// Exit code after SIGINT (Ctrl+C).
const EXIT_SIGINT: i32 = 130;
/// Exit code after SIGTERM.
const EXIT_SIGTERM: i32 = 143;

/// The main entry point of the `pae` application.
/// It sets up logging and the runtime, dispatches to the handler and turns
/// the outcome into the process exit code.
fn main() {
    init_logger();
    let cli = Cli::parse();
    log::debug!("CLI args parsed: {:?}", cli);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let e = anyhow::Error::new(e).context("Failed to start the async runtime");
            reporter::report_fatal(&e);
            std::process::exit(reporter::DEFAULT_FAILURE_CODE);
        }
    };

    let code = runtime.block_on(run_cli(cli));
    std::process::exit(code);
}

/// `RUST_LOG` is honoured as is; otherwise everything up to warnings is shown
/// until the verbose/debug markers raise the level.
fn init_logger() {
    let explicit = env::var_os("RUST_LOG").is_some();
    let mut builder = env_logger::Builder::from_default_env();
    if !explicit {
        builder.filter_level(log::LevelFilter::Trace);
    }
    builder.format_timestamp(None).init();
    if !explicit {
        log::set_max_level(log::LevelFilter::Warn);
    }
}

async fn run_cli(cli: Cli) -> i32 {
    let registry = ProcessRegistry::new();
    spawn_signal_listener(registry.clone());

    let outcome = match cli.action() {
        Action::List(args) => handlers::list::handle(args),
        Action::Run(args) => handlers::run::handle(args, &registry).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            // --- Centralized Error Handling ---
            reporter::report_fatal(&e);
            reporter::DEFAULT_FAILURE_CODE
        }
    }
}

/// Terminates every tracked child on SIGINT/SIGTERM, then exits.
fn spawn_signal_listener(registry: ProcessRegistry) {
    tokio::spawn(async move {
        #[cfg(unix)]
        let code = {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    log::warn!("Could not install the SIGTERM handler: {}", e);
                    return;
                }
            };
            tokio::select! {
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => EXIT_SIGINT,
                    Err(_) => return,
                },
                _ = sigterm.recv() => EXIT_SIGTERM,
            }
        };
        #[cfg(not(unix))]
        let code = match tokio::signal::ctrl_c().await {
            Ok(()) => EXIT_SIGINT,
            Err(_) => return,
        };

        let killed = registry.kill_all();
        log::debug!("Shutdown signal received; {} child process(es) terminated.", killed);
        std::process::exit(code);
    });
}
