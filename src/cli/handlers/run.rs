use crate::{
    cli::handlers::commons,
    core::{command_assembler, env_interceptor},
    dev_utils::BlockTimer,
    system::{
        executor::{ProcessExecutor, RunOptions, StdioMode},
        registry::ProcessRegistry,
    },
};
use anyhow::{Context, Result};
use std::time::Duration;

///
/// Main entry point for `pae <alias|command> [target] [args...]`.
/// Loads the config, runs the expansion passes and executes the result,
/// returning the exit code of the spawned process.
///
pub async fn handle(args: Vec<String>, registry: &ProcessRegistry) -> Result<i32> {
    // 1. Load the workspace configuration.
    let root = commons::workspace_root()?;
    let (_store, config) = {
        let _timer = BlockTimer::new("config load");
        commons::load_config(&root)?
    };

    // 2. Env-setting pass first, so the log level is right for the rest.
    let interception =
        env_interceptor::intercept(&args, &config.env_setting_flags, &config.template_variables)
            .context("Env-setting flag expansion failed")?;
    commons::apply_log_level(&interception.options);
    log::debug!("Runtime options: {:?}", interception.options);

    // 3. Internal and expandable passes, then command assembly.
    let plan = {
        let _timer = BlockTimer::new("expansion");
        command_assembler::assemble(&config, interception)?
    };
    log::info!("Resolved command: {} {:?}", plan.command, plan.args);

    // 4. Execute.
    let task_runner = commons::resolve_task_runner(&config, &root)?;
    let executor = ProcessExecutor::new(registry.clone(), plan.options.clone(), task_runner);
    let run_options = RunOptions {
        timeout: config.timeout_ms.map(Duration::from_millis),
        stdio: StdioMode::Inherit,
        cwd: Some(root),
    };
    Ok(executor.run(&plan.command, &plan.args, &run_options).await)
}
