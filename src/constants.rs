// src/constants.rs

/// The name of the alias configuration file at the workspace root.
pub const CONFIG_FILENAME: &str = "pae.aliases.json";

/// Environment variable that overrides the workspace root (defaults to the cwd).
pub const WORKSPACE_ROOT_ENV: &str = "PAE_WORKSPACE_ROOT";

/// Namespace prepended to project names that are not already qualified.
pub const DEFAULT_NAMESPACE: &str = "@pae";

/// The workspace task runner used when the config does not name one.
pub const DEFAULT_TASK_RUNNER: &str = "nx";

/// Binaries that are executed directly instead of through the task runner.
pub const DIRECT_BINARIES: &[&str] = &["npm", "npx", "pnpm", "yarn", "bun", "node", "git"];

/// First-token sigil that routes a command through the system shell.
pub const SHELL_SIGIL: char = '$';

// Engine-control markers recognised by the env-setting pass.
pub const DEBUG_MARKER: &str = "--pae-debug";
pub const VERBOSE_MARKER: &str = "--pae-verbose";
pub const ECHO_MARKER: &str = "--pae-echo";
pub const ECHO_EXTENDED_MARKER: &str = "--pae-echox";

// Variables exported to spawned children so downstream tools see the engine mode.
pub const ENV_DEBUG: &str = "PAE_DEBUG";
pub const ENV_VERBOSE: &str = "PAE_VERBOSE";
pub const ENV_ECHO: &str = "PAE_ECHO";
pub const ENV_ECHO_VARIANT: &str = "PAE_ECHO_VARIANT";
pub const ENV_ECHOX: &str = "PAE_ECHOX";
pub const ENV_ECHOX_VARIANT: &str = "PAE_ECHOX_VARIANT";

/// Variable that receives a template's inbound value when `bind` is not set.
pub const DEFAULT_BIND_VARIABLE: &str = "value";
