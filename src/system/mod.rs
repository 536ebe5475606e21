//! # System Interaction Layer
//!
//! The boundary between the expansion pipeline and the operating system.
//!
//! ## Modules
//!
//! - **`executor`**: spawns the resolved command line, either through the task
//!   runner, directly, or through the system shell. Handles the echo (dry-run)
//!   modes, the timeout with its SIGTERM kill policy, and exit-code mapping.
//! - **`registry`**: tracks live children so a signal handler can terminate
//!   them all before the process exits.

pub mod executor;
pub mod registry;
