// src/system/registry.rs

//! Shutdown tracking for spawned children.
//!
//! The executor registers every child right after spawning it and holds the
//! returned [`TrackedProcess`] guard until the child exits; dropping the guard
//! deregisters it. The binary's signal listener calls
//! [`ProcessRegistry::kill_all`] to terminate whatever is still alive.

use std::{
    collections::HashSet,
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// A cloneable handle to the set of live child pids.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    live: Arc<Mutex<HashSet<u32>>>,
}

impl ProcessRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self) -> MutexGuard<'_, HashSet<u32>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `pid`; the registration lasts as long as the returned guard.
    pub fn register(&self, pid: u32) -> TrackedProcess {
        self.live().insert(pid);
        log::debug!("Tracking child process {}.", pid);
        TrackedProcess {
            pid,
            registry: self.clone(),
        }
    }

    fn deregister(&self, pid: u32) {
        if self.live().remove(&pid) {
            log::debug!("Child process {} deregistered.", pid);
        }
    }

    /// Whether `pid` is currently registered.
    pub fn is_tracked(&self, pid: u32) -> bool {
        self.live().contains(&pid)
    }

    /// How many children are registered.
    pub fn len(&self) -> usize {
        self.live().len()
    }

    /// Whether no child is registered.
    pub fn is_empty(&self) -> bool {
        self.live().is_empty()
    }

    /// Sends SIGTERM to every tracked child and forgets it.
    ///
    /// Returns how many children were signalled. The set is drained first, so
    /// a second call (e.g. a repeated Ctrl+C) signals nothing.
    pub fn kill_all(&self) -> usize {
        let pids: Vec<u32> = self.live().drain().collect();
        let mut signalled = 0;
        for pid in pids {
            match terminate(pid) {
                Ok(()) => signalled += 1,
                Err(e) => log::debug!("Could not signal child process {}: {}", pid, e),
            }
        }
        if signalled > 0 {
            log::info!("Sent SIGTERM to {} child process(es).", signalled);
        }
        signalled
    }
}

/// Registration of one live child; deregisters on drop.
#[derive(Debug)]
pub struct TrackedProcess {
    pid: u32,
    registry: ProcessRegistry,
}

impl TrackedProcess {
    /// The tracked child's pid.
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for TrackedProcess {
    fn drop(&mut self) {
        self.registry.deregister(self.pid);
    }
}

/// Sends SIGTERM to `pid`.
#[cfg(unix)]
pub fn terminate(pid: u32) -> io::Result<()> {
    use nix::{
        sys::signal::{self, Signal},
        unistd::Pid,
    };

    let raw = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    signal::kill(Pid::from_raw(raw), Signal::SIGTERM).map_err(io::Error::from)
}

/// Signals are unix-only; elsewhere the caller falls back to `start_kill`.
#[cfg(not(unix))]
pub fn terminate(pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("SIGTERM is not available for process {}", pid),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_drop_deregisters() {
        let registry = ProcessRegistry::new();
        let guard = registry.register(4_000_000);
        assert!(registry.is_tracked(4_000_000));
        assert_eq!(guard.pid(), 4_000_000);
        drop(guard);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_kill_all_on_empty_registry() {
        let registry = ProcessRegistry::new();
        assert_eq!(registry.kill_all(), 0);
        assert_eq!(registry.kill_all(), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let registry = ProcessRegistry::new();
        let clone = registry.clone();
        let _guard = registry.register(4_000_001);
        assert_eq!(clone.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_kill_all_is_idempotent() {
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let registry = ProcessRegistry::new();
        let guard = registry.register(child.id());

        assert_eq!(registry.kill_all(), 1);
        assert!(registry.is_empty());
        assert_eq!(registry.kill_all(), 0);

        let status = child.wait().unwrap();
        assert!(!status.success());
        // Dropping the guard after kill_all is harmless.
        drop(guard);
        assert!(registry.is_empty());
    }
}
