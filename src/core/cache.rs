// src/core/cache.rs

use log::debug;
use std::{fs, io, path::Path, time::SystemTime};

/// The validation metadata for a cached config: the file's modification time.
///
/// A cache entry built from a file is trusted only while the file still
/// reports the same stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModificationStamp(SystemTime);

impl ModificationStamp {
    /// The recorded modification time.
    pub fn time(&self) -> SystemTime {
        self.0
    }
}

/// Reads the current modification stamp for `path`.
///
/// # Errors
/// Returns the underlying I/O error if the file is missing or its metadata
/// cannot be read. Callers distinguish `NotFound` themselves.
pub fn observe(path: &Path) -> io::Result<ModificationStamp> {
    let modified = fs::metadata(path)?.modified()?;
    debug!("Observed mtime for '{}': {:?}", path.display(), modified);
    Ok(ModificationStamp(modified))
}

/// True when `path` still carries `stamp`. Any error counts as stale.
pub fn is_fresh(path: &Path, stamp: ModificationStamp) -> bool {
    match observe(path) {
        Ok(current) => current == stamp,
        Err(e) => {
            debug!("Could not re-observe '{}': {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn test_observe_success() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"{}").unwrap();
        temp_file.flush().unwrap();

        let stamp = observe(temp_file.path()).unwrap();
        let difference = SystemTime::now().duration_since(stamp.time()).unwrap();
        assert!(difference.as_secs() < 5);
        assert!(is_fresh(temp_file.path(), stamp));
    }

    #[test]
    fn test_stamp_changes_when_mtime_is_touched() {
        let temp_file = NamedTempFile::new().unwrap();
        let stamp = observe(temp_file.path()).unwrap();

        let later = stamp.time() + Duration::from_secs(10);
        File::options()
            .write(true)
            .open(temp_file.path())
            .unwrap()
            .set_modified(later)
            .unwrap();

        assert!(!is_fresh(temp_file.path(), stamp));
    }

    #[test]
    fn test_observe_file_not_found() {
        let result = observe(Path::new("non_existent_file_for_test.tmp"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert!(!is_fresh(
            Path::new("non_existent_file_for_test.tmp"),
            ModificationStamp(SystemTime::UNIX_EPOCH)
        ));
    }
}
