//! # Config Store
//!
//! Loads `pae.aliases.json` from the workspace root, validates it and keeps
//! the parsed result cached for as long as the file's modification time does
//! not change.
//!
//! Validation is advisory: structurally invalid entries are skipped and
//! reported through [`ConfigStore::validation_errors`], while a missing file,
//! unparsable JSON or a missing `projectAliases` section are fatal.

use crate::{
    constants::CONFIG_FILENAME,
    core::cache::{self, ModificationStamp},
    models::{AliasConfig, ContextAwareFlag, FlagDefinition, ProjectAlias},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

const PROJECT_ALIASES: &str = "projectAliases";

/// Every top-level key the document may carry.
const KNOWN_SECTIONS: &[&str] = &[
    PROJECT_ALIASES,
    "targetAliases",
    "excludedTargets",
    "expandableCommands",
    "expandableFlags",
    "internalFlags",
    "envSettingFlags",
    "contextAwareFlags",
    "expandableTemplates",
    "commandDescriptions",
    "templateVariables",
    "namespace",
    "taskRunner",
    "timeoutMs",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Alias configuration not found at '{}'.", path.display())]
    NotFound { path: PathBuf },
    #[error("Could not read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("'{}' has no top-level '{section}' section.", path.display())]
    MissingSection { path: PathBuf, section: &'static str },
}

/// A non-fatal finding from config validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub section: String,
    pub key: Option<String>,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}.{}: {}", self.section, key, self.message),
            None => write!(f, "{}: {}", self.section, self.message),
        }
    }
}

/// A parsed config together with where it came from and the stamp it was read at.
#[derive(Debug, Clone)]
pub struct CachedConfig {
    pub config: Arc<AliasConfig>,
    pub path: PathBuf,
    pub stamp: ModificationStamp,
}

/// Owns the cached alias configuration for one CLI invocation.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    cache: Option<CachedConfig>,
    validation_errors: Vec<ValidationIssue>,
}

impl ConfigStore {
    /// Creates a store for an explicit config file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: None,
            validation_errors: Vec::new(),
        }
    }

    /// Creates a store for the canonical config file of a workspace.
    pub fn for_workspace(root: &Path) -> Self {
        Self::new(root.join(CONFIG_FILENAME))
    }

    /// The config file this store reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current config, reusing the cached one when the file's
    /// modification time is unchanged.
    ///
    /// # Errors
    /// Fails if the file is missing, unreadable, not JSON, or lacks a
    /// `projectAliases` section. On failure the cache is dropped.
    pub fn load(&mut self) -> Result<Arc<AliasConfig>, ConfigError> {
        if let Some(cached) = &self.cache {
            if cache::is_fresh(&cached.path, cached.stamp) {
                log::trace!("Config cache HIT for '{}'.", cached.path.display());
                return Ok(Arc::clone(&cached.config));
            }
            log::debug!(
                "Config '{}' changed on disk. Reloading.",
                cached.path.display()
            );
        }
        self.reload()
    }

    /// Reads, parses and validates the file unconditionally, replacing the cache.
    ///
    /// # Errors
    /// Same as [`ConfigStore::load`].
    pub fn reload(&mut self) -> Result<Arc<AliasConfig>, ConfigError> {
        self.cache = None;

        let stamp = cache::observe(&self.path).map_err(|e| self.io_error(e))?;
        let raw = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let (config, issues) = parse_document(&raw, &self.path)?;

        for issue in &issues {
            log::debug!("Config validation: {}", issue);
        }
        self.validation_errors = issues;

        let config = Arc::new(config);
        self.cache = Some(CachedConfig {
            config: Arc::clone(&config),
            path: self.path.clone(),
            stamp,
        });
        Ok(config)
    }

    /// Discards the cached config and the memoized validation findings.
    pub fn clear(&mut self) {
        self.cache = None;
        self.validation_errors.clear();
    }

    /// The non-fatal findings of the most recent parse.
    pub fn validation_errors(&self) -> &[ValidationIssue] {
        &self.validation_errors
    }

    fn io_error(&self, source: io::Error) -> ConfigError {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: self.path.clone(),
            }
        } else {
            ConfigError::Io {
                path: self.path.clone(),
                source,
            }
        }
    }
}

/// Parses a config document (comments allowed) into an [`AliasConfig`] plus
/// the validation issues found along the way.
///
/// # Errors
/// Fails on invalid JSON or a missing `projectAliases` section.
pub fn parse_document(
    raw: &str,
    path: &Path,
) -> Result<(AliasConfig, Vec<ValidationIssue>), ConfigError> {
    let document = parse_value(raw).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })?;

    let empty = Map::new();
    let root = document.as_object().unwrap_or(&empty);
    if !root.contains_key(PROJECT_ALIASES) {
        return Err(ConfigError::MissingSection {
            path: path.to_path_buf(),
            section: PROJECT_ALIASES,
        });
    }

    let mut issues = Vec::new();
    for key in root.keys() {
        if !KNOWN_SECTIONS.contains(&key.as_str()) {
            issues.push(ValidationIssue {
                section: key.clone(),
                key: None,
                message: "unknown section, ignored".to_string(),
            });
        }
    }

    let config = AliasConfig {
        project_aliases: object_section::<ProjectAlias>(root, PROJECT_ALIASES, &mut issues),
        target_aliases: object_section(root, "targetAliases", &mut issues),
        excluded_targets: scalar_section(root, "excludedTargets", &mut issues).unwrap_or_default(),
        expandable_commands: object_section(root, "expandableCommands", &mut issues),
        expandable_flags: object_section::<FlagDefinition>(root, "expandableFlags", &mut issues),
        internal_flags: object_section(root, "internalFlags", &mut issues),
        env_setting_flags: object_section(root, "envSettingFlags", &mut issues),
        context_aware_flags: object_section::<ContextAwareFlag>(
            root,
            "contextAwareFlags",
            &mut issues,
        ),
        expandable_templates: object_section(root, "expandableTemplates", &mut issues),
        command_descriptions: object_section(root, "commandDescriptions", &mut issues),
        template_variables: object_section(root, "templateVariables", &mut issues),
        namespace: scalar_section(root, "namespace", &mut issues),
        task_runner: scalar_section(root, "taskRunner", &mut issues),
        timeout_ms: scalar_section(root, "timeoutMs", &mut issues),
    };

    Ok((config, issues))
}

/// Plain JSON first; documents with comments go through the JSON5 parser.
fn parse_value(raw: &str) -> Result<Value, String> {
    if let Ok(value) = serde_json::from_str(raw) {
        return Ok(value);
    }
    json_five::from_str::<Value>(raw).map_err(|e| e.to_string())
}

/// Deserializes an object-valued section entry by entry. Entries that do not
/// fit `T` are reported and skipped.
fn object_section<T: DeserializeOwned>(
    root: &Map<String, Value>,
    section: &str,
    issues: &mut Vec<ValidationIssue>,
) -> HashMap<String, T> {
    let Some(value) = root.get(section) else {
        return HashMap::new();
    };
    let Some(entries) = value.as_object() else {
        issues.push(ValidationIssue {
            section: section.to_string(),
            key: None,
            message: format!("expected an object, found {}", kind_of(value)),
        });
        return HashMap::new();
    };

    let mut parsed = HashMap::with_capacity(entries.len());
    for (key, entry) in entries {
        match T::deserialize(entry) {
            Ok(item) => {
                parsed.insert(key.clone(), item);
            }
            Err(e) => issues.push(ValidationIssue {
                section: section.to_string(),
                key: Some(key.clone()),
                message: entry_message(section, entry, &e),
            }),
        }
    }
    parsed
}

/// Deserializes a section that is a single value (array, string or number).
fn scalar_section<T: DeserializeOwned>(
    root: &Map<String, Value>,
    section: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<T> {
    let value = root.get(section)?;
    match T::deserialize(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            issues.push(ValidationIssue {
                section: section.to_string(),
                key: None,
                message: format!("invalid value ({}): {}", kind_of(value), e),
            });
            None
        }
    }
}

fn entry_message(section: &str, entry: &Value, error: &serde_json::Error) -> String {
    if section == PROJECT_ALIASES {
        return match entry {
            Value::Object(map) if !map.contains_key("name") => {
                "alias descriptor is missing a `name`".to_string()
            }
            Value::Object(_) => format!("invalid alias descriptor: {}", error),
            other => format!(
                "expected a project name or descriptor, found {}",
                kind_of(other)
            ),
        };
    }
    format!("invalid entry ({}): {}", kind_of(entry), error)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectDescriptor;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, content).unwrap();
        path
    }

    fn bump_mtime(path: &Path) {
        let current = fs::metadata(path).unwrap().modified().unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(current + Duration::from_secs(5))
            .unwrap();
    }

    #[test]
    fn test_load_returns_same_arc_while_file_unchanged() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{ "projectAliases": { "demo": "demo-pkg" } }"#);
        let mut store = ConfigStore::for_workspace(dir.path());

        let first = store.load().unwrap();
        let second = store.load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            first.project_aliases.get("demo"),
            Some(&ProjectAlias::Name("demo-pkg".to_string()))
        );
    }

    #[test]
    fn test_touching_mtime_forces_new_object() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{ "projectAliases": { "demo": "demo-pkg" } }"#);
        let mut store = ConfigStore::new(&path);

        let first = store.load().unwrap();
        bump_mtime(&path);
        let second = store.load().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn test_reload_always_rereads() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{ "projectAliases": {} }"#);
        let mut store = ConfigStore::for_workspace(dir.path());

        let first = store.load().unwrap();
        let second = store.reload().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_missing_file_is_fatal_and_names_path() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::for_workspace(dir.path());
        let err = store.load().unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert!(err.to_string().contains(CONFIG_FILENAME));
    }

    #[test]
    fn test_deleted_file_is_fatal_and_drops_cache() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{ "projectAliases": { "demo": "demo-pkg" } }"#);
        let mut store = ConfigStore::new(&path);
        let first = store.load().unwrap();

        fs::remove_file(&path).unwrap();
        assert!(matches!(store.load().unwrap_err(), ConfigError::NotFound { .. }));

        write_config(&dir, r#"{ "projectAliases": { "demo": "demo-pkg" } }"#);
        let second = store.load().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn test_comments_are_allowed_outside_strings() {
        let (config, issues) = parse_document(
            r#"{
                // line comment
                "projectAliases": { "demo": "demo-pkg" }, /* block
                comment */
                "expandableFlags": { "--url": "--url=http://example.com/*x*/" }
            }"#,
            Path::new("inline.json"),
        )
        .unwrap();
        assert!(issues.is_empty(), "issues: {:?}", issues);
        assert_eq!(
            config.project_aliases.get("demo"),
            Some(&ProjectAlias::Name("demo-pkg".to_string()))
        );
        assert_eq!(
            config.expandable_flags.get("--url"),
            Some(&FlagDefinition::Literal("--url=http://example.com/*x*/".to_string()))
        );
    }

    #[test]
    fn test_parse_failure_wraps_path() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{ "projectAliases": { "#);
        let mut store = ConfigStore::for_workspace(dir.path());
        let err = store.load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILENAME));
    }

    #[test]
    fn test_missing_project_aliases_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{ "targetAliases": { "b": "build" } }"#);
        let mut store = ConfigStore::for_workspace(dir.path());
        assert!(matches!(
            store.load().unwrap_err(),
            ConfigError::MissingSection { section: "projectAliases", .. }
        ));
    }

    #[test]
    fn test_structural_problems_are_warnings() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"{
                // comments are allowed
                "projectAliases": {
                    "ok": "demo-pkg",
                    "democ": { "name": "demo-pkg", "suffix": "core" },
                    "broken": { "suffix": "core" },
                    "weird": 42
                },
                "targetAliases": ["not", "an", "object"],
                "expandableFlags": { "-f": "--fix", "-x": { "templat": "--x" } },
                "mystery": true
            }"#,
        );
        let mut store = ConfigStore::for_workspace(dir.path());
        let config = store.load().unwrap();

        assert_eq!(config.project_aliases.len(), 2);
        assert_eq!(
            config.project_aliases.get("democ"),
            Some(&ProjectAlias::Descriptor(ProjectDescriptor {
                name: "demo-pkg".to_string(),
                suffix: Some("core".to_string()),
                full: false,
            }))
        );
        assert!(config.target_aliases.is_empty());
        assert_eq!(config.expandable_flags.len(), 1);

        let issues = store.validation_errors();
        assert_eq!(issues.len(), 5, "issues: {:?}", issues);
        assert!(issues.iter().any(|i| i.key.as_deref() == Some("broken")
            && i.message.contains("missing a `name`")));
        assert!(issues.iter().any(|i| i.key.as_deref() == Some("weird")));
        assert!(issues
            .iter()
            .any(|i| i.section == "targetAliases" && i.message.contains("expected an object")));
        assert!(issues.iter().any(|i| i.key.as_deref() == Some("-x")));
        assert!(issues.iter().any(|i| i.section == "mystery"));
    }

    #[test]
    fn test_clear_discards_cache_and_issues() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{ "projectAliases": { "bad": 1 } }"#);
        let mut store = ConfigStore::for_workspace(dir.path());

        let first = store.load().unwrap();
        assert_eq!(store.validation_errors().len(), 1);

        store.clear();
        assert!(store.validation_errors().is_empty());
        let second = store.load().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(store.validation_errors().len(), 1);
    }

    #[test]
    fn test_supplementary_scalars() {
        let (config, issues) = parse_document(
            r#"{
                "projectAliases": {},
                "excludedTargets": ["e2e"],
                "namespace": "@acme",
                "taskRunner": "node_modules/.bin/nx",
                "timeoutMs": "soon"
            }"#,
            Path::new("inline.json"),
        )
        .unwrap();
        assert_eq!(config.excluded_targets, vec!["e2e"]);
        assert_eq!(config.namespace.as_deref(), Some("@acme"));
        assert_eq!(config.task_runner.as_deref(), Some("node_modules/.bin/nx"));
        assert_eq!(config.timeout_ms, None);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].section, "timeoutMs");
    }
}
