// src/models.rs

use crate::constants::{
    DEFAULT_BIND_VARIABLE, ENV_DEBUG, ENV_ECHO, ENV_ECHO_VARIANT, ENV_ECHOX, ENV_ECHOX_VARIANT,
    ENV_VERBOSE,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A flag-key -> definition map, as found in every flag section of the config.
pub type FlagMap = HashMap<String, FlagDefinition>;

/// Named template variables and their string values.
pub type Variables = HashMap<String, String>;

// --- `pae.aliases.json` MODELS ---

/// A configured alias value: either a bare project name or a descriptor.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ProjectAlias {
    Name(String),
    Descriptor(ProjectDescriptor),
}

/// The structured form of a project alias.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProjectDescriptor {
    pub name: String,
    pub suffix: Option<String>,
    #[serde(default)]
    pub full: bool,
}

/// One fragment or an ordered list of fragments emitted by a template.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum TemplateText {
    Single(String),
    Sequence(Vec<String>),
}

impl TemplateText {
    /// The template's fragments, one per output token.
    pub fn fragments(&self) -> &[String] {
        match self {
            Self::Single(s) => std::slice::from_ref(s),
            Self::Sequence(s) => s,
        }
    }
}

/// The output bucket a template's fragments are written to.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Position {
    Start,
    Prefix,
    #[default]
    PreArgs,
    Suffix,
    End,
}

/// A structured, templated flag definition.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TemplateFlag {
    pub template: TemplateText,
    #[serde(default)]
    pub variables: Variables,
    pub mutation: Option<String>,
    #[serde(default)]
    pub position: Position,
    /// Consume the following argument as the inbound value.
    #[serde(default)]
    pub takes_value: bool,
    /// Variable the inbound value is bound to.
    pub bind: Option<String>,
}

impl TemplateFlag {
    /// The variable the inbound value is bound to (`value` unless `bind` is set).
    pub fn bind_variable(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND_VARIABLE)
    }
}

/// A flag's expansion rule. Uses `untagged` so the config can use the
/// shortest form that fits.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum FlagDefinition {
    Literal(String),
    List(Vec<String>),
    Template(TemplateFlag),
}

/// A flag whose definition depends on the resolved project/target.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ContextAwareFlag {
    pub default: Option<FlagDefinition>,
    #[serde(default)]
    pub contexts: HashMap<String, FlagDefinition>,
}

/// The loaded alias configuration document.
///
/// This is the typed view built after validation; entries that failed
/// validation are not present here (they are reported as warnings instead).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasConfig {
    pub project_aliases: HashMap<String, ProjectAlias>,
    pub target_aliases: HashMap<String, String>,
    pub excluded_targets: Vec<String>,
    pub expandable_commands: HashMap<String, String>,
    pub expandable_flags: FlagMap,
    pub internal_flags: FlagMap,
    pub env_setting_flags: FlagMap,
    pub context_aware_flags: HashMap<String, ContextAwareFlag>,
    pub expandable_templates: FlagMap,
    pub command_descriptions: HashMap<String, String>,
    pub template_variables: Variables,
    pub namespace: Option<String>,
    pub task_runner: Option<String>,
    pub timeout_ms: Option<u64>,
}

// --- RESOLUTION & EXPANSION MODELS ---

/// The outcome of resolving an alias value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProject {
    pub project: String,
    pub is_full: bool,
}

/// The bucketed output of one flag-expansion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionResult {
    pub start: Vec<String>,
    pub prefix: Vec<String>,
    pub pre_args: Vec<String>,
    pub suffix: Vec<String>,
    pub end: Vec<String>,
    pub remaining_args: Vec<String>,
}

impl ExpansionResult {
    /// The bucket a fragment with `position` is written to.
    pub fn bucket_mut(&mut self, position: Position) -> &mut Vec<String> {
        match position {
            Position::Start => &mut self.start,
            Position::Prefix => &mut self.prefix,
            Position::PreArgs => &mut self.pre_args,
            Position::Suffix => &mut self.suffix,
            Position::End => &mut self.end,
        }
    }

    /// All expanded tokens (every bucket except `remaining_args`) in position order.
    pub fn expanded_tokens(&self) -> impl Iterator<Item = &String> {
        self.start
            .iter()
            .chain(&self.prefix)
            .chain(&self.pre_args)
            .chain(&self.suffix)
            .chain(&self.end)
    }

    /// Folds a later pass into this one: buckets are concatenated (this pass
    /// first) and the later pass's residue replaces ours.
    pub fn absorb(&mut self, later: Self) {
        self.start.extend(later.start);
        self.prefix.extend(later.prefix);
        self.pre_args.extend(later.pre_args);
        self.suffix.extend(later.suffix);
        self.end.extend(later.end);
        self.remaining_args = later.remaining_args;
    }

    /// The argument list that follows the base command:
    /// `prefix preArgs suffix remainingArgs end`.
    pub fn trailing_args(&self) -> Vec<String> {
        self.prefix
            .iter()
            .chain(&self.pre_args)
            .chain(&self.suffix)
            .chain(&self.remaining_args)
            .chain(&self.end)
            .cloned()
            .collect()
    }
}

// --- RUNTIME MODELS ---

/// Dry-run scope: `None` means every output variant is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoScope {
    pub variant: Option<String>,
}

impl EchoScope {
    /// Whether `variant` is printed; no variant means everything is.
    pub fn shows(&self, variant: &str) -> bool {
        self.variant.as_deref().is_none_or(|v| v == variant)
    }
}

/// Engine-control state for one invocation, set by the env-setting pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub debug: bool,
    pub verbose: bool,
    pub echo: Option<EchoScope>,
    pub echo_extended: Option<EchoScope>,
}

impl RuntimeOptions {
    /// True when the command must be printed instead of executed.
    pub fn is_dry_run(&self) -> bool {
        self.echo.is_some() || self.echo_extended.is_some()
    }

    /// The active dry-run scope; the extended mode wins when both are set.
    pub fn echo_scope(&self) -> Option<&EchoScope> {
        self.echo_extended.as_ref().or(self.echo.as_ref())
    }

    /// Environment exported to spawned children.
    pub fn child_env(&self) -> Vec<(&'static str, String)> {
        let mut env = Vec::new();
        if self.debug {
            env.push((ENV_DEBUG, "1".to_string()));
        }
        if self.verbose {
            env.push((ENV_VERBOSE, "1".to_string()));
        }
        if let Some(scope) = &self.echo {
            env.push((ENV_ECHO, "1".to_string()));
            if let Some(variant) = &scope.variant {
                env.push((ENV_ECHO_VARIANT, variant.clone()));
            }
        }
        if let Some(scope) = &self.echo_extended {
            env.push((ENV_ECHOX, "1".to_string()));
            if let Some(variant) = &scope.variant {
                env.push((ENV_ECHOX_VARIANT, variant.clone()));
            }
        }
        env
    }
}
