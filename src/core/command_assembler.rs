// src/core/command_assembler.rs

//! # Command Assembly
//!
//! Turns `pae <alias|command> [target] [args...]` into a [`CommandPlan`]:
//!
//! 1. the env-setting pass (see [`env_interceptor`]) extracts [`RuntimeOptions`];
//! 2. the internal pass expands `internalFlags` merged with `expandableTemplates`;
//! 3. the expandable pass expands `expandableFlags`, `expandableTemplates` and the
//!    context-aware flags resolved for the current project/target.
//!
//! Each pass consumes the residue of the previous one, so env-setting flags take
//! precedence over internal flags, which take precedence over expandable ones.

use crate::{
    constants::DEFAULT_NAMESPACE,
    core::{
        alias_resolver,
        commons,
        context_flags::{self, FlagContext},
        env_interceptor::{self, Interception},
        flag_expansion::{self, ExpansionError},
        interpolator,
    },
    models::{AliasConfig, ExpansionResult, FlagMap, RuntimeOptions},
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("No alias or command given.")]
    MissingAlias,
    #[error("No target given for '{alias}'.")]
    MissingTarget { alias: String },
    #[error("Target '{target}' is excluded by the configuration.")]
    ExcludedTarget { target: String },
    #[error("Expandable command '{name}' is empty after substitution.")]
    EmptyCommand { name: String },
    #[error(transparent)]
    Expansion(#[from] ExpansionError),
}

/// What the user asked for, after alias and target resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanKind {
    /// A named shortcut from `expandableCommands`.
    ExpandableCommand { name: String },
    /// A target run against a resolved project.
    ProjectTarget { project: String, target: String },
}

/// A fully resolved invocation, ready for the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    pub kind: PlanKind,
    /// The base command line; its first token decides how it is executed.
    pub command: String,
    pub args: Vec<String>,
    pub options: RuntimeOptions,
}

/// Runs every pass over `args` and assembles the final command.
///
/// # Errors
/// See [`PlanError`].
pub fn plan(config: &AliasConfig, args: &[String]) -> Result<CommandPlan, PlanError> {
    let interception =
        env_interceptor::intercept(args, &config.env_setting_flags, &config.template_variables)?;
    assemble(config, interception)
}

/// Assembles a plan from an already intercepted argument list.
///
/// # Errors
/// See [`PlanError`].
pub fn assemble(
    config: &AliasConfig,
    interception: Interception,
) -> Result<CommandPlan, PlanError> {
    let Interception {
        options,
        remaining,
        unrecognized,
    } = interception;
    if !unrecognized.is_empty() {
        log::warn!(
            "Env-setting flags expanded to unknown control token(s) {:?}; ignoring them.",
            unrecognized
        );
    }

    let (head, rest) = remaining.split_first().ok_or(PlanError::MissingAlias)?;

    if let Some(template) = config.expandable_commands.get(head) {
        let context = FlagContext {
            project: "",
            target: head,
        };
        let expansion = expand_passes(config, rest, context)?;
        let command = command_line_for_template(head, template, config, &expansion)?;
        return Ok(CommandPlan {
            kind: PlanKind::ExpandableCommand { name: head.clone() },
            command,
            args: expansion.trailing_args(),
            options,
        });
    }

    let (target, rest) = rest.split_first().ok_or_else(|| PlanError::MissingTarget {
        alias: head.clone(),
    })?;
    let target = alias_resolver::resolve_target(target, config).to_string();
    if config.excluded_targets.contains(&target) {
        return Err(PlanError::ExcludedTarget { target });
    }

    let namespace = config.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
    let resolved = alias_resolver::resolve_alias(head, config, namespace);
    log::debug!(
        "Resolved '{}' -> project '{}' (full: {}), target '{}'.",
        head,
        resolved.project,
        resolved.is_full,
        target
    );

    let context = FlagContext {
        project: &resolved.project,
        target: &target,
    };
    let expansion = expand_passes(config, rest, context)?;

    let verb = if resolved.is_full {
        vec!["run".to_string(), format!("{}:{}", resolved.project, target)]
    } else {
        vec![target.clone(), resolved.project.clone()]
    };
    let command = quoted_command(&expansion.start, verb);

    Ok(CommandPlan {
        kind: PlanKind::ProjectTarget {
            project: resolved.project,
            target,
        },
        command,
        args: expansion.trailing_args(),
        options,
    })
}

/// The internal and expandable passes, folded into one result.
fn expand_passes(
    config: &AliasConfig,
    args: &[String],
    context: FlagContext<'_>,
) -> Result<ExpansionResult, ExpansionError> {
    let defaults = &config.template_variables;

    let internal_map =
        flag_expansion::merge_flag_maps(&[&config.internal_flags, &config.expandable_templates]);
    let mut result = flag_expansion::expand(args, &internal_map, defaults)?;

    let context_map: FlagMap =
        context_flags::resolve_context_flags(&config.context_aware_flags, context);
    let expandable_map = flag_expansion::merge_flag_maps(&[
        &context_map,
        &config.expandable_flags,
        &config.expandable_templates,
    ]);
    let later = flag_expansion::expand(&result.remaining_args, &expandable_map, defaults)?;
    result.absorb(later);

    log::trace!("Expansion result: {:?}", result);
    Ok(result)
}

/// Builds `program start rest-of-template` for an expandable command.
fn command_line_for_template(
    name: &str,
    template: &str,
    config: &AliasConfig,
    expansion: &ExpansionResult,
) -> Result<String, PlanError> {
    let substituted = interpolator::substitute(template, &config.template_variables);
    let trimmed = substituted.trim();
    if trimmed.is_empty() {
        return Err(PlanError::EmptyCommand {
            name: name.to_string(),
        });
    }
    let (program, tail) = trimmed
        .split_once(char::is_whitespace)
        .unwrap_or((trimmed, ""));

    let mut command = program.to_string();
    for token in &expansion.start {
        command.push(' ');
        command.push_str(&commons::quote(token));
    }
    let tail = tail.trim_start();
    if !tail.is_empty() {
        command.push(' ');
        command.push_str(tail);
    }
    Ok(command)
}

/// `start` tokens followed by the verb, each token shell-quoted so the
/// executor splits it back into the same argv.
fn quoted_command(start: &[String], verb: Vec<String>) -> String {
    let tokens: Vec<String> = start.iter().cloned().chain(verb).collect();
    match tokens.split_first() {
        Some((program, args)) => commons::format_command_line(program, args),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config_store;
    use std::path::Path;

    fn to_args(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn words(command: &str) -> Vec<String> {
        shlex::split(command).unwrap()
    }

    fn config(json: &str) -> AliasConfig {
        let (config, issues) =
            config_store::parse_document(json, Path::new("pae.aliases.json")).unwrap();
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
        config
    }

    const DOC: &str = r#"{
        // aliases
        "projectAliases": {
            "demo": "demo-pkg",
            "democ": { "name": "demo-pkg", "suffix": "core" },
            "app": { "name": "app", "full": true }
        },
        "targetAliases": { "b": "build", "t": "test" },
        "excludedTargets": ["deploy"],
        "expandableCommands": {
            "lint-all": "npm run lint --",
            "hello": "$PAE_SHELL echo {greeting}"
        },
        "internalFlags": { "-f": "--fix", "--skip": "--skip-nx-cache" },
        "expandableFlags": { "-f": "--not-used", "-w": "--watch", "-c": "--configuration" },
        "envSettingFlags": { "-d": "--pae-debug" },
        "contextAwareFlags": {
            "-p": {
                "default": "--prod=false",
                "contexts": { "@pae/demo-pkg-core:build": "--prod=true" }
            }
        },
        "expandableTemplates": {
            "--port": { "template": "--port={value}", "takesValue": true, "position": "suffix" },
            "--first": { "template": "--first", "position": "start" }
        },
        "templateVariables": { "greeting": "hi" }
    }"#;

    #[test]
    fn test_project_target_plan() {
        let cfg = config(DOC);
        let args = to_args(&["democ", "b", "-p", "src", "-w", "--port", "4200"]);
        let plan = plan(&cfg, &args).unwrap();
        assert_eq!(
            plan.kind,
            PlanKind::ProjectTarget {
                project: "@pae/demo-pkg-core".to_string(),
                target: "build".to_string()
            }
        );
        assert_eq!(words(&plan.command), vec!["build", "@pae/demo-pkg-core"]);
        assert_eq!(plan.args, vec!["--prod=true", "--watch", "--port=4200", "src"]);
    }

    #[test]
    fn test_internal_flags_win_over_expandable_flags() {
        let cfg = config(DOC);
        let plan = plan(&cfg, &to_args(&["demo", "t", "-f", "-c=prod"])).unwrap();
        assert_eq!(words(&plan.command), vec!["test", "@pae/demo-pkg"]);
        assert_eq!(plan.args, vec!["--fix", "--configuration=prod"]);
    }

    #[test]
    fn test_full_project_uses_run_syntax() {
        let cfg = config(DOC);
        let plan = plan(&cfg, &to_args(&["app", "serve", "-p"])).unwrap();
        assert_eq!(words(&plan.command), vec!["run", "@pae/app:serve"]);
        assert_eq!(plan.args, vec!["--prod=false"]);
    }

    #[test]
    fn test_start_position_goes_before_verb() {
        let cfg = config(DOC);
        let plan = plan(&cfg, &to_args(&["demo", "b", "--first"])).unwrap();
        assert_eq!(words(&plan.command), vec!["--first", "build", "@pae/demo-pkg"]);
    }

    #[test]
    fn test_env_flags_are_consumed_first() {
        let cfg = config(DOC);
        let plan = plan(&cfg, &to_args(&["-d", "demo", "b", "--pae-echo"])).unwrap();
        assert!(plan.options.debug);
        assert!(plan.options.is_dry_run());
        assert_eq!(words(&plan.command), vec!["build", "@pae/demo-pkg"]);
    }

    #[test]
    fn test_expandable_command_layout() {
        let cfg = config(DOC);
        let plan = plan(&cfg, &to_args(&["lint-all", "--first", "-f", "extra"])).unwrap();
        assert_eq!(
            plan.kind,
            PlanKind::ExpandableCommand {
                name: "lint-all".to_string()
            }
        );
        assert_eq!(plan.command, "npm --first run lint --");
        assert_eq!(plan.args, vec!["--fix", "extra"]);
    }

    #[test]
    fn test_expandable_command_substitutes_template_variables() {
        let cfg = config(DOC);
        let plan = plan(&cfg, &to_args(&["hello"])).unwrap();
        assert_eq!(plan.command, "$PAE_SHELL echo hi");
    }

    #[test]
    fn test_missing_parts_and_exclusions() {
        let cfg = config(DOC);
        assert_eq!(plan(&cfg, &[]).unwrap_err(), PlanError::MissingAlias);
        assert_eq!(
            plan(&cfg, &to_args(&["demo"])).unwrap_err(),
            PlanError::MissingTarget {
                alias: "demo".to_string()
            }
        );
        assert_eq!(
            plan(&cfg, &to_args(&["demo", "deploy"])).unwrap_err(),
            PlanError::ExcludedTarget {
                target: "deploy".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_alias_is_used_as_project_name() {
        let cfg = config(DOC);
        let plan = plan(&cfg, &to_args(&["other-lib", "lint"])).unwrap();
        assert_eq!(words(&plan.command), vec!["lint", "@pae/other-lib"]);
    }

    #[test]
    fn test_target_with_spaces_stays_one_token() {
        let cfg = config(DOC);
        let plan = plan(&cfg, &to_args(&["demo", "build all"])).unwrap();
        assert_eq!(words(&plan.command), vec!["build all", "@pae/demo-pkg"]);

        let plan = super::plan(&cfg, &to_args(&["app", "it's"])).unwrap();
        assert_eq!(words(&plan.command), vec!["run", "@pae/app:it's"]);
    }
}
