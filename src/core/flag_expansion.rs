//! # Flag Expansion Engine
//!
//! Expands a raw argument list against a flag-definition map. Each argument is
//! matched exactly (`-f`) or with an embedded value (`--port=4300`) against the
//! map keys:
//!
//! - literal and array definitions write their fragments to `preArgs`,
//!   forwarding an embedded value onto the last fragment (`-c=prod` with
//!   `-c: "--configuration"` gives `--configuration=prod`);
//! - template definitions resolve their variables, optionally mutate the
//!   inbound value, substitute `{name}` placeholders and write the fragments
//!   to their configured position;
//! - anything else passes through to `remainingArgs` in its original order.
//!
//! The engine holds no state between calls.

use crate::{
    core::{interpolator, mutation::Mutation, reporter},
    models::{ExpansionResult, FlagDefinition, FlagMap, TemplateFlag, Variables},
};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpansionError {
    #[error(
        "Variable '{variable}' of flag '{flag}' is declared both as a template default \
         and as a top-level template variable."
    )]
    VariableConflict { flag: String, variable: String },
}

/// A matched argument: the flag key and its embedded value, if any.
struct FlagMatch<'a> {
    key: &'a str,
    embedded: Option<&'a str>,
}

/// Looks `token` up in `flag_map`, first verbatim, then as `key=value`.
fn match_flag<'a>(token: &'a str, flag_map: &FlagMap) -> Option<FlagMatch<'a>> {
    if flag_map.contains_key(token) {
        return Some(FlagMatch {
            key: token,
            embedded: None,
        });
    }
    let (key, value) = token.split_once('=')?;
    flag_map.contains_key(key).then_some(FlagMatch {
        key,
        embedded: Some(value),
    })
}

/// Expands `args` against `flag_map`.
///
/// `defaults` are the caller-supplied template variables; a template that
/// redeclares one of them is rejected before any substitution happens.
///
/// # Errors
/// [`ExpansionError::VariableConflict`] when a referenced template shares a
/// variable name with `defaults`.
pub fn expand(
    args: &[String],
    flag_map: &FlagMap,
    defaults: &Variables,
) -> Result<ExpansionResult, ExpansionError> {
    check_variable_conflicts(args, flag_map, defaults)?;

    let mut result = ExpansionResult::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let matched = match_flag(arg, flag_map)
            .and_then(|m| flag_map.get(m.key).map(|definition| (m, definition)));
        let Some((flag, definition)) = matched else {
            result.remaining_args.push(arg.clone());
            continue;
        };

        match definition {
            FlagDefinition::Literal(fragment) => {
                push_literals(&mut result, std::slice::from_ref(fragment), flag.embedded);
            }
            FlagDefinition::List(fragments) => {
                push_literals(&mut result, fragments, flag.embedded);
            }
            FlagDefinition::Template(template) => {
                let inbound = match flag.embedded {
                    Some(value) => Some(value.to_string()),
                    None if template.takes_value => iter.next().cloned(),
                    None => None,
                };
                let fragments = expand_template(flag.key, template, defaults, inbound.as_deref());
                result.bucket_mut(template.position).extend(fragments);
            }
        }
        log::trace!("Expanded '{}' via flag '{}'.", arg, flag.key);
    }

    Ok(result)
}

/// Merges several flag maps; earlier maps win on key collisions.
pub fn merge_flag_maps(maps: &[&FlagMap]) -> FlagMap {
    let mut merged: FlagMap = HashMap::new();
    for map in maps {
        for (key, definition) in map.iter() {
            merged
                .entry(key.clone())
                .or_insert_with(|| definition.clone());
        }
    }
    merged
}

fn push_literals(result: &mut ExpansionResult, fragments: &[String], embedded: Option<&str>) {
    let start = result.pre_args.len();
    result.pre_args.extend(fragments.iter().cloned());
    if let Some(value) = embedded {
        if let Some(last) = result.pre_args.get_mut(start..).and_then(|s| s.last_mut()) {
            last.push('=');
            last.push_str(value);
        }
    }
}

/// Fails if any template referenced by `args` redeclares a default variable.
///
/// Walks `args` the way [`expand`] does, so a token consumed as a template's
/// value is never looked up as a flag.
fn check_variable_conflicts(
    args: &[String],
    flag_map: &FlagMap,
    defaults: &Variables,
) -> Result<(), ExpansionError> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let Some(flag) = match_flag(arg, flag_map) else {
            continue;
        };
        let Some(FlagDefinition::Template(template)) = flag_map.get(flag.key) else {
            continue;
        };
        if flag.embedded.is_none() && template.takes_value {
            iter.next();
        }
        let mut names: Vec<&String> = template
            .variables
            .keys()
            .filter(|name| defaults.contains_key(name.as_str()))
            .collect();
        names.sort();
        if let Some(variable) = names.first() {
            return Err(ExpansionError::VariableConflict {
                flag: flag.key.to_string(),
                variable: (*variable).clone(),
            });
        }
    }
    Ok(())
}

/// Resolves one template match into its output fragments.
///
/// Mutation failures are reported and the unmutated value is used instead.
fn expand_template(
    flag: &str,
    template: &TemplateFlag,
    defaults: &Variables,
    inbound: Option<&str>,
) -> Vec<String> {
    let mut variables: Variables = defaults.clone();
    variables.extend(
        template
            .variables
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );

    if let Some(raw) = inbound {
        let value = match &template.mutation {
            Some(source) => apply_mutation(flag, source, raw),
            None => raw.to_string(),
        };
        variables.insert(template.bind_variable().to_string(), value);
    }

    template
        .template
        .fragments()
        .iter()
        .map(|fragment| {
            let expanded = interpolator::substitute(fragment, &variables).into_owned();
            let unresolved = interpolator::placeholders(&expanded);
            if !unresolved.is_empty() {
                log::debug!(
                    "Flag '{}' left placeholder(s) {:?} unresolved in '{}'.",
                    flag,
                    unresolved,
                    expanded
                );
            }
            expanded
        })
        .collect()
}

fn apply_mutation(flag: &str, source: &str, raw: &str) -> String {
    match Mutation::parse(source).and_then(|m| m.apply(raw)) {
        Ok(mutated) => {
            log::debug!("Flag '{}': mutated '{}' -> '{}'.", flag, raw, mutated);
            mutated
        }
        Err(e) => {
            reporter::report_template_fallback(flag, source, raw, &e);
            raw.to_string()
        }
    }
}
