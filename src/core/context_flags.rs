// src/core/context_flags.rs

use crate::models::{ContextAwareFlag, FlagDefinition, FlagMap};
use regex::Regex;
use std::collections::HashMap;

/// The project/target pair a context-aware flag is resolved against.
#[derive(Debug, Clone, Copy)]
pub struct FlagContext<'a> {
    pub project: &'a str,
    pub target: &'a str,
}

impl FlagContext<'_> {
    /// The strings a context key is compared with, most specific first.
    fn candidates(&self) -> [String; 3] {
        [
            format!("{}:{}", self.project, self.target),
            self.target.to_string(),
            self.project.to_string(),
        ]
    }
}

/// Resolves every context-aware flag for `context` into a plain flag map.
///
/// Flags with no matching context and no `default` are left out.
pub fn resolve_context_flags(
    flags: &HashMap<String, ContextAwareFlag>,
    context: FlagContext<'_>,
) -> FlagMap {
    flags
        .iter()
        .filter_map(|(key, flag)| {
            resolve_one(flag, &context).map(|definition| (key.clone(), definition.clone()))
        })
        .collect()
}

/// Priority: exact `project:target`, `target`, `project`; then the longest
/// matching `*` pattern (ties broken lexicographically); then `default`.
fn resolve_one<'f>(
    flag: &'f ContextAwareFlag,
    context: &FlagContext<'_>,
) -> Option<&'f FlagDefinition> {
    let candidates = context.candidates();

    // --- 1. EXACT KEYS ---
    if let Some(definition) = candidates.iter().find_map(|c| flag.contexts.get(c)) {
        return Some(definition);
    }

    // --- 2. WILDCARD PATTERNS ---
    let mut patterns: Vec<&String> = flag
        .contexts
        .keys()
        .filter(|pattern| pattern.contains('*'))
        .collect();
    patterns.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let matched = patterns.into_iter().find(|pattern| match wildcard_regex(pattern) {
        Some(re) => candidates.iter().any(|c| re.is_match(c)),
        None => false,
    });
    if let Some(pattern) = matched {
        log::trace!("Context pattern '{}' matched.", pattern);
        return flag.contexts.get(pattern);
    }

    // --- 3. DEFAULT ---
    flag.default.as_ref()
}

/// Builds an anchored regex where `*` matches any run of characters.
fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    match Regex::new(&format!("^{}$", body)) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Ignoring context pattern '{}': {}", pattern, e);
            None
        }
    }
}
