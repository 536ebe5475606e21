// src/core/interpolator.rs

use crate::models::Variables;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::borrow::Cow;

lazy_static! {
    static ref PLACEHOLDER_RE: Regex =
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_-]*)\}").expect("placeholder regex is valid");
}

/// Replaces every `{name}` placeholder whose variable is known.
///
/// Unknown placeholders are left verbatim so a missing variable never drops
/// or mangles a fragment.
pub fn substitute<'t>(template: &'t str, variables: &Variables) -> Cow<'t, str> {
    PLACEHOLDER_RE.replace_all(template, |caps: &Captures<'_>| {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        caps.get(1)
            .and_then(|name| variables.get(name.as_str()))
            .map_or_else(|| whole.to_string(), Clone::clone)
    })
}

/// Names of every placeholder in `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER_RE
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}
