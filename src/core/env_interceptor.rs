// src/core/env_interceptor.rs

//! Engine-control flag interception.
//!
//! Runs the env-setting flag pass and scans the flattened output for the
//! debug, verbose, echo and extended-echo markers. The markers become a
//! [`RuntimeOptions`] value that is handed down the pipeline explicitly.

use crate::{
    constants::{DEBUG_MARKER, ECHO_EXTENDED_MARKER, ECHO_MARKER, VERBOSE_MARKER},
    core::flag_expansion::{self, ExpansionError},
    models::{EchoScope, FlagDefinition, FlagMap, RuntimeOptions, Variables},
};

/// The outcome of the env-setting pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interception {
    pub options: RuntimeOptions,
    /// Arguments left for the internal and expandable passes.
    pub remaining: Vec<String>,
    /// Expanded tokens that were not engine-control markers.
    pub unrecognized: Vec<String>,
}

/// The built-in env-setting flags, each mapping to its own marker.
///
/// Config entries under `envSettingFlags` override these by key.
pub fn builtin_env_flags() -> FlagMap {
    [DEBUG_MARKER, VERBOSE_MARKER, ECHO_MARKER, ECHO_EXTENDED_MARKER]
        .into_iter()
        .map(|marker| (marker.to_string(), FlagDefinition::Literal(marker.to_string())))
        .collect()
}

/// Expands `args` against the env-setting flags and collects runtime options.
///
/// # Errors
/// Propagates [`ExpansionError`] from the env-setting pass.
pub fn intercept(
    args: &[String],
    env_flags: &FlagMap,
    defaults: &Variables,
) -> Result<Interception, ExpansionError> {
    let builtin = builtin_env_flags();
    let flag_map = flag_expansion::merge_flag_maps(&[env_flags, &builtin]);
    let expansion = flag_expansion::expand(args, &flag_map, defaults)?;

    let mut interception = Interception {
        remaining: expansion.remaining_args.clone(),
        ..Default::default()
    };
    for token in expansion.expanded_tokens() {
        if !apply_marker(&mut interception.options, token) {
            log::debug!("Env-setting flag produced '{}', which is not a control marker.", token);
            interception.unrecognized.push(token.clone());
        }
    }
    Ok(interception)
}

/// Applies one marker token; returns `false` when `token` is not a marker.
fn apply_marker(options: &mut RuntimeOptions, token: &str) -> bool {
    let (marker, variant) = match token.split_once('=') {
        Some((marker, variant)) => (marker, Some(variant)),
        None => (token, None),
    };
    let scope = || EchoScope {
        variant: variant.filter(|v| !v.is_empty()).map(str::to_string),
    };

    match (marker, variant) {
        (DEBUG_MARKER, None) => options.debug = true,
        (VERBOSE_MARKER, None) => options.verbose = true,
        (ECHO_MARKER, _) => options.echo = Some(scope()),
        (ECHO_EXTENDED_MARKER, _) => options.echo_extended = Some(scope()),
        _ => return false,
    }
    true
}
