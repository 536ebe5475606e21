// src/core/alias_resolver.rs

use crate::models::{AliasConfig, ProjectAlias, ResolvedProject};
use std::borrow::Cow;

/// Maps a configured alias value to its canonical project id.
///
/// The id is namespace-prefixed exactly once: a value that already starts
/// with `<namespace>/` is kept as is. A descriptor's `suffix` is appended
/// with a single `-`. `full` only travels along in `is_full`.
pub fn resolve_project_for_alias(value: &ProjectAlias, namespace: &str) -> ResolvedProject {
    match value {
        ProjectAlias::Name(name) => ResolvedProject {
            project: qualify(name, namespace),
            is_full: false,
        },
        ProjectAlias::Descriptor(descriptor) => {
            let name: Cow<'_, str> = match &descriptor.suffix {
                Some(suffix) => Cow::Owned(format!("{}-{}", descriptor.name, suffix)),
                None => Cow::Borrowed(&descriptor.name),
            };
            ResolvedProject {
                project: qualify(&name, namespace),
                is_full: descriptor.full,
            }
        }
    }
}

/// Resolves a user-typed alias, treating unknown aliases as bare project names.
pub fn resolve_alias(alias: &str, config: &AliasConfig, namespace: &str) -> ResolvedProject {
    match config.project_aliases.get(alias) {
        Some(value) => resolve_project_for_alias(value, namespace),
        None => {
            log::debug!("'{}' is not a configured alias; using it as a project name.", alias);
            resolve_project_for_alias(&ProjectAlias::Name(alias.to_string()), namespace)
        }
    }
}

/// Expands a short target name through `targetAliases`.
pub fn resolve_target<'a>(target: &'a str, config: &'a AliasConfig) -> &'a str {
    config
        .target_aliases
        .get(target)
        .map_or(target, String::as_str)
}

fn qualify(name: &str, namespace: &str) -> String {
    let already_prefixed = name
        .strip_prefix(namespace)
        .is_some_and(|rest| rest.starts_with('/'));
    if already_prefixed {
        name.to_string()
    } else {
        format!("{}/{}", namespace, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectDescriptor;
    use proptest::prelude::*;

    const NS: &str = "@pae";

    fn name(s: &str) -> ProjectAlias {
        ProjectAlias::Name(s.to_string())
    }

    #[test]
    fn test_bare_name_gets_prefixed() {
        let resolved = resolve_project_for_alias(&name("demo-pkg"), NS);
        assert_eq!(
            resolved,
            ResolvedProject {
                project: "@pae/demo-pkg".to_string(),
                is_full: false
            }
        );
    }

    #[test]
    fn test_prefixed_name_is_kept() {
        let resolved = resolve_project_for_alias(&name("@pae/demo-pkg"), NS);
        assert_eq!(resolved.project, "@pae/demo-pkg");
    }

    #[test]
    fn test_similar_scope_is_not_treated_as_prefixed() {
        let resolved = resolve_project_for_alias(&name("@paey/demo"), NS);
        assert_eq!(resolved.project, "@pae/@paey/demo");
    }

    #[test]
    fn test_descriptor_with_suffix() {
        let value = ProjectAlias::Descriptor(ProjectDescriptor {
            name: "demo-pkg".to_string(),
            suffix: Some("core".to_string()),
            full: false,
        });
        assert_eq!(
            resolve_project_for_alias(&value, NS),
            ResolvedProject {
                project: "@pae/demo-pkg-core".to_string(),
                is_full: false
            }
        );
    }

    #[test]
    fn test_descriptor_full_and_prefixed_name() {
        let value = ProjectAlias::Descriptor(ProjectDescriptor {
            name: "@pae/demo-pkg".to_string(),
            suffix: None,
            full: true,
        });
        let resolved = resolve_project_for_alias(&value, NS);
        assert_eq!(resolved.project, "@pae/demo-pkg");
        assert!(resolved.is_full);
    }

    #[test]
    fn test_resolve_alias_and_target() {
        let mut config = AliasConfig::default();
        config.project_aliases.insert("demo".into(), name("demo-pkg"));
        config.target_aliases.insert("b".into(), "build".into());

        assert_eq!(resolve_alias("demo", &config, NS).project, "@pae/demo-pkg");
        assert_eq!(resolve_alias("other", &config, NS).project, "@pae/other");
        assert_eq!(resolve_target("b", &config), "build");
        assert_eq!(resolve_target("lint", &config), "lint");
    }

    proptest! {
        #[test]
        fn prefixing_is_idempotent(raw in "[a-z][a-z0-9-]{0,20}") {
            let plain = resolve_project_for_alias(&name(&raw), NS);
            let prefixed = resolve_project_for_alias(&name(&plain.project), NS);
            prop_assert_eq!(plain, prefixed);
        }
    }
}
