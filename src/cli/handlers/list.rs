use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::{
    cli::handlers::commons,
    constants::DEFAULT_NAMESPACE,
    core::alias_resolver,
    models::AliasConfig,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Lists the configured aliases and commands."
)]
struct ListArgs {
    /// Print the listing as JSON.
    #[arg(long)]
    json: bool,

    /// Only list project aliases.
    #[arg(long, conflicts_with = "commands")]
    aliases: bool,

    /// Only list expandable commands.
    #[arg(long)]
    commands: bool,
}

/// One listed entry: what the user types and what it becomes.
#[derive(Serialize, Debug, PartialEq, Eq)]
struct Entry {
    target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct Listing {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    project_aliases: BTreeMap<String, Entry>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    expandable_commands: BTreeMap<String, Entry>,
}

/// Prints the configured aliases and expandable commands.
pub fn handle(args: Vec<String>) -> Result<i32> {
    let list_args = ListArgs::try_parse_from(&args)?;
    let root = commons::workspace_root()?;
    let (_store, config) = commons::load_config(&root)?;

    let listing = build_listing(&config, &list_args);
    if list_args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(0);
    }

    print_section("Project aliases", &listing.project_aliases);
    print_section("Commands", &listing.expandable_commands);
    if listing.project_aliases.is_empty() && listing.expandable_commands.is_empty() {
        println!("{}", "Nothing configured.".yellow());
    }
    Ok(0)
}

fn build_listing(config: &AliasConfig, args: &ListArgs) -> Listing {
    let namespace = config.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
    let describe = |key: &str| config.command_descriptions.get(key).cloned();
    let mut listing = Listing::default();

    if !args.commands {
        for (alias, value) in &config.project_aliases {
            let resolved = alias_resolver::resolve_project_for_alias(value, namespace);
            let target = if resolved.is_full {
                format!("{} (full)", resolved.project)
            } else {
                resolved.project
            };
            listing.project_aliases.insert(
                alias.clone(),
                Entry {
                    target,
                    description: describe(alias),
                },
            );
        }
    }

    if !args.aliases {
        for (name, command) in &config.expandable_commands {
            listing.expandable_commands.insert(
                name.clone(),
                Entry {
                    target: command.clone(),
                    description: describe(name),
                },
            );
        }
    }
    listing
}

fn print_section(title: &str, entries: &BTreeMap<String, Entry>) {
    if entries.is_empty() {
        return;
    }
    println!("{}", title.bold().underline());
    let width = entries.keys().map(|k| k.chars().count()).max().unwrap_or(0);
    for (name, entry) in entries {
        let padded = format!("{:<width$}", name, width = width);
        match &entry.description {
            Some(description) => println!(
                "  {}  {}  {}",
                padded.cyan(),
                entry.target,
                format!("# {}", description).dimmed()
            ),
            None => println!("  {}  {}", padded.cyan(), entry.target),
        }
    }
    println!();
}
