use clap::Parser;

pub mod handlers;

/// The argument that switches to the alias/command listing.
pub const LIST_FLAG: &str = "--pae-list";

/// pae: short aliases for monorepo task-runner invocations.
#[derive(Parser, Debug)]
#[command(
    name = "pae",
    author,
    version,
    about,
    long_about = "Expands `pae <alias|command> [target] [args...]` through the flag maps in \
                  pae.aliases.json and runs the resulting task-runner command.\n\
                  Run without arguments (or with --pae-list) to list the configured aliases.",
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
/// The raw command line; everything after the binary name.
pub struct Cli {
    /// Alias or command, optional target, and the arguments to expand.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// What the binary should do with the parsed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    List(Vec<String>),
    Run(Vec<String>),
}

impl Cli {
    /// Listing for no arguments or `--pae-list`, otherwise a run.
    pub fn action(self) -> Action {
        match self.args.split_first() {
            None => Action::List(Vec::new()),
            Some((first, rest)) if first == LIST_FLAG => Action::List(rest.to_vec()),
            Some(_) => Action::Run(self.args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pae").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_args_lists() {
        assert_eq!(parse(&[]).action(), Action::List(vec![]));
    }

    #[test]
    fn test_list_flag_forwards_its_args() {
        assert_eq!(
            parse(&["--pae-list", "--json"]).action(),
            Action::List(vec!["--json".to_string()])
        );
    }

    #[test]
    fn test_hyphenated_args_are_kept_in_order() {
        assert_eq!(
            parse(&["demo", "b", "-f", "--port", "4200"]).action(),
            Action::Run(
                ["demo", "b", "-f", "--port", "4200"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            )
        );
    }
}
