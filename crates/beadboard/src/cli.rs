//! CLI command definitions using `clap`

use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::commands;

pub fn build_cli() -> Command {
    Command::new("beadboard")
        .about("Live dependency board for beads issue trackers")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("project")
                .long("project")
                .short('C')
                .global(true)
                .value_name("DIR")
                .help("Project root (defaults to the current directory)"),
        )
        .subcommand(cmd_board())
        .subcommand(cmd_watch())
        .subcommand(cmd_update())
}

fn cmd_board() -> Command {
    Command::new("board")
        .about("Render the board once and exit")
        .arg(
            Arg::new("root")
                .long("root")
                .value_name("EPIC_ID")
                .help("Epic to expand into dependency batches"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Output as JSON for machine parsing"),
        )
        .after_help(
            "EXAMPLES:\n  \
             beadboard board                 Status columns for every issue\n  \
             beadboard board --root bb-epic  Dependency batches under an epic\n  \
             beadboard board --json          JSON snapshot for automation",
        )
}

fn cmd_watch() -> Command {
    Command::new("watch")
        .about("Keep the board on screen and refresh it as the tracker changes")
        .arg(
            Arg::new("root")
                .long("root")
                .value_name("EPIC_ID")
                .help("Epic to expand into dependency batches"),
        )
        .after_help(
            "EXAMPLES:\n  \
             beadboard watch                 Live board until Ctrl-C\n  \
             beadboard watch --root bb-epic  Live batches under an epic",
        )
}

fn cmd_update() -> Command {
    Command::new("update")
        .about("Change an issue's status")
        .arg(
            Arg::new("id")
                .required(true)
                .value_name("ISSUE_ID")
                .help("Issue to update"),
        )
        .arg(
            Arg::new("status")
                .long("status")
                .short('s')
                .required(true)
                .value_name("STATUS")
                .help("One of: open, in_progress, blocked, deferred, closed"),
        )
        .after_help(
            "EXAMPLES:\n  \
             beadboard update bb-12 --status in_progress\n  \
             beadboard update bb-12 -s closed",
        )
}

/// Resolve the project root from `--project` or the working directory.
fn project_root(matches: &ArgMatches) -> Result<PathBuf> {
    match matches.get_one::<String>("project") {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(std::env::current_dir()?),
    }
}

pub async fn dispatch(matches: &ArgMatches) -> Result<()> {
    let root = project_root(matches)?;
    match matches.subcommand() {
        Some(("board", sub)) => commands::board::run(&root, sub).await,
        Some(("watch", sub)) => commands::watch::run(&root, sub).await,
        Some(("update", sub)) => commands::update::run(&root, sub).await,
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_update_args() {
        let matches = build_cli()
            .try_get_matches_from(["beadboard", "update", "bb-12", "--status", "closed"]);
        assert!(matches.is_ok());
        if let Ok(matches) = matches {
            let Some(("update", sub)) = matches.subcommand() else {
                panic!("expected update subcommand");
            };
            assert_eq!(sub.get_one::<String>("id").map(String::as_str), Some("bb-12"));
            assert_eq!(
                sub.get_one::<String>("status").map(String::as_str),
                Some("closed")
            );
        }
    }

    #[test]
    fn test_update_requires_status() {
        let matches = build_cli().try_get_matches_from(["beadboard", "update", "bb-12"]);
        assert!(matches.is_err());
    }

    #[test]
    fn test_global_project_flag() {
        let matches =
            build_cli().try_get_matches_from(["beadboard", "board", "--project", "/somewhere"]);
        assert!(matches.is_ok());
        if let Ok(matches) = matches {
            assert_eq!(
                matches.get_one::<String>("project").map(String::as_str),
                Some("/somewhere")
            );
        }
    }
}
