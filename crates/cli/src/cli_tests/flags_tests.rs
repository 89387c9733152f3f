// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use clap::CommandFactory;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(args)
}

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_global_options_default_to_none() {
    let cli = parse(&["satchel", "status"]).unwrap();
    assert!(cli.state_dir.is_none());
    assert!(cli.config.is_none());
}

#[test]
fn test_global_options_after_subcommand() {
    let cli = parse(&[
        "satchel",
        "status",
        "--state-dir",
        "/tmp/s",
        "--config",
        "/tmp/c.toml",
    ])
    .unwrap();
    assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/s")));
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
}

#[test]
fn test_subcommand_required() {
    assert!(parse(&["satchel"]).is_err());
}

#[test]
fn test_completion_shell() {
    let cli = parse(&["satchel", "completion", "bash"]).unwrap();
    match cli.command {
        Command::Completion { shell } => assert_eq!(shell, Shell::Bash),
        _ => panic!("Expected Completion command"),
    }
}

#[test]
fn test_completion_rejects_unknown_shell() {
    assert!(parse(&["satchel", "completion", "tcsh"]).is_err());
}
