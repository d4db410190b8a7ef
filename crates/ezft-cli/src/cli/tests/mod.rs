//! CLI parse tests.

use super::{Cli, CliCommand};
use clap::Parser;

pub(super) fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}


#[test]
fn cli_parse_checksum() {
    match parse(&["ezft", "checksum", "/tmp/file.bin"]).command {
        CliCommand::Checksum { path, expect } => {
            assert_eq!(path, std::path::Path::new("/tmp/file.bin"));
            assert!(expect.is_none());
        }
        _ => panic!("expected Checksum"),
    }
}

#[test]
fn cli_parse_global_log_flags() {
    let cli = parse(&[
        "ezft",
        "client",
        "-u",
        "http://h/f",
        "--log-home",
        "/var/log/ezft",
        "--log-level",
        "debug",
    ]);
    assert_eq!(cli.log_home.as_deref(), Some(std::path::Path::new("/var/log/ezft")));
    assert_eq!(cli.log_level.as_deref(), Some("debug"));
}

#[test]
fn cli_version_flag() {
    let err = Cli::try_parse_from(["ezft", "--version"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
}

#[test]
fn cli_requires_subcommand() {
    assert!(Cli::try_parse_from(["ezft"]).is_err());
}
