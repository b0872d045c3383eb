//! # stamp CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stamp_cli::check::{run_check, CheckArgs};
use stamp_cli::fix::{run_fix, FixArgs};
use stamp_cli::propose::{run_propose, ProposeArgs};
use stamp_cli::GlobalOptions;

/// Stamp: metadata governance for Markdown documents.
///
/// Validates document metadata against a JSON Schema, classifies every
/// finding as fatal, repairable or a warning, and repairs what policy
/// allows.
#[derive(Parser, Debug)]
#[command(name = "stamp", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate and classify documents.
    Check(CheckArgs),

    /// List fix proposals for documents.
    Propose(ProposeArgs),

    /// Plan repairs; write them only with --approve.
    Fix(FixArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "stamp starting");

    let result = match &cli.command {
        Commands::Check(args) => run_check(args, &cli.global),
        Commands::Propose(args) => run_propose(args, &cli.global),
        Commands::Fix(args) => run_fix(args, &cli.global),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cli_parse_check() {
        let cli = Cli::try_parse_from(["stamp", "check", "docs", "README.md"]).unwrap();
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.paths, vec![PathBuf::from("docs"), PathBuf::from("README.md")]);
        assert_eq!(cli.global.schema, stamp_cli::DEFAULT_SCHEMA);
        assert!(!cli.global.json);
    }

    #[test]
    fn cli_parse_check_requires_paths() {
        assert!(Cli::try_parse_from(["stamp", "check"]).is_err());
    }

    #[test]
    fn cli_parse_fix_flags() {
        let cli = Cli::try_parse_from([
            "stamp",
            "fix",
            "docs",
            "--approve",
            "--include-inferred",
            "--output-dir",
            "out",
        ])
        .unwrap();
        let Commands::Fix(args) = cli.command else {
            panic!("expected fix");
        };
        assert!(args.approve);
        assert!(args.include_inferred);
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn cli_parse_fix_defaults_to_no_approval() {
        let cli = Cli::try_parse_from(["stamp", "fix", "d"]).unwrap();
        let Commands::Fix(args) = cli.command else {
            panic!("expected fix");
        };
        assert!(!args.approve);
        assert!(!args.include_inferred);
    }

    #[test]
    fn cli_parse_include_inferred_requires_approve() {
        assert!(Cli::try_parse_from(["stamp", "fix", "d", "--include-inferred"]).is_err());
    }

    #[test]
    fn cli_parse_global_options_anywhere() {
        let cli = Cli::try_parse_from([
            "stamp",
            "--schema",
            "s.json",
            "propose",
            "docs",
            "--json",
            "--trace",
            "trace.json",
            "--config",
            "stamp.yaml",
            "-vv",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Propose(_)));
        assert_eq!(cli.global.schema, "s.json");
        assert!(cli.global.json);
        assert_eq!(cli.global.trace, Some(PathBuf::from("trace.json")));
        assert_eq!(cli.global.config, Some(PathBuf::from("stamp.yaml")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn cli_parse_no_subcommand_errors() {
        assert!(Cli::try_parse_from(["stamp"]).is_err());
    }
}
