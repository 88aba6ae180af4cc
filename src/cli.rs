// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The built-in help flag is disabled so `-h/--help` reaches the runner,
//! which reports it with its own exit code.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, ValueEnum};

use crate::types::TargetName;

/// Command-line arguments for `buildrig`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildrig",
    version,
    about = "Run build targets in dependency order with sync/parallel task scheduling.",
    long_about = None,
    disable_help_flag = true
)]
pub struct CliArgs {
    /// Targets to run, followed by optional `KEY=VALUE` script arguments.
    ///
    /// With no target, the default target runs (or `help` if there is none).
    #[arg(value_name = "TARGET|KEY=VALUE")]
    pub items: Vec<String>,

    /// Path to the build description (TOML).
    ///
    /// Default: the first of `Buildrig.toml`, `build/Buildrig.toml`,
    /// `.buildrig/Buildrig.toml` that exists.
    #[arg(long, short = 's', value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Comma-separated list of targets allowed to be invoked directly.
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub targets_to_execute: Option<Vec<TargetName>>,

    /// Run the requested targets without resolving their dependencies.
    #[arg(long)]
    pub no_dependencies: bool,

    /// Propagate failures instead of converting them to an exit code.
    #[arg(long)]
    pub rethrow: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDRIG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Log what each target would execute, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print help.
    #[arg(short = 'h', long)]
    pub help: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Arguments the runner works from, independent of how they were parsed.
#[derive(Debug, Clone, Default)]
pub struct CommandArguments {
    pub main_targets: Vec<TargetName>,
    pub script_args: BTreeMap<String, String>,
    pub script: Option<PathBuf>,
    pub targets_to_execute: Option<Vec<TargetName>>,
    pub no_dependencies: bool,
    pub rethrow: bool,
    pub dry_run: bool,
    pub help: bool,
}

impl From<CliArgs> for CommandArguments {
    fn from(args: CliArgs) -> Self {
        let mut main_targets = Vec::new();
        let mut script_args = BTreeMap::new();

        for item in args.items {
            match item.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    script_args.insert(key.to_string(), value.to_string());
                }
                _ => main_targets.push(item),
            }
        }

        Self {
            main_targets,
            script_args,
            script: args.script,
            targets_to_execute: args.targets_to_execute,
            no_dependencies: args.no_dependencies,
            rethrow: args.rethrow,
            dry_run: args.dry_run,
            help: args.help,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Print the generated usage text to stdout.
pub fn print_help() -> std::io::Result<()> {
    CliArgs::command().print_help()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_targets_from_script_arguments() {
        let args = CliArgs::parse_from([
            "buildrig",
            "compile",
            "package",
            "version=1.2.0",
            "--targets-to-execute",
            "compile,package",
            "--no-dependencies",
        ]);
        let cmd = CommandArguments::from(args);

        assert_eq!(cmd.main_targets, vec!["compile", "package"]);
        assert_eq!(cmd.script_args.get("version").map(String::as_str), Some("1.2.0"));
        assert_eq!(
            cmd.targets_to_execute,
            Some(vec!["compile".to_string(), "package".to_string()])
        );
        assert!(cmd.no_dependencies);
        assert!(!cmd.help);
    }

    #[test]
    fn short_help_flag_is_captured() {
        let cmd = CommandArguments::from(CliArgs::parse_from(["buildrig", "-h"]));
        assert!(cmd.help);
        assert!(cmd.main_targets.is_empty());
    }

    #[test]
    fn cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }
}
