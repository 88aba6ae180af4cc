// src/runner.rs

//! Top-level driver: find the build script, hand it a session, turn the
//! outcome into a process exit code.

use std::error::Error as _;

use tracing::{error, info};

use crate::cli::CommandArguments;
use crate::config::loader::DEFAULT_SCRIPT_LOCATIONS;
use crate::context::TaskSession;
use crate::errors::{BuildError, Result};
use crate::script::ScriptLocator;
use crate::types::status_codes;

pub struct CommandExecutor<L> {
    args: CommandArguments,
    locator: L,
    session: TaskSession,
}

impl<L: ScriptLocator> CommandExecutor<L> {
    pub fn new(args: CommandArguments, locator: L) -> Self {
        Self {
            args,
            locator,
            session: TaskSession::default(),
        }
    }

    /// Start from `session` (e.g. with pre-seeded build properties). Run
    /// options are still taken from the command arguments.
    pub fn with_session(mut self, session: TaskSession) -> Self {
        self.session = session;
        self
    }

    pub fn args(&self) -> &CommandArguments {
        &self.args
    }

    /// Run the build and return the process exit code.
    ///
    /// With `rethrow` set, failures are returned as errors instead.
    pub async fn execute(&self) -> Result<i32> {
        info!(version = env!("CARGO_PKG_VERSION"), "buildrig");

        if self.args.help {
            return Ok(status_codes::HELP_REQUESTED);
        }

        let script = match self.locator.find(&self.args) {
            Ok(Some(script)) => script,
            Ok(None) => {
                return self.fail(BuildError::ScriptNotFound {
                    searched: DEFAULT_SCRIPT_LOCATIONS.iter().map(|s| s.to_string()).collect(),
                });
            }
            Err(err) => return self.fail(err),
        };

        match script.run(self.session_for_run()).await {
            Ok(code) => {
                info!(exit_code = code, "build finished");
                Ok(code)
            }
            Err(err) => self.fail(err),
        }
    }

    fn session_for_run(&self) -> TaskSession {
        TaskSession {
            script_args: self.args.script_args.clone(),
            main_targets: self.args.main_targets.clone(),
            targets_to_execute: self.args.targets_to_execute.clone(),
            no_dependencies: self.args.no_dependencies,
            dry_run: self.args.dry_run,
            properties: self.session.properties.clone(),
        }
    }

    fn fail(&self, err: BuildError) -> Result<i32> {
        if self.args.rethrow {
            return Err(err);
        }
        error!(exit_code = err.exit_code(), "EXECUTION FAILED:\n{}", describe_chain(&err));
        Ok(err.exit_code())
    }
}

/// The error and each of its sources, one per line.
fn describe_chain(err: &BuildError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str("\n  caused by: ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn chain_skips_causes_already_in_the_message() {
        let err = BuildError::TaskFailed {
            target: "compile".into(),
            task: "cc".into(),
            source: anyhow!("exit 1"),
        };
        assert_eq!(describe_chain(&err).matches("exit 1").count(), 1);

        let io = BuildError::IoError(std::io::Error::other("disk full"));
        assert!(describe_chain(&io).contains("disk full"));
    }
}
