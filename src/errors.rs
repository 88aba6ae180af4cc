// src/errors.rs

//! Crate-wide error type, result alias and exit-code mapping.

use thiserror::Error;

use crate::types::status_codes;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Target not found: {0}")]
    UnknownTarget(String),

    #[error("Target '{0}' is already registered")]
    DuplicateTarget(String),

    #[error("Target '{target}' declares dependency '{dependency}' more than once")]
    DuplicateDependency { target: String, dependency: String },

    #[error("Cycle detected in target dependencies: {0}")]
    DependencyCycle(String),

    #[error("Target {0} is not on the TargetsToExecute list")]
    TargetNotEligible(String),

    #[error("Task '{task}' in target '{target}' failed: {source:#}")]
    TaskFailed {
        target: String,
        task: String,
        #[source]
        source: anyhow::Error,
    },

    /// A dependency shared with a concurrently running branch failed there.
    #[error("Dependency '{dependency}' of target '{target}' failed")]
    DependencyFailed { target: String, dependency: String },

    #[error("{}", script_not_found_message(.searched))]
    ScriptNotFound { searched: Vec<String> },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuildError {
    /// Process exit code this error maps to at the runner boundary.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::ScriptNotFound { .. } => status_codes::BUILD_SCRIPT_NOT_FOUND,
            BuildError::TargetNotEligible(_) => status_codes::TARGET_NOT_ELIGIBLE,
            _ => status_codes::FAILURE,
        }
    }
}

fn script_not_found_message(searched: &[String]) -> String {
    let mut msg = String::from(
        "The build script file was not specified. Please specify it with --script \
         or use one of the default paths for the script file:",
    );
    for location in searched {
        msg.push('\n');
        msg.push_str(location);
    }
    msg
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildError>;
