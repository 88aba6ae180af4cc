// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical target name type used throughout the engine.
pub type TargetName = String;

/// How a task (or a dependency edge) is scheduled relative to its siblings.
///
/// - `Synchronous`: run to completion before anything after it starts, and
///   only after every previously dispatched parallel sibling has finished.
/// - `Parallel`: dispatched concurrently; joined at the next synchronous
///   boundary (or at the very end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum ExecutionMode {
    Synchronous,
    Parallel,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Synchronous
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Synchronous => f.write_str("sync"),
            ExecutionMode::Parallel => f.write_str("parallel"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sync" | "synchronous" => Ok(ExecutionMode::Synchronous),
            "parallel" | "async" => Ok(ExecutionMode::Parallel),
            other => Err(format!(
                "invalid execution mode: {other} (expected \"sync\" or \"parallel\")"
            )),
        }
    }
}

impl TryFrom<String> for ExecutionMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Process exit codes produced by the runner.
pub mod status_codes {
    pub const SUCCESS: i32 = 0;
    pub const HELP_REQUESTED: i32 = 1;
    pub const BUILD_SCRIPT_NOT_FOUND: i32 = 2;
    pub const TARGET_NOT_ELIGIBLE: i32 = 3;
    pub const FAILURE: i32 = 4;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_aliases() {
        assert_eq!("sync".parse::<ExecutionMode>(), Ok(ExecutionMode::Synchronous));
        assert_eq!(" Parallel ".parse::<ExecutionMode>(), Ok(ExecutionMode::Parallel));
        assert_eq!("async".parse::<ExecutionMode>(), Ok(ExecutionMode::Parallel));
        assert!("eventually".parse::<ExecutionMode>().is_err());
    }
}
