// src/lib.rs

//! `buildrig`: named build targets with dependencies, executed once each in
//! dependency order, with tasks scheduled synchronously or in parallel.
//!
//! The engine lives in [`target`] and [`task`]; [`script`] and [`runner`]
//! wire it to a build description and a process exit code.

pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod logging;
pub mod runner;
pub mod script;
pub mod target;
pub mod task;
pub mod types;

pub use context::{BuildProperties, TaskContext, TaskSession};
pub use errors::{BuildError, Result};
pub use target::{Target, TargetDefinition, TargetTree};
pub use task::{AsyncFnTask, FnTask, GroupHandle, ShellTask, Task, TaskGroup};
pub use types::{ExecutionMode, TargetName, status_codes};

use crate::cli::CommandArguments;
use crate::runner::CommandExecutor;
use crate::script::DefaultScriptLocator;

/// High-level entry point used by `main.rs`: locate the build description in
/// the working directory and run it.
pub async fn run(args: CommandArguments) -> Result<i32> {
    CommandExecutor::new(args, DefaultScriptLocator::new())
        .execute()
        .await
}
