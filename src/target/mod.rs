// src/target/mod.rs

//! Targets and the target tree.
//!
//! - [`definition`] is the builder a build script uses to declare a target.
//! - [`Target`] is the immutable, registered result.
//! - [`batch`] implements the join-point rule that interleaves synchronous
//!   and parallel work, for task groups and for dependency lists alike.
//! - [`tree`] owns every target, resolves dependencies and guarantees each
//!   target runs at most once per build run.
//! - [`validate`] checks the dependency graph (unknown names, cycles).

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::context::TaskContext;
use crate::errors::{BuildError, Result};
use crate::task::TaskGroup;
use crate::types::{ExecutionMode, TargetName};

pub mod batch;
pub mod definition;
pub mod tree;
pub mod validate;

pub use definition::TargetDefinition;
pub use tree::TargetTree;

/// A registered target: name, presentation metadata, ordered dependencies and
/// ordered task groups. Immutable once registered.
#[derive(Debug)]
pub struct Target {
    name: TargetName,
    description: Option<String>,
    hidden: bool,
    dependencies: Vec<(TargetName, ExecutionMode)>,
    task_groups: Vec<TaskGroup>,
}

impl Target {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Dependencies in declaration order.
    pub fn dependencies(&self) -> &[(TargetName, ExecutionMode)] {
        &self.dependencies
    }

    pub fn task_groups(&self) -> &[TaskGroup] {
        &self.task_groups
    }

    /// Run this target: dependencies first, then the eligibility check (only
    /// when invoked directly), then every task group in order.
    pub(crate) async fn execute(
        &self,
        tree: &Arc<TargetTree>,
        ctx: &TaskContext,
        direct: bool,
    ) -> Result<()> {
        let ctx = ctx.for_target(&self.name);
        let started = Instant::now();

        info!(target_name = %self.name, "executing target");

        tree.mark_executed(&self.name);
        tree.resolve_dependencies(self, &ctx).await?;

        if direct {
            if let Some(allowed) = ctx.targets_to_execute() {
                if !allowed.iter().any(|name| *name == self.name) {
                    return Err(BuildError::TargetNotEligible(self.name.clone()));
                }
            }
        }

        batch::run_task_groups(&self.name, &self.task_groups, &ctx).await?;

        info!(
            target_name = %self.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "target finished"
        );
        Ok(())
    }

    /// One line per task this target would execute, in order.
    pub fn task_descriptions(&self) -> Vec<String> {
        self.task_groups
            .iter()
            .flat_map(|g| g.tasks())
            .map(|entry| format!("{} ({})", entry.task.describe(), entry.mode))
            .collect()
    }
}
