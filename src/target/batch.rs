// src/target/batch.rs

//! Join-point scheduling shared by task groups and dependency lists.
//!
//! Work items are walked in order. A synchronous item runs to completion
//! before the walk continues. A parallel item is dispatched onto the runtime
//! and added to the in-flight set; right after dispatching, the walk looks at
//! the next item:
//!
//! - next item is synchronous: join the in-flight set first;
//! - there is no next item: join before returning;
//! - next item is parallel: keep going, the set stays pending.
//!
//! For task groups "next item" crosses group boundaries (the first task of the
//! next non-empty group), so parallel runs may span groups when nothing
//! synchronous sits between them. A synchronous item therefore never overlaps
//! with a parallel sibling.

use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::context::TaskContext;
use crate::errors::{BuildError, Result};
use crate::target::TargetTree;
use crate::task::{TaskFuture, TaskGroup};
use crate::types::{ExecutionMode, TargetName};

/// Parallel work dispatched but not yet joined.
pub(crate) struct InFlight {
    set: JoinSet<Result<()>>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self {
            set: JoinSet::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.set.len()
    }

    pub(crate) fn spawn<F>(&mut self, work: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.set.spawn(work);
    }

    /// Wait for everything in flight. All items are awaited even after a
    /// failure; the first failure observed is returned and later ones are
    /// logged.
    pub(crate) async fn join(&mut self, owner: &str) -> Result<()> {
        if self.set.is_empty() {
            return Ok(());
        }

        debug!(target_name = %owner, pending = self.len(), "join point: waiting for parallel work");

        let mut first_failure = None;
        while let Some(joined) = self.set.join_next().await {
            let outcome = joined.unwrap_or_else(|e| {
                Err(BuildError::Other(anyhow!("parallel work aborted: {e}")))
            });
            if let Err(err) = outcome {
                if first_failure.is_none() {
                    first_failure = Some(err);
                } else {
                    warn!(target_name = %owner, error = %err, "additional parallel failure");
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Whether the in-flight set must be joined given the mode of the next item.
fn must_join(next: Option<ExecutionMode>) -> bool {
    !matches!(next, Some(ExecutionMode::Parallel))
}

/// Mode of the task that follows `groups[group][task]`, looking into later
/// groups (skipping empty ones) when it is the last task of its group.
fn next_task_mode(groups: &[TaskGroup], group: usize, task: usize) -> Option<ExecutionMode> {
    if let Some(next) = groups[group].tasks().get(task + 1) {
        return Some(next.mode);
    }
    groups[group + 1..]
        .iter()
        .find_map(|g| g.tasks().first())
        .map(|entry| entry.mode)
}

/// Run a task on its own runtime task so a panic surfaces as a task failure
/// instead of tearing down the driver.
async fn supervise(target: TargetName, label: String, work: TaskFuture) -> Result<()> {
    match tokio::spawn(work).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(BuildError::TaskFailed {
            target,
            task: label,
            source,
        }),
        Err(join_err) => Err(BuildError::TaskFailed {
            target,
            task: label,
            source: anyhow!("task panicked: {join_err}"),
        }),
    }
}

/// Execute every task group of `target` in order.
///
/// When a group fails its `on_error` hook sees the error, its `on_finally`
/// hook runs, and the error is returned without touching later groups.
pub(crate) async fn run_task_groups(
    target: &str,
    groups: &[TaskGroup],
    ctx: &TaskContext,
) -> Result<()> {
    let mut in_flight = InFlight::new();

    for index in 0..groups.len() {
        let group = &groups[index];
        debug!(target_name = %target, group = %group.id(), tasks = group.len(), "entering task group");

        let outcome = run_group(target, groups, index, &mut in_flight, ctx).await;

        if let Err(err) = &outcome {
            warn!(target_name = %target, group = %group.id(), error = %err, "task group failed");
            group.notify_error(ctx, err);
        }
        group.notify_finally(ctx);
        outcome?;
    }

    in_flight.join(target).await
}

async fn run_group(
    target: &str,
    groups: &[TaskGroup],
    index: usize,
    in_flight: &mut InFlight,
    ctx: &TaskContext,
) -> Result<()> {
    for (position, entry) in groups[index].tasks().iter().enumerate() {
        let label = entry.task.describe();
        info!(target_name = %target, task = %label, mode = %entry.mode, "executing task");

        let work = supervise(
            target.to_string(),
            label,
            Arc::clone(&entry.task).run_async(ctx.clone()),
        );

        match entry.mode {
            ExecutionMode::Synchronous => {
                debug_assert_eq!(in_flight.len(), 0, "synchronous task started with parallel work pending");
                work.await?;
            }
            ExecutionMode::Parallel => {
                in_flight.spawn(work);
                if must_join(next_task_mode(groups, index, position)) {
                    in_flight.join(target).await?;
                }
            }
        }
    }
    Ok(())
}

/// Run `deps` of `target` with the same join-point rule used for tasks.
pub(crate) async fn run_dependency_batch(
    tree: &Arc<TargetTree>,
    target: &str,
    deps: &[(TargetName, ExecutionMode)],
    ctx: &TaskContext,
) -> Result<()> {
    let mut in_flight = InFlight::new();

    for (position, (dep, mode)) in deps.iter().enumerate() {
        let run = Arc::clone(tree).run_once(dep.clone(), ctx.clone(), false);
        match mode {
            ExecutionMode::Synchronous => run.await?,
            ExecutionMode::Parallel => {
                in_flight.spawn(run);
                if must_join(deps.get(position + 1).map(|(_, m)| *m)) {
                    in_flight.join(target).await?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::FnTask;

    fn group(modes: &[ExecutionMode]) -> TaskGroup {
        let mut g = TaskGroup::new();
        for mode in modes {
            g.push(Arc::new(FnTask::new("t", |_ctx: &TaskContext| Ok(()))), *mode);
        }
        g
    }

    use crate::types::ExecutionMode::{Parallel as P, Synchronous as S};

    #[test]
    fn lookahead_stays_inside_group_when_possible() {
        let groups = vec![group(&[P, P, S])];
        assert_eq!(next_task_mode(&groups, 0, 0), Some(P));
        assert_eq!(next_task_mode(&groups, 0, 1), Some(S));
        assert_eq!(next_task_mode(&groups, 0, 2), None);
    }

    #[test]
    fn lookahead_crosses_into_next_non_empty_group() {
        let groups = vec![group(&[S, P]), group(&[]), group(&[S])];
        assert_eq!(next_task_mode(&groups, 0, 1), Some(S));
        assert!(must_join(next_task_mode(&groups, 0, 1)));

        let spanning = vec![group(&[P]), group(&[P])];
        assert!(!must_join(next_task_mode(&spanning, 0, 0)));
        assert!(must_join(next_task_mode(&spanning, 1, 0)));
    }
}
