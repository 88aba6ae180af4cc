// src/task/mod.rs

//! The uniform task contract and the tasks shipped with the engine.
//!
//! - [`Task`] is what a target schedules: a description plus synchronous and
//!   asynchronous execution entry points.
//! - [`closure`] binds plain Rust closures as tasks, capturing whatever
//!   parameters they need.
//! - [`group`] holds ordered (task, mode) batches with their error/finally
//!   hooks.
//! - [`shell`] runs a shell command through `tokio::process`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::anyhow;

use crate::context::TaskContext;

pub mod closure;
pub mod group;
pub mod shell;

pub use closure::{AsyncFnTask, FnTask};
pub use group::{GroupHandle, GroupId, TaskEntry, TaskGroup};
pub use shell::ShellTask;

/// Boxed future returned by [`Task::run_async`].
pub type TaskFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// A unit of work that can be placed in a [`TaskGroup`].
///
/// The engine always drives tasks through [`Task::run_async`]. The default
/// implementation moves the blocking [`Task::run`] onto Tokio's blocking
/// pool, so purely synchronous tasks only implement `run`. Natively async
/// tasks override `run_async`.
pub trait Task: Send + Sync + 'static {
    /// Human-readable description used in logs and target help.
    fn describe(&self) -> String;

    /// Run the task to completion on the calling thread.
    fn run(&self, ctx: &TaskContext) -> anyhow::Result<()>;

    /// Run the task without blocking the driver.
    fn run_async(self: Arc<Self>, ctx: TaskContext) -> TaskFuture {
        Box::pin(async move {
            tokio::task::spawn_blocking(move || self.run(&ctx))
                .await
                .map_err(|e| anyhow!("task did not complete: {e}"))?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    impl Task for Counting {
        fn describe(&self) -> String {
            "counting".into()
        }

        fn run(&self, _ctx: &TaskContext) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn default_run_async_delegates_to_run() {
        let hits = Arc::new(AtomicUsize::new(0));
        let task: Arc<dyn Task> = Arc::new(Counting(hits.clone()));

        task.run_async(TaskContext::new()).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
