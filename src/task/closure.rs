// src/task/closure.rs

//! Closure-backed tasks.
//!
//! A closure captures its own parameters, so a single generic wrapper covers
//! what would otherwise be a family of "task with N arguments" types:
//!
//! ```rust,no_run
//! use buildrig::task::FnTask;
//!
//! let out_dir = String::from("target/out");
//! let task = FnTask::new("create output dir", move |_ctx| {
//!     std::fs::create_dir_all(&out_dir)?;
//!     Ok(())
//! });
//! # let _ = task;
//! ```

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;

use crate::context::TaskContext;
use crate::task::{Task, TaskFuture};

/// Task backed by a blocking closure.
pub struct FnTask<F> {
    description: String,
    f: F,
}

impl<F> FnTask<F>
where
    F: Fn(&TaskContext) -> anyhow::Result<()> + Send + Sync + 'static,
{
    pub fn new(description: impl Into<String>, f: F) -> Self {
        Self {
            description: description.into(),
            f,
        }
    }
}

impl<F> Task for FnTask<F>
where
    F: Fn(&TaskContext) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn run(&self, ctx: &TaskContext) -> anyhow::Result<()> {
        (self.f)(ctx)
    }
}

/// Task backed by a closure returning a future.
///
/// The engine drives it natively on the async runtime. Calling [`Task::run`]
/// directly spins up a private current-thread runtime, so it must not be
/// called from inside an async context.
pub struct AsyncFnTask<F> {
    description: String,
    f: F,
}

impl<F, Fut> AsyncFnTask<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    pub fn new(description: impl Into<String>, f: F) -> Self {
        Self {
            description: description.into(),
            f,
        }
    }
}

impl<F, Fut> Task for AsyncFnTask<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn run(&self, ctx: &TaskContext) -> anyhow::Result<()> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building runtime for synchronous execution of async task")?;
        rt.block_on((self.f)(ctx.clone()))
    }

    fn run_async(self: Arc<Self>, ctx: TaskContext) -> TaskFuture {
        Box::pin((self.f)(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fn_task_sees_context_properties() {
        let ctx = TaskContext::new();
        ctx.properties().set("version", "2.0.0");

        let task = Arc::new(FnTask::new("read version", |ctx: &TaskContext| {
            let version = ctx
                .properties()
                .get("version")
                .context("version property missing")?;
            ctx.properties().set("seen", version);
            Ok(())
        }));

        task.run_async(ctx.clone()).await.unwrap();
        assert_eq!(ctx.properties().get("seen").as_deref(), Some("2.0.0"));
    }

    #[tokio::test]
    async fn async_fn_task_runs_natively() {
        let task = Arc::new(AsyncFnTask::new("sleepy", |ctx: TaskContext| async move {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            ctx.properties().set("done", "yes");
            Ok(())
        }));
        let ctx = TaskContext::new();

        task.clone().run_async(ctx.clone()).await.unwrap();

        assert_eq!(ctx.properties().get("done").as_deref(), Some("yes"));
        assert_eq!(task.describe(), "sleepy");
    }

    #[test]
    fn async_fn_task_can_run_blocking_outside_runtime() {
        let task = AsyncFnTask::new("blocking", |_ctx: TaskContext| async { Ok(()) });
        task.run(&TaskContext::new()).unwrap();
    }
}
