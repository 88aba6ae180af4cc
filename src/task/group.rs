// src/task/group.rs

//! Task groups: ordered (task, mode) batches sharing error/finally hooks.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::TaskContext;
use crate::errors::BuildError;
use crate::task::Task;
use crate::types::ExecutionMode;

/// Hook invoked once with the triggering error when a group fails.
pub type ErrorHook = Arc<dyn Fn(&TaskContext, &BuildError) + Send + Sync>;

/// Hook invoked exactly once when a group finishes, successfully or not.
pub type FinallyHook = Arc<dyn Fn(&TaskContext) + Send + Sync>;

static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a task group within a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupId(String);

impl GroupId {
    /// A process-wide unique id.
    pub fn fresh() -> Self {
        let n = NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed);
        GroupId(format!("group-{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        GroupId(s.to_string())
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        GroupId(s)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle returned by `TargetDefinition::start_group`; pass it back to
/// append further tasks to the same logical group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHandle {
    pub(crate) id: GroupId,
}

impl GroupHandle {
    pub fn id(&self) -> &GroupId {
        &self.id
    }
}

/// A task together with the mode it was placed with.
#[derive(Clone)]
pub struct TaskEntry {
    pub task: Arc<dyn Task>,
    pub mode: ExecutionMode,
}

impl fmt::Debug for TaskEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskEntry")
            .field("task", &self.task.describe())
            .field("mode", &self.mode)
            .finish()
    }
}

/// Ordered batch of tasks; insertion order is execution order.
#[derive(Clone)]
pub struct TaskGroup {
    id: GroupId,
    tasks: Vec<TaskEntry>,
    on_error: Option<ErrorHook>,
    on_finally: Option<FinallyHook>,
}

impl TaskGroup {
    /// Empty group with a freshly generated id.
    pub fn new() -> Self {
        Self::with_id(GroupId::fresh())
    }

    pub fn with_id(id: impl Into<GroupId>) -> Self {
        Self {
            id: id.into(),
            tasks: Vec::new(),
            on_error: None,
            on_finally: None,
        }
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TaskContext, &BuildError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn on_finally<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TaskContext) + Send + Sync + 'static,
    {
        self.on_finally = Some(Arc::new(hook));
        self
    }

    /// Append a task; the only supported mutation once tasks exist.
    pub fn push(&mut self, task: Arc<dyn Task>, mode: ExecutionMode) {
        self.tasks.push(TaskEntry { task, mode });
    }

    /// Merge `other` into this group: its tasks are appended in order and its
    /// hooks fill in any hook this group does not have yet.
    pub(crate) fn absorb(&mut self, other: TaskGroup) {
        self.tasks.extend(other.tasks);
        if self.on_error.is_none() {
            self.on_error = other.on_error;
        }
        if self.on_finally.is_none() {
            self.on_finally = other.on_finally;
        }
    }

    pub fn id(&self) -> &GroupId {
        &self.id
    }

    pub fn tasks(&self) -> &[TaskEntry] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn notify_error(&self, ctx: &TaskContext, err: &BuildError) {
        if let Some(hook) = &self.on_error {
            hook(ctx, err);
        }
    }

    pub(crate) fn notify_finally(&self, ctx: &TaskContext) {
        if let Some(hook) = &self.on_finally {
            hook(ctx);
        }
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGroup")
            .field("id", &self.id)
            .field("tasks", &self.tasks)
            .field("on_error", &self.on_error.is_some())
            .field("on_finally", &self.on_finally.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::FnTask;

    fn noop(name: &str) -> Arc<dyn Task> {
        Arc::new(FnTask::new(name, |_ctx: &TaskContext| Ok(())))
    }

    #[test]
    fn fresh_ids_are_unique() {
        assert_ne!(TaskGroup::new().id(), TaskGroup::new().id());
    }

    #[test]
    fn absorb_appends_and_keeps_existing_hooks() {
        let mut first = TaskGroup::with_id("pack").on_finally(|_ctx| {});
        first.push(noop("a"), ExecutionMode::Synchronous);

        let mut second = TaskGroup::with_id("pack").on_error(|_ctx, _err| {});
        second.push(noop("b"), ExecutionMode::Parallel);

        first.absorb(second);

        let names: Vec<String> = first.tasks().iter().map(|e| e.task.describe()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(first.on_error.is_some());
        assert!(first.on_finally.is_some());
    }
}
