// src/target/definition.rs

//! Builder that accumulates a target's declarations before it is registered.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use crate::context::TaskContext;
use crate::errors::{BuildError, Result};
use crate::target::Target;
use crate::task::{AsyncFnTask, FnTask, GroupHandle, GroupId, Task, TaskGroup};
use crate::types::{ExecutionMode, TargetName};

/// Mutable declaration of a target.
///
/// Nothing here is validated until [`TargetTree::register`] finalizes the
/// definition into an immutable [`Target`].
///
/// [`TargetTree::register`]: crate::target::TargetTree::register
#[derive(Debug)]
pub struct TargetDefinition {
    name: TargetName,
    description: Option<String>,
    hidden: bool,
    set_as_default: bool,
    dependencies: Vec<(TargetName, ExecutionMode)>,
    groups: Vec<TaskGroup>,
}

impl TargetDefinition {
    pub fn new(name: impl Into<TargetName>) -> Self {
        Self {
            name: name.into(),
            description: None,
            hidden: false,
            set_as_default: false,
            dependencies: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Hide the target from help listings. It stays executable.
    pub fn set_as_hidden(&mut self) -> &mut Self {
        self.hidden = true;
        self
    }

    /// Make this the target run when none is named explicitly.
    pub fn set_as_default(&mut self) -> &mut Self {
        self.set_as_default = true;
        self
    }

    /// Declare dependencies that run one after another.
    pub fn depends_on<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TargetName>,
    {
        self.depends_on_with(names, ExecutionMode::Synchronous)
    }

    /// Declare dependencies that may run concurrently with their siblings.
    pub fn depends_on_parallel<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TargetName>,
    {
        self.depends_on_with(names, ExecutionMode::Parallel)
    }

    pub fn depends_on_with<I, S>(&mut self, names: I, mode: ExecutionMode) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TargetName>,
    {
        self.dependencies
            .extend(names.into_iter().map(|name| (name.into(), mode)));
        self
    }

    /// Add a task in its own fresh group.
    pub fn add_task(&mut self, task: impl Task, mode: ExecutionMode) -> &mut Self {
        self.add_shared_task(None, Arc::new(task), mode);
        self
    }

    /// Core placement rule for a task:
    ///
    /// - no group: a fresh group holding only this task is appended;
    /// - a group id not yet on this target: a new group with that id is
    ///   appended;
    /// - a known group id: the task is appended to that existing group.
    pub fn add_shared_task(
        &mut self,
        group: Option<&GroupHandle>,
        task: Arc<dyn Task>,
        mode: ExecutionMode,
    ) -> GroupHandle {
        let id = match group {
            Some(handle) => handle.id.clone(),
            None => GroupId::fresh(),
        };

        match self.groups.iter_mut().find(|g| *g.id() == id) {
            Some(existing) => existing.push(task, mode),
            None => {
                let mut fresh = TaskGroup::with_id(id.clone());
                fresh.push(task, mode);
                self.groups.push(fresh);
            }
        }

        GroupHandle { id }
    }

    /// Register `group` (or merge it into the group already using its id) and
    /// return a handle for appending more tasks to it later.
    pub fn start_group(&mut self, group: TaskGroup) -> GroupHandle {
        let id = group.id().clone();
        match self.groups.iter_mut().find(|g| *g.id() == id) {
            Some(existing) => existing.absorb(group),
            None => self.groups.push(group),
        }
        GroupHandle { id }
    }

    pub fn add_to_group(
        &mut self,
        group: &GroupHandle,
        task: impl Task,
        mode: ExecutionMode,
    ) -> &mut Self {
        self.add_shared_task(Some(group), Arc::new(task), mode);
        self
    }

    /// Bind a closure as a synchronous task.
    pub fn do_task<F>(&mut self, description: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&TaskContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_task(FnTask::new(description, f), ExecutionMode::Synchronous)
    }

    /// Bind a closure as a parallel task.
    pub fn do_task_parallel<F>(&mut self, description: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&TaskContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_task(FnTask::new(description, f), ExecutionMode::Parallel)
    }

    /// Bind an async closure with the given mode.
    pub fn do_async<F, Fut>(
        &mut self,
        description: impl Into<String>,
        mode: ExecutionMode,
        f: F,
    ) -> &mut Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_task(AsyncFnTask::new(description, f), mode)
    }

    pub(crate) fn wants_default(&self) -> bool {
        self.set_as_default
    }

    /// Finalize into an immutable [`Target`].
    pub(crate) fn build(self) -> Result<Target> {
        let mut seen = HashSet::new();
        for (dep, _) in &self.dependencies {
            if !seen.insert(dep.as_str()) {
                return Err(BuildError::DuplicateDependency {
                    target: self.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }

        Ok(Target {
            name: self.name,
            description: self.description,
            hidden: self.hidden,
            dependencies: self.dependencies,
            task_groups: self.groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(target: &Target) -> Vec<Vec<String>> {
        target
            .task_groups()
            .iter()
            .map(|g| g.tasks().iter().map(|e| e.task.describe()).collect())
            .collect()
    }

    fn noop(name: &str) -> FnTask<impl Fn(&TaskContext) -> anyhow::Result<()> + Send + Sync + 'static> {
        FnTask::new(name, |_ctx: &TaskContext| Ok(()))
    }

    #[test]
    fn plain_add_task_creates_one_group_per_task() {
        let mut def = TargetDefinition::new("build");
        def.add_task(noop("a"), ExecutionMode::Synchronous)
            .add_task(noop("b"), ExecutionMode::Parallel);

        let target = def.build().unwrap();
        assert_eq!(names(&target), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn appending_by_handle_merges_into_one_group() {
        let mut def = TargetDefinition::new("build");
        let pack = def.start_group(TaskGroup::with_id("pack"));
        def.add_to_group(&pack, noop("a"), ExecutionMode::Parallel);
        def.add_task(noop("between"), ExecutionMode::Synchronous);
        def.add_to_group(&pack, noop("b"), ExecutionMode::Synchronous);

        let target = def.build().unwrap();
        assert_eq!(names(&target), vec![vec!["a", "b"], vec!["between"]]);
    }

    #[test]
    fn restarting_a_known_group_id_does_not_duplicate_it() {
        let mut def = TargetDefinition::new("build");
        let mut first = TaskGroup::with_id("g");
        first.push(Arc::new(noop("a")), ExecutionMode::Synchronous);
        def.start_group(first);

        let mut again = TaskGroup::with_id("g");
        again.push(Arc::new(noop("b")), ExecutionMode::Synchronous);
        def.start_group(again);

        let target = def.build().unwrap();
        assert_eq!(names(&target), vec![vec!["a", "b"]]);
    }

    #[test]
    fn duplicate_dependency_is_rejected() {
        let mut def = TargetDefinition::new("package");
        def.depends_on(["compile"]).depends_on_parallel(["compile"]);

        match def.build() {
            Err(BuildError::DuplicateDependency { target, dependency }) => {
                assert_eq!(target, "package");
                assert_eq!(dependency, "compile");
            }
            other => panic!("expected DuplicateDependency, got {other:?}"),
        }
    }

    #[test]
    fn dependencies_keep_declaration_order_and_mode() {
        let mut def = TargetDefinition::new("release");
        def.depends_on(["clean"])
            .depends_on_parallel(["docs", "tests"])
            .depends_on(["package"]);

        let target = def.build().unwrap();
        let deps: Vec<(&str, ExecutionMode)> = target
            .dependencies()
            .iter()
            .map(|(n, m)| (n.as_str(), *m))
            .collect();
        assert_eq!(
            deps,
            vec![
                ("clean", ExecutionMode::Synchronous),
                ("docs", ExecutionMode::Parallel),
                ("tests", ExecutionMode::Parallel),
                ("package", ExecutionMode::Synchronous),
            ]
        );
    }
}
