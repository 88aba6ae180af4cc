// src/target/tree.rs

//! Registry of targets and the execute-once bookkeeping for a build run.
//!
//! Every target gets one slot in `executed`. The first caller to reach a
//! slot runs the target and records the outcome; concurrent callers (two
//! parallel dependency branches sharing an ancestor) wait on the same slot
//! and observe that outcome instead of running the target a second time.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::context::TaskContext;
use crate::errors::{BuildError, Result};
use crate::target::{Target, TargetDefinition, batch, validate};
use crate::types::TargetName;

/// Name of the built-in listing target used when nothing else applies.
pub const HELP_TARGET: &str = "help";

type RunFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Execution slot of one target. `true` once it ran (or was listed by a dry
/// run), `false` if its run failed.
type Slot = Arc<OnceCell<bool>>;

#[derive(Debug, Default)]
pub struct TargetTree {
    targets: HashMap<TargetName, Arc<Target>>,
    /// Registration order, used for listings.
    order: Vec<TargetName>,
    default_target: Mutex<Option<TargetName>>,
    executed: Mutex<HashMap<TargetName, Slot>>,
}

impl TargetTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalize `definition` and add it to the tree.
    pub fn register(&mut self, definition: TargetDefinition) -> Result<Arc<Target>> {
        if self.targets.contains_key(definition.name()) {
            return Err(BuildError::DuplicateTarget(definition.name().to_string()));
        }

        let wants_default = definition.wants_default();
        let target = Arc::new(definition.build()?);
        let name = target.name().to_string();

        debug!(target_name = %name, deps = target.dependencies().len(), "registered target");

        self.order.push(name.clone());
        self.targets.insert(name.clone(), Arc::clone(&target));
        if wants_default {
            self.set_default_target(&name)?;
        }
        Ok(target)
    }

    /// Declare a target through a closure and register it.
    pub fn add_target<F>(&mut self, name: impl Into<TargetName>, configure: F) -> Result<Arc<Target>>
    where
        F: FnOnce(&mut TargetDefinition),
    {
        let mut definition = TargetDefinition::new(name);
        configure(&mut definition);
        self.register(definition)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Target>> {
        self.targets.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Targets in registration order.
    pub fn targets(&self) -> impl Iterator<Item = &Arc<Target>> {
        self.order.iter().filter_map(|name| self.targets.get(name))
    }

    /// Last writer wins.
    pub fn set_default_target(&self, name: &str) -> Result<()> {
        if !self.contains(name) {
            return Err(BuildError::UnknownTarget(name.to_string()));
        }
        *lock(&self.default_target) = Some(name.to_string());
        Ok(())
    }

    pub fn default_target(&self) -> Option<TargetName> {
        lock(&self.default_target).clone()
    }

    /// Record that `name` has been entered. Idempotent.
    pub fn mark_executed(&self, name: &str) {
        self.slot(name);
    }

    pub fn is_executed(&self, name: &str) -> bool {
        lock(&self.executed).contains_key(name)
    }

    /// Names of every target entered so far, sorted.
    pub fn executed_targets(&self) -> Vec<TargetName> {
        let mut names: Vec<TargetName> = lock(&self.executed).keys().cloned().collect();
        names.sort();
        names
    }

    /// Check every registered target for unknown dependencies and cycles.
    pub fn validate(&self) -> Result<()> {
        validate::validate_all(&self.targets)
    }

    /// Check only what `name` needs.
    pub fn validate_from(&self, name: &str) -> Result<()> {
        validate::validate_from(&self.targets, [name])
    }

    /// Dependency-first order in which `name` and its dependencies would run.
    pub fn execution_order(&self, name: &str) -> Result<Vec<TargetName>> {
        self.validate_from(name)?;
        Ok(validate::execution_order(&self.targets, name))
    }

    /// Make sure every dependency of `name` has run, without running `name`.
    pub async fn ensure_dependencies_executed(
        self: &Arc<Self>,
        ctx: &TaskContext,
        name: &str,
    ) -> Result<()> {
        let target = self
            .get(name)
            .ok_or_else(|| BuildError::UnknownTarget(name.to_string()))?;
        self.validate_from(name)?;
        self.resolve_dependencies(&target, &ctx.for_target(name)).await
    }

    pub(crate) async fn resolve_dependencies(
        self: &Arc<Self>,
        target: &Target,
        ctx: &TaskContext,
    ) -> Result<()> {
        if target.dependencies().is_empty() {
            return Ok(());
        }
        if ctx.no_dependencies() {
            info!(target_name = %target.name(), "skipping target dependencies");
            return Ok(());
        }
        batch::run_dependency_batch(self, target.name(), target.dependencies(), ctx).await
    }

    /// Run `name` directly, as a requested target.
    pub async fn run_target(self: &Arc<Self>, ctx: &TaskContext, name: &str) -> Result<()> {
        self.validate_from(name)?;
        Arc::clone(self).run_once(name.to_string(), ctx.clone(), true).await
    }

    /// Run each requested target in order, stopping at the first failure.
    pub async fn run_targets<I, S>(self: &Arc<Self>, ctx: &TaskContext, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.run_target(ctx, name.as_ref()).await?;
        }
        Ok(())
    }

    /// Run a target unless it already ran in this build run.
    ///
    /// The returned future is boxed to break the recursion through
    /// dependency resolution.
    pub(crate) fn run_once(
        self: Arc<Self>,
        name: TargetName,
        ctx: TaskContext,
        direct: bool,
    ) -> RunFuture {
        Box::pin(async move {
            let target = self
                .get(&name)
                .ok_or_else(|| BuildError::UnknownTarget(name.clone()))?;
            let slot = self.slot(&name);
            let requester = ctx.current_target().unwrap_or("-").to_string();

            if let Some(&succeeded) = slot.get() {
                if succeeded {
                    debug!(target_name = %name, requested_by = %requester, "target already executed, skipping");
                    return Ok(());
                }
                return Err(BuildError::DependencyFailed {
                    target: requester,
                    dependency: name,
                });
            }

            let mut own_failure = None;
            let failure = &mut own_failure;
            let (tree, target, run_ctx) = (&self, &target, &ctx);
            let succeeded = *slot
                .get_or_init(|| async move {
                    match target.execute(tree, run_ctx, direct).await {
                        Ok(()) => true,
                        Err(err) => {
                            *failure = Some(err);
                            false
                        }
                    }
                })
                .await;

            match (succeeded, own_failure) {
                (true, _) => Ok(()),
                (false, Some(err)) => Err(err),
                // Another branch ran it and failed; that branch reports the cause.
                (false, None) => Err(BuildError::DependencyFailed {
                    target: requester,
                    dependency: name,
                }),
            }
        })
    }

    /// One line per visible target, in registration order.
    pub fn help_lines(&self) -> Vec<String> {
        let default = self.default_target();
        let width = self
            .targets()
            .filter(|t| !t.is_hidden())
            .map(|t| t.name().len())
            .max()
            .unwrap_or(0);

        self.targets()
            .filter(|t| !t.is_hidden())
            .map(|t| {
                let marker = if default.as_deref() == Some(t.name()) { " (default)" } else { "" };
                match t.description() {
                    Some(desc) => format!("  {:<width$}  {desc}{marker}", t.name()),
                    None => format!("  {}{marker}", t.name()),
                }
            })
            .collect()
    }

    /// Log the target listing through the context.
    pub fn log_help(&self, ctx: &TaskContext) {
        ctx.log_info("Targets:");
        for line in self.help_lines() {
            ctx.log_info(line);
        }
    }

    /// Log what `name` would execute and mark it as done, so a dry run over
    /// an execution order lists each target once.
    pub fn target_help(&self, ctx: &TaskContext, name: &str) -> Result<()> {
        let target = self
            .get(name)
            .ok_or_else(|| BuildError::UnknownTarget(name.to_string()))?;
        let _ = self.slot(name).set(true);

        let ctx = ctx.for_target(name);
        ctx.log_info(format!("Target {name} will execute next tasks:"));
        if !target.dependencies().is_empty() {
            let deps: Vec<String> = target
                .dependencies()
                .iter()
                .map(|(dep, mode)| format!("{dep} ({mode})"))
                .collect();
            ctx.log_info(format!("  depends on: {}", deps.join(", ")));
        }
        for line in target.task_descriptions() {
            ctx.log_info(format!("  {line}"));
        }
        Ok(())
    }

    fn slot(&self, name: &str) -> Slot {
        let mut executed = lock(&self.executed);
        Arc::clone(executed.entry(name.to_string()).or_default())
    }
}

// Poisoning only happens if a holder panicked; the maps stay consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
