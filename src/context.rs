// src/context.rs

//! Per-run session and the context handed to every task.
//!
//! - [`BuildProperties`] is the shared key-value store tasks read and write
//!   (e.g. a version number computed by one target and consumed by another).
//! - [`TaskSession`] is what the runner hands to a build script: parsed
//!   script arguments plus run-wide options.
//! - [`TaskContext`] is the cheap-to-clone view a task receives. It also acts
//!   as the logging sink: messages are emitted through `tracing`, tagged with
//!   the target currently executing.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::{error, info, warn};

use crate::types::TargetName;

/// Thread-safe build-properties store shared by every task of a run.
#[derive(Debug, Clone, Default)]
pub struct BuildProperties {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

impl BuildProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: BTreeMap<String, String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    /// Set a property, returning the previous value if there was one.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.write().insert(key.into(), value.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Point-in-time copy of all properties.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.read().clone()
    }

    // A poisoned lock only means a task panicked mid-write; the map itself is
    // still a valid map, so keep serving it.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Session handed to a build script by the runner.
#[derive(Debug, Clone, Default)]
pub struct TaskSession {
    /// `KEY=VALUE` arguments given after the target names on the command line.
    pub script_args: BTreeMap<String, String>,
    /// Targets requested on the command line (empty = use the default target).
    pub main_targets: Vec<TargetName>,
    /// If set, only these targets may be invoked directly.
    pub targets_to_execute: Option<Vec<TargetName>>,
    /// Skip dependency resolution entirely.
    pub no_dependencies: bool,
    /// Log what each target would execute instead of running it.
    pub dry_run: bool,
    pub properties: BuildProperties,
}

impl TaskSession {
    /// Root context for a run driven by this session.
    pub fn context(&self) -> TaskContext {
        TaskContext {
            properties: self.properties.clone(),
            script_args: Arc::new(self.script_args.clone()),
            targets_to_execute: self
                .targets_to_execute
                .as_ref()
                .map(|names| Arc::from(names.as_slice())),
            no_dependencies: self.no_dependencies,
            current_target: None,
        }
    }
}

/// Context passed to tasks, group hooks and targets while a run is active.
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    properties: BuildProperties,
    script_args: Arc<BTreeMap<String, String>>,
    targets_to_execute: Option<Arc<[TargetName]>>,
    no_dependencies: bool,
    current_target: Option<TargetName>,
}

impl TaskContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict direct target invocation to the given names.
    pub fn with_targets_to_execute<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TargetName>,
    {
        let names: Vec<TargetName> = names.into_iter().map(Into::into).collect();
        self.targets_to_execute = Some(Arc::from(names));
        self
    }

    pub fn with_no_dependencies(mut self, no_dependencies: bool) -> Self {
        self.no_dependencies = no_dependencies;
        self
    }

    pub fn with_properties(mut self, properties: BuildProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Clone of this context scoped to `target` (used for log tagging).
    pub fn for_target(&self, target: &str) -> Self {
        let mut ctx = self.clone();
        ctx.current_target = Some(target.to_string());
        ctx
    }

    pub fn properties(&self) -> &BuildProperties {
        &self.properties
    }

    pub fn script_arg(&self, key: &str) -> Option<&str> {
        self.script_args.get(key).map(String::as_str)
    }

    pub fn targets_to_execute(&self) -> Option<&[TargetName]> {
        self.targets_to_execute.as_deref()
    }

    pub fn no_dependencies(&self) -> bool {
        self.no_dependencies
    }

    pub fn current_target(&self) -> Option<&str> {
        self.current_target.as_deref()
    }

    pub fn log_info(&self, message: impl fmt::Display) {
        info!(target_name = self.target_label(), "{message}");
    }

    pub fn log_warn(&self, message: impl fmt::Display) {
        warn!(target_name = self.target_label(), "{message}");
    }

    pub fn log_error(&self, message: impl fmt::Display) {
        error!(target_name = self.target_label(), "{message}");
    }

    fn target_label(&self) -> &str {
        self.current_target.as_deref().unwrap_or("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_are_shared_between_clones() {
        let ctx = TaskContext::new();
        let other = ctx.for_target("compile");

        other.properties().set("version", "1.2.3");

        assert_eq!(ctx.properties().get("version").as_deref(), Some("1.2.3"));
        assert_eq!(other.current_target(), Some("compile"));
        assert_eq!(ctx.current_target(), None);
    }

    #[test]
    fn session_context_carries_run_options() {
        let mut session = TaskSession {
            targets_to_execute: Some(vec!["build".into()]),
            no_dependencies: true,
            ..TaskSession::default()
        };
        session.script_args.insert("mode".into(), "release".into());

        let ctx = session.context();
        assert_eq!(ctx.targets_to_execute(), Some(&["build".to_string()][..]));
        assert!(ctx.no_dependencies());
        assert_eq!(ctx.script_arg("mode"), Some("release"));
    }
}
