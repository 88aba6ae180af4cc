// crates/test-utils/src/builders.rs

#![allow(dead_code)]

use std::sync::Arc;

use buildrig::target::TargetTree;
use buildrig::types::ExecutionMode;

use crate::recorder::EventLog;

/// Builder for a `TargetTree` whose targets each run one recording task
/// labelled with the target's name.
pub struct TreeBuilder {
    tree: TargetTree,
    log: EventLog,
}

impl TreeBuilder {
    pub fn new(log: &EventLog) -> Self {
        Self {
            tree: TargetTree::new(),
            log: log.clone(),
        }
    }

    /// Target with synchronous dependencies.
    pub fn target(self, name: &str, deps: &[&str]) -> Self {
        let deps: Vec<(&str, ExecutionMode)> = deps
            .iter()
            .map(|d| (*d, ExecutionMode::Synchronous))
            .collect();
        self.target_with(name, &deps)
    }

    /// Target with per-dependency modes.
    pub fn target_with(mut self, name: &str, deps: &[(&str, ExecutionMode)]) -> Self {
        let task = self.log.sleeping_task(name, 5);
        self.tree
            .add_target(name, |t| {
                for (dep, mode) in deps {
                    t.depends_on_with([*dep], *mode);
                }
                t.add_task(task, ExecutionMode::Synchronous);
            })
            .expect("Failed to register target from builder");
        self
    }

    pub fn default_target(self, name: &str) -> Self {
        self.tree
            .set_default_target(name)
            .expect("Default target must be registered first");
        self
    }

    pub fn build(self) -> Arc<TargetTree> {
        Arc::new(self.tree)
    }

    pub fn into_tree(self) -> TargetTree {
        self.tree
    }
}
