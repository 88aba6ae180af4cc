// src/script/declared.rs

//! Build script backed by a TOML build description.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::loader::load_and_validate;
use crate::config::model::{ConfigFile, GroupConfig, TargetConfig};
use crate::context::{TaskContext, TaskSession};
use crate::errors::Result;
use crate::script::{BuildScript, ScriptFuture, run_tree};
use crate::target::{TargetDefinition, TargetTree};
use crate::task::{GroupHandle, ShellTask, Task, TaskGroup};

/// Every `[target.<name>]` becomes a target and every task a [`ShellTask`].
#[derive(Debug, Clone)]
pub struct DeclaredScript {
    path: Option<PathBuf>,
    config: ConfigFile,
}

impl DeclaredScript {
    pub fn new(config: ConfigFile) -> Self {
        Self { path: None, config }
    }

    /// Load and validate the description at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = load_and_validate(path)?;
        debug!(path = %path.display(), targets = config.target.len(), "loaded build description");
        Ok(Self {
            path: Some(path.to_path_buf()),
            config,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Register every declared target into a fresh tree.
    pub fn build_tree(&self) -> Result<TargetTree> {
        let mut tree = TargetTree::new();
        for (name, target) in &self.config.target {
            tree.register(declare_target(name, target))?;
        }
        if let Some(name) = self.config.default_target() {
            tree.set_default_target(name)?;
        }
        Ok(tree)
    }

    /// Seed the session's properties: description values first, then
    /// `KEY=VALUE` script arguments, which win. Values already present in the
    /// session are kept.
    fn seed_properties(&self, session: &TaskSession) {
        for (key, value) in &self.config.properties {
            if !session.properties.contains(key) {
                session.properties.set(key.as_str(), value.as_str());
            }
        }
        for (key, value) in &session.script_args {
            session.properties.set(key.as_str(), value.as_str());
        }
    }
}

impl BuildScript for DeclaredScript {
    fn run(&self, session: TaskSession) -> ScriptFuture<'_> {
        Box::pin(async move {
            self.seed_properties(&session);
            let tree = self.build_tree()?;
            run_tree(tree, &session).await
        })
    }
}

fn declare_target(name: &str, cfg: &TargetConfig) -> TargetDefinition {
    let mut def = TargetDefinition::new(name);
    if let Some(description) = &cfg.description {
        def.description(description.as_str());
    }
    if cfg.hidden {
        def.set_as_hidden();
    }
    if cfg.default {
        def.set_as_default();
    }
    for dep in &cfg.depends_on {
        def.depends_on_with([dep.name()], dep.mode());
    }

    let mut handles: HashMap<&str, GroupHandle> = HashMap::new();
    for task in &cfg.task {
        let mut shell = ShellTask::new(task.cmd.as_str());
        if let Some(description) = &task.description {
            shell = shell.with_description(description.as_str());
        }

        match task.group.as_deref() {
            None => {
                def.add_task(shell, task.mode);
            }
            Some(group) => {
                let handle = handles.entry(group).or_insert_with(|| {
                    def.start_group(group_with_hooks(group, cfg.group.get(group)))
                });
                def.add_to_group(handle, shell, task.mode);
            }
        }
    }
    def
}

fn group_with_hooks(id: &str, hooks: Option<&GroupConfig>) -> TaskGroup {
    let mut group = TaskGroup::with_id(id);
    let Some(hooks) = hooks else {
        return group;
    };

    if let Some(cmd) = hooks.on_error.clone() {
        group = group.on_error(move |ctx, err| {
            ctx.log_warn(format!("running on_error hook after: {err}"));
            run_hook(&cmd, ctx);
        });
    }
    if let Some(cmd) = hooks.on_finally.clone() {
        group = group.on_finally(move |ctx| run_hook(&cmd, ctx));
    }
    group
}

// Hook failures are logged, never propagated: they must not mask the
// failure that triggered them.
fn run_hook(cmd: &str, ctx: &TaskContext) {
    if let Err(err) = ShellTask::new(cmd).run(ctx) {
        warn!(
            target_name = ctx.current_target().unwrap_or("-"),
            hook = %cmd,
            error = %err,
            "group hook failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::RawConfigFile;

    fn script(src: &str) -> DeclaredScript {
        let raw: RawConfigFile = toml::from_str(src).unwrap();
        DeclaredScript::new(ConfigFile::try_from(raw).unwrap())
    }

    #[test]
    fn tasks_sharing_a_group_id_are_merged() {
        let script = script(
            r#"
            [target.pack]
            [[target.pack.task]]
            cmd = "echo a"
            group = "zip"
            mode = "parallel"
            [[target.pack.task]]
            cmd = "echo between"
            [[target.pack.task]]
            cmd = "echo b"
            group = "zip"
            "#,
        );
        let tree = script.build_tree().unwrap();
        let target = tree.get("pack").unwrap();

        let sizes: Vec<usize> = target.task_groups().iter().map(|g| g.len()).collect();
        assert_eq!(sizes, vec![2, 1]);
        assert_eq!(target.task_groups()[0].id().as_str(), "zip");
    }

    #[test]
    fn settings_default_target_wins_over_flag() {
        let script = script(
            r#"
            [settings]
            default_target = "b"
            [target.a]
            default = true
            [target.b]
            "#,
        );
        let tree = script.build_tree().unwrap();
        assert_eq!(tree.default_target().as_deref(), Some("b"));
    }

    #[test]
    fn script_arguments_override_declared_properties() {
        let script = script(
            r#"
            [properties]
            version = "1.0.0"
            channel = "beta"
            [target.a]
            "#,
        );
        let mut session = TaskSession::default();
        session.script_args.insert("version".into(), "2.0.0".into());

        script.seed_properties(&session);

        assert_eq!(session.properties.get("version").as_deref(), Some("2.0.0"));
        assert_eq!(session.properties.get("channel").as_deref(), Some("beta"));
    }
}
