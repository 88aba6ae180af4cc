// src/task/shell.rs

//! Shell command task.

use std::process::Stdio;
use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result, bail};
use regex::{Captures, Regex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::context::{BuildProperties, TaskContext};
use crate::task::{Task, TaskFuture};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("placeholder pattern is a valid regex")
});

/// Runs a command through the platform shell (`sh -c` / `cmd /C`).
///
/// Before spawning:
/// - `${key}` placeholders are replaced with build properties (unknown keys
///   are left untouched),
/// - every build property is exported as `BUILDRIG_PROP_<KEY>`.
///
/// Stdout lines are logged at `info`, stderr lines at `debug`. A non-zero exit
/// status fails the task.
#[derive(Debug, Clone)]
pub struct ShellTask {
    cmd: String,
    description: Option<String>,
}

impl ShellTask {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<()> {
        let expanded = expand_placeholders(&self.cmd, ctx.properties());
        let target = ctx.current_target().unwrap_or("-").to_string();

        info!(target_name = %target, cmd = %expanded, "starting shell task");

        let mut cmd = shell_command(&expanded);
        for (key, value) in ctx.properties().snapshot() {
            cmd.env(property_env_name(&key), value);
        }
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for '{expanded}'"))?;

        // Drain both pipes so the child never blocks on a full buffer.
        let stdout_log = child.stdout.take().map(|stdout| {
            let target = target.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(target_name = %target, "{}", line);
                }
            })
        });
        let stderr_log = child.stderr.take().map(|stderr| {
            let target = target.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target_name = %target, "stderr: {}", line);
                }
            })
        });

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of '{expanded}'"))?;

        for handle in [stdout_log, stderr_log].into_iter().flatten() {
            let _ = handle.await;
        }

        let code = status.code().unwrap_or(-1);
        info!(
            target_name = %target,
            exit_code = code,
            success = status.success(),
            "shell task exited"
        );

        if !status.success() {
            bail!("command '{expanded}' exited with code {code}");
        }
        Ok(())
    }
}

impl Task for ShellTask {
    fn describe(&self) -> String {
        match &self.description {
            Some(d) => d.clone(),
            None => format!("sh: {}", self.cmd),
        }
    }

    fn run(&self, ctx: &TaskContext) -> Result<()> {
        let expanded = expand_placeholders(&self.cmd, ctx.properties());
        let mut cmd = std::process::Command::new(shell_program());
        cmd.arg(shell_flag()).arg(&expanded);
        for (key, value) in ctx.properties().snapshot() {
            cmd.env(property_env_name(&key), value);
        }
        let status = cmd
            .status()
            .with_context(|| format!("running '{expanded}'"))?;
        if !status.success() {
            bail!(
                "command '{expanded}' exited with code {}",
                status.code().unwrap_or(-1)
            );
        }
        Ok(())
    }

    fn run_async(self: Arc<Self>, ctx: TaskContext) -> TaskFuture {
        Box::pin(async move { self.execute(&ctx).await })
    }
}

fn shell_program() -> &'static str {
    if cfg!(windows) { "cmd" } else { "sh" }
}

fn shell_flag() -> &'static str {
    if cfg!(windows) { "/C" } else { "-c" }
}

fn shell_command(line: &str) -> Command {
    let mut c = Command::new(shell_program());
    c.arg(shell_flag()).arg(line);
    c
}

/// Replace `${key}` with the matching build property.
pub fn expand_placeholders(input: &str, properties: &BuildProperties) -> String {
    PLACEHOLDER
        .replace_all(input, |caps: &Captures<'_>| {
            properties
                .get(&caps[1])
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Environment variable name a property is exported under.
pub fn property_env_name(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("BUILDRIG_PROP_{sanitized}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_placeholders_only() {
        let props = BuildProperties::new();
        props.set("version", "1.4.0");

        let out = expand_placeholders("pack --version ${version} --out ${out_dir}", &props);
        assert_eq!(out, "pack --version 1.4.0 --out ${out_dir}");
    }

    #[test]
    fn env_names_are_sanitized() {
        assert_eq!(property_env_name("build.version"), "BUILDRIG_PROP_BUILD_VERSION");
        assert_eq!(property_env_name("out-dir"), "BUILDRIG_PROP_OUT_DIR");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_fails_the_task() {
        let task = Arc::new(ShellTask::new("exit 7"));
        let err = task.run_async(TaskContext::new()).await.unwrap_err();
        assert!(err.to_string().contains("code 7"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn properties_reach_the_child_environment() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("version.txt");
        let ctx = TaskContext::new();
        ctx.properties().set("version", "3.1.0");

        let cmd = format!("printf %s \"$BUILDRIG_PROP_VERSION\" > '{}'", out.display());
        Arc::new(ShellTask::new(cmd)).run_async(ctx).await.unwrap();

        assert_eq!(std::fs::read_to_string(out).unwrap(), "3.1.0");
    }
}
