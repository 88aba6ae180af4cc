// src/script/mod.rs

//! Runnable build scripts and how the runner finds them.
//!
//! A [`BuildScript`] registers targets into a fresh [`TargetTree`] and runs
//! the ones the session asks for. Two kinds ship with the crate:
//!
//! - [`DeclaredScript`]: built from a `Buildrig.toml` description,
//! - [`TargetScript`]: built from a Rust closure.
//!
//! A [`ScriptLocator`] turns command arguments into a script.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CommandArguments;
use crate::context::TaskSession;
use crate::errors::Result;
use crate::target::TargetTree;
use crate::target::tree::HELP_TARGET;
use crate::types::{TargetName, status_codes};

pub mod declared;
pub mod locator;
pub mod target_script;

pub use declared::DeclaredScript;
pub use locator::DefaultScriptLocator;
pub use target_script::TargetScript;

/// Future returned by [`BuildScript::run`]; resolves to a process status.
pub type ScriptFuture<'a> = Pin<Box<dyn Future<Output = Result<i32>> + Send + 'a>>;

pub trait BuildScript: Send + Sync {
    fn run(&self, session: TaskSession) -> ScriptFuture<'_>;
}

pub trait ScriptLocator: Send + Sync {
    /// `Ok(None)` when nothing was found in the default locations.
    fn find(&self, args: &CommandArguments) -> Result<Option<Box<dyn BuildScript>>>;
}

/// Targets a session asks for: the named ones, else the default target,
/// else the built-in help listing.
pub fn requested_targets(tree: &TargetTree, session: &TaskSession) -> Vec<TargetName> {
    if !session.main_targets.is_empty() {
        return session.main_targets.clone();
    }
    match tree.default_target() {
        Some(name) => vec![name],
        None => vec![HELP_TARGET.to_string()],
    }
}

/// Run the targets `session` requests against a fully registered `tree`.
pub async fn run_tree(tree: TargetTree, session: &TaskSession) -> Result<i32> {
    let tree = Arc::new(tree);
    let ctx = session.context();
    let targets = requested_targets(&tree, session);

    info!(targets = ?targets, dry_run = session.dry_run, "running build");

    for name in &targets {
        if name == HELP_TARGET && !tree.contains(HELP_TARGET) {
            tree.log_help(&ctx);
            continue;
        }

        if session.dry_run {
            let order = if session.no_dependencies {
                tree.validate_from(name)?;
                vec![name.clone()]
            } else {
                tree.execution_order(name)?
            };
            for step in order {
                if tree.is_executed(&step) {
                    debug!(target_name = %step, "already listed");
                    continue;
                }
                tree.target_help(&ctx, &step)?;
            }
            continue;
        }

        tree.run_target(&ctx, name).await?;
    }

    Ok(status_codes::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_then_help() {
        let mut tree = TargetTree::new();
        tree.add_target("compile", |_| {}).unwrap();

        let session = TaskSession::default();
        assert_eq!(requested_targets(&tree, &session), vec![HELP_TARGET]);

        tree.set_default_target("compile").unwrap();
        assert_eq!(requested_targets(&tree, &session), vec!["compile"]);

        let explicit = TaskSession {
            main_targets: vec!["other".into()],
            ..TaskSession::default()
        };
        assert_eq!(requested_targets(&tree, &explicit), vec!["other"]);
    }
}
