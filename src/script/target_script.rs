// src/script/target_script.rs

use crate::context::TaskSession;
use crate::errors::Result;
use crate::script::{BuildScript, ScriptFuture, run_tree};
use crate::target::TargetTree;

/// Build script whose targets are declared by a Rust closure.
///
/// ```no_run
/// use buildrig::script::TargetScript;
/// use buildrig::{TargetTree, TaskSession};
///
/// let script = TargetScript::new(|tree: &mut TargetTree, _session: &TaskSession| {
///     tree.add_target("compile", |t| {
///         t.description("Compile sources")
///             .set_as_default()
///             .do_task("cargo build", |_ctx| Ok(()));
///     })?;
///     Ok(())
/// });
/// # let _ = script;
/// ```
pub struct TargetScript<F> {
    configure: F,
}

impl<F> TargetScript<F>
where
    F: Fn(&mut TargetTree, &TaskSession) -> Result<()> + Send + Sync,
{
    pub fn new(configure: F) -> Self {
        Self { configure }
    }
}

impl<F> BuildScript for TargetScript<F>
where
    F: Fn(&mut TargetTree, &TaskSession) -> Result<()> + Send + Sync,
{
    fn run(&self, session: TaskSession) -> ScriptFuture<'_> {
        Box::pin(async move {
            let mut tree = TargetTree::new();
            (self.configure)(&mut tree, &session)?;
            run_tree(tree, &session).await
        })
    }
}
