// src/script/locator.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::CommandArguments;
use crate::config::loader::{DEFAULT_SCRIPT_LOCATIONS, find_default_script};
use crate::errors::{BuildError, Result};
use crate::script::{BuildScript, DeclaredScript, ScriptLocator};

/// Finds a `Buildrig.toml` description: the `--script` path if one was
/// given, otherwise the first default location that exists under `root`.
#[derive(Debug, Clone)]
pub struct DefaultScriptLocator {
    root: PathBuf,
}

impl DefaultScriptLocator {
    /// Search relative to the current working directory.
    pub fn new() -> Self {
        Self::with_root(".")
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for DefaultScriptLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptLocator for DefaultScriptLocator {
    fn find(&self, args: &CommandArguments) -> Result<Option<Box<dyn BuildScript>>> {
        let path = match &args.script {
            Some(explicit) => {
                let path = self.root.join(explicit);
                if !path.is_file() {
                    return Err(BuildError::ScriptNotFound {
                        searched: vec![path.display().to_string()],
                    });
                }
                path
            }
            None => match find_default_script(&self.root) {
                Some(path) => path,
                None => {
                    debug!(root = %self.root.display(), locations = ?DEFAULT_SCRIPT_LOCATIONS, "no build description found");
                    return Ok(None);
                }
            },
        };

        debug!(path = %path.display(), "using build description");
        Ok(Some(Box::new(DeclaredScript::from_path(path)?)))
    }
}
