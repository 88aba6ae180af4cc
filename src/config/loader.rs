// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Locations searched, in order, when no `--script` is given. Relative to the
/// working directory.
pub const DEFAULT_SCRIPT_LOCATIONS: &[&str] = &[
    "Buildrig.toml",
    "build/Buildrig.toml",
    ".buildrig/Buildrig.toml",
];

/// Load a build description from `path` without semantic validation.
///
/// Use [`load_and_validate`] to also check dependencies and the graph.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a build description and validate it:
///
/// - every `depends_on` entry names a declared target,
/// - the dependency graph is acyclic,
/// - task commands are non-empty and modes are valid.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// First default location that exists under `root`, if any.
pub fn find_default_script(root: &Path) -> Option<PathBuf> {
    DEFAULT_SCRIPT_LOCATIONS
        .iter()
        .map(|location| root.join(location))
        .find(|candidate| candidate.is_file())
}
