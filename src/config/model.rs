// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{ExecutionMode, TargetName};

/// Top-level build description as read from a TOML file.
///
/// ```toml
/// [settings]
/// default_target = "package"
///
/// [properties]
/// version = "1.4.0"
///
/// [target.compile]
/// description = "Compile sources"
///
/// [[target.compile.task]]
/// cmd = "cargo build --release"
///
/// [target.package]
/// depends_on = ["compile", { name = "docs", mode = "parallel" }]
/// ```
///
/// All sections are optional. Validation happens in
/// [`crate::config::validate`], which produces a [`ConfigFile`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub settings: SettingsSection,

    /// Initial build properties. Non-string scalars are stored in their TOML
    /// text form.
    #[serde(default)]
    pub properties: BTreeMap<String, toml::Value>,

    /// All targets from `[target.<name>]`.
    #[serde(default)]
    pub target: BTreeMap<TargetName, TargetConfig>,
}

/// A validated build description.
///
/// Only constructed through `TryFrom<RawConfigFile>`, so holding one means
/// every dependency exists, the graph is acyclic and every task has a
/// command.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub settings: SettingsSection,
    pub properties: BTreeMap<String, String>,
    pub target: BTreeMap<TargetName, TargetConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        settings: SettingsSection,
        properties: BTreeMap<String, String>,
        target: BTreeMap<TargetName, TargetConfig>,
    ) -> Self {
        Self {
            settings,
            properties,
            target,
        }
    }

    /// The default target: `[settings].default_target` if set, otherwise the
    /// (last, alphabetically) target marked `default = true`.
    pub fn default_target(&self) -> Option<&str> {
        self.settings.default_target.as_deref().or_else(|| {
            self.target
                .iter()
                .filter(|(_, t)| t.default)
                .map(|(name, _)| name.as_str())
                .last()
        })
    }
}

/// `[settings]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SettingsSection {
    /// Target run when none is named on the command line.
    #[serde(default)]
    pub default_target: Option<TargetName>,
}

/// `[target.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TargetConfig {
    #[serde(default)]
    pub description: Option<String>,

    /// Exclude from the help listing.
    #[serde(default)]
    pub hidden: bool,

    /// Mark as the default target.
    #[serde(default)]
    pub default: bool,

    /// Dependencies in declaration order.
    #[serde(default)]
    pub depends_on: Vec<DependencySpec>,

    /// Tasks in declaration order, from `[[target.<name>.task]]`.
    #[serde(default)]
    pub task: Vec<TaskConfig>,

    /// Hooks per named group, from `[target.<name>.group.<id>]`.
    #[serde(default)]
    pub group: BTreeMap<String, GroupConfig>,
}

/// One entry of `depends_on`: either a bare name (synchronous) or a table
/// with an explicit mode.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DependencySpec {
    Name(TargetName),
    Detailed {
        name: TargetName,
        #[serde(default)]
        mode: ExecutionMode,
    },
}

impl DependencySpec {
    pub fn name(&self) -> &str {
        match self {
            DependencySpec::Name(name) => name,
            DependencySpec::Detailed { name, .. } => name,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        match self {
            DependencySpec::Name(_) => ExecutionMode::Synchronous,
            DependencySpec::Detailed { mode, .. } => *mode,
        }
    }
}

/// `[[target.<name>.task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Shell command; `${key}` is replaced with the build property `key`.
    pub cmd: String,

    #[serde(default)]
    pub mode: ExecutionMode,

    /// Tasks sharing a group id land in one group, in declaration order.
    /// Without it every task gets a group of its own.
    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// `[target.<name>.group.<id>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GroupConfig {
    /// Shell command run when a task of the group fails.
    #[serde(default)]
    pub on_error: Option<String>,

    /// Shell command run when the group finishes, successfully or not.
    #[serde(default)]
    pub on_finally: Option<String>,
}
