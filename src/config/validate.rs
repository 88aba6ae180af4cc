// src/config/validate.rs

use std::collections::{BTreeMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BuildError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let properties = flatten_properties(&raw.properties)?;
        Ok(ConfigFile::new_unchecked(raw.settings, properties, raw.target))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_targets(cfg)?;
    validate_settings(cfg)?;
    validate_tasks(cfg)?;
    validate_target_dependencies(cfg)?;
    validate_graph(cfg)?;
    Ok(())
}

fn ensure_has_targets(cfg: &RawConfigFile) -> Result<()> {
    if cfg.target.is_empty() {
        return Err(BuildError::ConfigError(
            "build description must contain at least one [target.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_settings(cfg: &RawConfigFile) -> Result<()> {
    if let Some(name) = &cfg.settings.default_target {
        if !cfg.target.contains_key(name) {
            return Err(BuildError::ConfigError(format!(
                "[settings].default_target refers to unknown target '{name}'"
            )));
        }
    }
    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, target) in cfg.target.iter() {
        for (index, task) in target.task.iter().enumerate() {
            if task.cmd.trim().is_empty() {
                return Err(BuildError::ConfigError(format!(
                    "target '{name}' task #{} has an empty `cmd`",
                    index + 1
                )));
            }
        }

        let used: HashSet<&str> = target.task.iter().filter_map(|t| t.group.as_deref()).collect();
        for group in target.group.keys() {
            if !used.contains(group.as_str()) {
                return Err(BuildError::ConfigError(format!(
                    "target '{name}' declares hooks for group '{group}' but no task uses it"
                )));
            }
        }
    }
    Ok(())
}

fn validate_target_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, target) in cfg.target.iter() {
        let mut seen = HashSet::new();
        for dep in target.depends_on.iter() {
            let dep = dep.name();
            if !cfg.target.contains_key(dep) {
                return Err(BuildError::ConfigError(format!(
                    "target '{name}' has unknown dependency '{dep}' in `depends_on`"
                )));
            }
            if dep == name {
                return Err(BuildError::ConfigError(format!(
                    "target '{name}' cannot depend on itself in `depends_on`"
                )));
            }
            if !seen.insert(dep) {
                return Err(BuildError::DuplicateDependency {
                    target: name.clone(),
                    dependency: dep.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn validate_graph(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> target
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.target.keys() {
        graph.add_node(name.as_str());
    }

    for (name, target) in cfg.target.iter() {
        for dep in target.depends_on.iter() {
            graph.add_edge(dep.name(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(BuildError::DependencyCycle(format!(
            "cycle detected in build description involving target '{}'",
            cycle.node_id()
        ))),
    }
}

fn flatten_properties(raw: &BTreeMap<String, toml::Value>) -> Result<BTreeMap<String, String>> {
    raw.iter()
        .map(|(key, value)| {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Datetime(d) => d.to_string(),
                toml::Value::Array(_) | toml::Value::Table(_) => {
                    return Err(BuildError::ConfigError(format!(
                        "property '{key}' must be a string, number or boolean"
                    )));
                }
            };
            Ok((key.clone(), text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(src)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn accepts_mixed_dependency_forms() {
        let cfg = parse(
            r#"
            [properties]
            version = "1.0.0"
            jobs = 4

            [target.compile]
            [[target.compile.task]]
            cmd = "echo compile"

            [target.docs]
            [[target.docs.task]]
            cmd = "echo docs"
            mode = "parallel"

            [target.package]
            default = true
            depends_on = ["compile", { name = "docs", mode = "parallel" }]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.properties.get("jobs").map(String::as_str), Some("4"));
        assert_eq!(cfg.default_target(), Some("package"));
        let deps = &cfg.target["package"].depends_on;
        assert_eq!(deps[1].name(), "docs");
        assert_eq!(deps[1].mode(), crate::types::ExecutionMode::Parallel);
    }

    #[test]
    fn rejects_unknown_dependency() {
        let err = parse(
            r#"
            [target.a]
            depends_on = ["ghost"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown dependency 'ghost'"));
    }

    #[test]
    fn rejects_cycles() {
        let err = parse(
            r#"
            [target.a]
            depends_on = ["b"]
            [target.b]
            depends_on = ["a"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::DependencyCycle(_)));
    }

    #[test]
    fn rejects_bad_mode_and_empty_cmd() {
        assert!(parse(
            r#"
            [target.a]
            [[target.a.task]]
            cmd = "echo"
            mode = "eventually"
            "#
        )
        .is_err());

        let err = parse(
            r#"
            [target.a]
            [[target.a.task]]
            cmd = "  "
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("empty `cmd`"));
    }

    #[test]
    fn rejects_hooks_for_unused_group() {
        let err = parse(
            r#"
            [target.a]
            [[target.a.task]]
            cmd = "echo a"
            [target.a.group.cleanup]
            on_finally = "echo done"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("group 'cleanup'"));
    }

    #[test]
    fn rejects_unknown_default_target() {
        let err = parse(
            r#"
            [settings]
            default_target = "nope"
            [target.a]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::ConfigError(_)));
    }
}
