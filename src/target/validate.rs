// src/target/validate.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::errors::{BuildError, Result};
use crate::target::Target;
use crate::types::TargetName;

/// Validate the dependency graph reachable from `roots`.
///
/// This checks:
/// - every dependency name refers to a registered target
/// - no target depends on itself, directly or transitively
///
/// Unreachable targets are not inspected, so a broken target that nothing in
/// this run needs does not block the run.
pub fn validate_from<'a, I>(targets: &HashMap<TargetName, Arc<Target>>, roots: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    // Edge direction: dependency -> dependent, same as execution order.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    let mut stack: Vec<&str> = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();

    for root in roots {
        if !targets.contains_key(root) {
            return Err(BuildError::UnknownTarget(root.to_string()));
        }
        stack.push(root);
    }

    while let Some(name) = stack.pop() {
        if !visited.insert(name) {
            continue;
        }
        graph.add_node(name);

        let Some(target) = targets.get(name) else {
            return Err(BuildError::UnknownTarget(name.to_string()));
        };

        for (dep, _) in target.dependencies() {
            let Some((dep_key, _)) = targets.get_key_value(dep) else {
                return Err(BuildError::UnknownTarget(format!(
                    "{dep} (required by target '{name}')"
                )));
            };
            if dep == name {
                return Err(BuildError::DependencyCycle(format!(
                    "target '{name}' depends on itself"
                )));
            }
            graph.add_edge(dep_key.as_str(), name, ());
            stack.push(dep_key.as_str());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            let mut members: Vec<&str> = kosaraju_scc(&graph)
                .into_iter()
                .find(|scc| scc.contains(&node))
                .unwrap_or_default();
            members.sort_unstable();
            Err(BuildError::DependencyCycle(format!(
                "cycle detected involving target '{}' ({})",
                node,
                members.join(", ")
            )))
        }
    }
}

/// Validate every registered target.
pub fn validate_all(targets: &HashMap<TargetName, Arc<Target>>) -> Result<()> {
    let mut roots: Vec<&str> = targets.keys().map(String::as_str).collect();
    roots.sort_unstable();
    validate_from(targets, roots)
}

/// Dependency-first order in which `root` and everything it needs would run,
/// following declaration order. Assumes the graph was validated.
pub fn execution_order(targets: &HashMap<TargetName, Arc<Target>>, root: &str) -> Vec<TargetName> {
    fn visit(
        targets: &HashMap<TargetName, Arc<Target>>,
        name: &str,
        seen: &mut HashSet<TargetName>,
        order: &mut Vec<TargetName>,
    ) {
        if !seen.insert(name.to_string()) {
            return;
        }
        if let Some(target) = targets.get(name) {
            for (dep, _) in target.dependencies() {
                visit(targets, dep, seen, order);
            }
        }
        order.push(name.to_string());
    }

    let mut order = Vec::new();
    visit(targets, root, &mut HashSet::new(), &mut order);
    order
}
