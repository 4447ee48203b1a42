// Stack dependency analysis: deployment order, cycles, phases, impact

use crate::parser::{DependencyType, StackDependency};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// One outgoing edge in the dependency map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEntry {
    pub depends_on: String,
    #[serde(rename = "type")]
    pub dependency_type: DependencyType,
    pub description: String,
}

/// Source stack -> what it depends on
pub type DependencyMap = BTreeMap<String, Vec<DependencyEntry>>;

/// The `dependencies` view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyAnalysis {
    pub dependency_map: DependencyMap,
    pub deployment_order: Vec<String>,
    pub dependency_count: usize,
    /// Groups of stacks that depend on each other in a loop
    pub cycles: Vec<Vec<String>>,
}

impl DependencyAnalysis {
    /// Build the view from raw edges. `stacks` lists every known stack so
    /// that stacks without edges still get a deployment slot.
    pub fn build(stacks: &[String], dependencies: &[StackDependency]) -> Self {
        let dependency_map = dependency_map(dependencies);
        let deployment_order = deployment_order(stacks, &dependency_map);
        let cycles = find_cycles(&dependency_map);

        for cycle in &cycles {
            tracing::warn!("Cyclic stack dependency: {}", cycle.join(" -> "));
        }

        Self {
            dependency_map,
            deployment_order,
            dependency_count: dependencies.len(),
            cycles,
        }
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// Stacks that directly depend on `stack`
    pub fn dependents_of(&self, stack: &str) -> Vec<String> {
        dependents_of(&self.dependency_map, stack)
    }

    /// Direct dependency targets of `stack`
    pub fn dependencies_of(&self, stack: &str) -> Vec<String> {
        self.dependency_map
            .get(stack)
            .map(|deps| deps.iter().map(|d| d.depends_on.clone()).collect())
            .unwrap_or_default()
    }
}

/// Group edges by source stack, keeping declaration order per source
pub fn dependency_map(dependencies: &[StackDependency]) -> DependencyMap {
    let mut map = DependencyMap::new();
    for dep in dependencies {
        map.entry(dep.source_stack.clone())
            .or_default()
            .push(DependencyEntry {
                depends_on: dep.target_stack.clone(),
                dependency_type: dep.dependency_type,
                description: dep.description.clone(),
            });
    }
    map
}

fn all_stacks<'a>(stacks: &'a [String], map: &'a DependencyMap) -> BTreeSet<&'a str> {
    let mut all: BTreeSet<&str> = stacks.iter().map(String::as_str).collect();
    for (source, deps) in map {
        all.insert(source);
        all.extend(deps.iter().map(|d| d.depends_on.as_str()));
    }
    all
}

/// Depth-first topological sort: dependencies come before dependents.
/// A stack re-entered while still on the visit path is skipped, so cycles
/// terminate and every stack still appears exactly once.
pub fn deployment_order(stacks: &[String], map: &DependencyMap) -> Vec<String> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut visiting = HashSet::new();

    for stack in all_stacks(stacks, map) {
        visit(stack, map, &mut visiting, &mut visited, &mut order);
    }

    order
}

fn visit<'a>(
    stack: &'a str,
    map: &'a DependencyMap,
    visiting: &mut HashSet<&'a str>,
    visited: &mut HashSet<&'a str>,
    order: &mut Vec<String>,
) {
    if visited.contains(stack) || visiting.contains(stack) {
        return;
    }

    visiting.insert(stack);
    if let Some(deps) = map.get(stack) {
        for dep in deps {
            visit(&dep.depends_on, map, visiting, visited, order);
        }
    }
    visiting.remove(stack);
    visited.insert(stack);
    order.push(stack.to_string());
}

/// Strongly connected groups of size > 1, plus self-dependencies
pub fn find_cycles(map: &DependencyMap) -> Vec<Vec<String>> {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

    for stack in all_stacks(&[], map) {
        nodes.insert(stack, graph.add_node(stack.to_string()));
    }
    for (source, deps) in map {
        for dep in deps {
            if let (Some(&from), Some(&to)) = (
                nodes.get(source.as_str()),
                nodes.get(dep.depends_on.as_str()),
            ) {
                graph.add_edge(from, to, ());
            }
        }
    }

    let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut names: Vec<String> = scc.into_iter().map(|idx| graph[idx].clone()).collect();
            names.sort();
            names
        })
        .collect();
    cycles.sort();
    cycles
}

/// Stacks that directly depend on `stack`, in map order
pub fn dependents_of(map: &DependencyMap, stack: &str) -> Vec<String> {
    map.iter()
        .filter(|(_, deps)| deps.iter().any(|d| d.depends_on == stack))
        .map(|(source, _)| source.clone())
        .collect()
}

/// Every stack that transitively depends on `stack`
pub fn cascading_dependents(map: &DependencyMap, stack: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut pending = vec![stack.to_string()];

    while let Some(current) = pending.pop() {
        for dependent in dependents_of(map, &current) {
            if dependent != stack && found.insert(dependent.clone()) {
                pending.push(dependent);
            }
        }
    }

    found
}

/// Change-impact risk of modifying a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_dependents(direct: usize) -> Self {
        match direct {
            0 => RiskLevel::Low,
            1 | 2 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        write!(f, "{}", s)
    }
}

/// Impact of changing one stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackImpact {
    pub stack: String,
    pub direct: Vec<String>,
    /// Transitive dependents beyond the direct ones
    pub cascading: Vec<String>,
    pub risk: RiskLevel,
}

pub fn impact_of(map: &DependencyMap, stack: &str) -> StackImpact {
    let direct = dependents_of(map, stack);
    let mut cascading = BTreeSet::new();
    for dependent in &direct {
        cascading.extend(cascading_dependents(map, dependent));
    }
    cascading.remove(stack);

    StackImpact {
        stack: stack.to_string(),
        risk: RiskLevel::from_dependents(direct.len()),
        direct,
        cascading: cascading.into_iter().collect(),
    }
}

/// Deployment phase of every stack: 1 for stacks with no dependencies,
/// otherwise one more than the deepest dependency. Back edges of a cycle
/// are ignored.
pub fn deployment_phases(stacks: &[String], map: &DependencyMap) -> BTreeMap<String, usize> {
    let mut phases: BTreeMap<String, usize> = BTreeMap::new();

    for stack in deployment_order(stacks, map) {
        let phase = map
            .get(&stack)
            .map(|deps| {
                deps.iter()
                    .filter_map(|d| phases.get(&d.depends_on))
                    .max()
                    .copied()
                    .unwrap_or(0)
            })
            .unwrap_or(0)
            + 1;
        phases.insert(stack, phase);
    }

    phases
}

/// Square matrix over `stacks`: `cells[row][col]` is true when the row
/// stack directly depends on the column stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyMatrix {
    pub stacks: Vec<String>,
    pub cells: Vec<Vec<bool>>,
}

impl DependencyMatrix {
    pub fn build(stacks: &[String], map: &DependencyMap) -> Self {
        let cells = stacks
            .iter()
            .map(|row| {
                let targets: HashSet<&str> = map
                    .get(row)
                    .map(|deps| deps.iter().map(|d| d.depends_on.as_str()).collect())
                    .unwrap_or_default();
                stacks
                    .iter()
                    .map(|col| col != row && targets.contains(col.as_str()))
                    .collect()
            })
            .collect();

        Self {
            stacks: stacks.to_vec(),
            cells,
        }
    }

    pub fn depends(&self, row: usize, col: usize) -> bool {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn deps(edges: &[(&str, &str)]) -> Vec<StackDependency> {
        edges
            .iter()
            .map(|(s, t)| StackDependency::explicit(s, t))
            .collect()
    }

    fn position(order: &[String], stack: &str) -> usize {
        order.iter().position(|s| s == stack).unwrap()
    }

    #[test]
    fn test_dependency_map_shape() {
        let map = dependency_map(&deps(&[("ComputeStack", "DataStack")]));
        assert_eq!(map.len(), 1);
        let entry = &map["ComputeStack"][0];
        assert_eq!(entry.depends_on, "DataStack");
        assert_eq!(entry.dependency_type, DependencyType::Explicit);

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["ComputeStack"][0]["type"], "explicit");
        assert_eq!(json["ComputeStack"][0]["depends_on"], "DataStack");
    }

    #[test]
    fn test_deployment_order_simple() {
        let map = dependency_map(&deps(&[("ComputeStack", "DataStack")]));
        let order = deployment_order(&names(&["DataStack", "ComputeStack"]), &map);
        assert_eq!(order, names(&["DataStack", "ComputeStack"]));
    }

    #[test]
    fn test_deployment_order_respects_chain() {
        let map = dependency_map(&deps(&[
            ("FrontendStack", "ApiStack"),
            ("ApiStack", "ComputeStack"),
            ("ApiStack", "DataStack"),
            ("ComputeStack", "DataStack"),
        ]));
        let stacks = names(&["ApiStack", "ComputeStack", "DataStack", "FrontendStack", "LocationStack"]);
        let order = deployment_order(&stacks, &map);
        assert_eq!(order.len(), 5);
        assert!(position(&order, "DataStack") < position(&order, "ComputeStack"));
        assert!(position(&order, "ComputeStack") < position(&order, "ApiStack"));
        assert!(position(&order, "ApiStack") < position(&order, "FrontendStack"));
        assert!(order.contains(&"LocationStack".to_string()));
    }

    #[test]
    fn test_deployment_order_includes_dangling_targets() {
        let map = dependency_map(&deps(&[("ComputeStack", "ExternalStack")]));
        let order = deployment_order(&names(&["ComputeStack"]), &map);
        assert_eq!(order, names(&["ExternalStack", "ComputeStack"]));
    }

    #[test]
    fn test_deployment_order_terminates_on_cycle() {
        let map = dependency_map(&deps(&[("A", "B"), ("B", "C"), ("C", "A")]));
        let order = deployment_order(&names(&["A", "B", "C"]), &map);
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(sorted, names(&["A", "B", "C"]));
    }

    #[test]
    fn test_find_cycles() {
        let map = dependency_map(&deps(&[("A", "B"), ("B", "A"), ("C", "A")]));
        assert_eq!(find_cycles(&map), vec![names(&["A", "B"])]);

        let acyclic = dependency_map(&deps(&[("B", "A")]));
        assert!(find_cycles(&acyclic).is_empty());
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let map = dependency_map(&deps(&[("A", "A")]));
        assert_eq!(find_cycles(&map), vec![names(&["A"])]);
    }

    #[test]
    fn test_analysis_build() {
        let stacks = names(&["DataStack", "ComputeStack"]);
        let analysis = DependencyAnalysis::build(&stacks, &deps(&[("ComputeStack", "DataStack")]));
        assert_eq!(analysis.dependency_count, 1);
        assert!(!analysis.has_cycles());
        assert_eq!(analysis.dependents_of("DataStack"), names(&["ComputeStack"]));
        assert_eq!(analysis.dependencies_of("ComputeStack"), names(&["DataStack"]));
        assert!(analysis.dependencies_of("DataStack").is_empty());
    }

    #[test]
    fn test_cascading_dependents() {
        let map = dependency_map(&deps(&[
            ("ComputeStack", "DataStack"),
            ("ApiStack", "ComputeStack"),
            ("FrontendStack", "ApiStack"),
        ]));
        let cascading = cascading_dependents(&map, "DataStack");
        assert_eq!(
            cascading.into_iter().collect::<Vec<_>>(),
            names(&["ApiStack", "ComputeStack", "FrontendStack"])
        );
    }

    #[test]
    fn test_cascading_dependents_with_cycle() {
        let map = dependency_map(&deps(&[("A", "B"), ("B", "A")]));
        let cascading = cascading_dependents(&map, "A");
        assert_eq!(cascading.into_iter().collect::<Vec<_>>(), names(&["B"]));
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskLevel::from_dependents(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_dependents(1), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_dependents(2), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_dependents(3), RiskLevel::High);
        assert_eq!(RiskLevel::High.to_string(), "High");
    }

    #[test]
    fn test_impact_of() {
        let map = dependency_map(&deps(&[
            ("ComputeStack", "DataStack"),
            ("ApiStack", "DataStack"),
            ("LocationStack", "DataStack"),
            ("FrontendStack", "ApiStack"),
        ]));
        let impact = impact_of(&map, "DataStack");
        assert_eq!(impact.direct.len(), 3);
        assert_eq!(impact.risk, RiskLevel::High);
        assert_eq!(impact.cascading, names(&["FrontendStack"]));

        let leaf = impact_of(&map, "FrontendStack");
        assert!(leaf.direct.is_empty());
        assert_eq!(leaf.risk, RiskLevel::Low);
    }

    #[test]
    fn test_deployment_phases() {
        let map = dependency_map(&deps(&[
            ("ComputeStack", "DataStack"),
            ("ApiStack", "ComputeStack"),
            ("ApiStack", "DataStack"),
        ]));
        let phases = deployment_phases(&names(&["ApiStack", "ComputeStack", "DataStack", "LocationStack"]), &map);
        assert_eq!(phases["DataStack"], 1);
        assert_eq!(phases["LocationStack"], 1);
        assert_eq!(phases["ComputeStack"], 2);
        assert_eq!(phases["ApiStack"], 3);
    }

    #[test]
    fn test_dependency_matrix() {
        let stacks = names(&["ComputeStack", "DataStack"]);
        let map = dependency_map(&deps(&[("ComputeStack", "DataStack")]));
        let matrix = DependencyMatrix::build(&stacks, &map);
        assert!(matrix.depends(0, 1));
        assert!(!matrix.depends(1, 0));
        assert!(!matrix.depends(0, 0));
        assert!(!matrix.depends(5, 5));
    }
}
