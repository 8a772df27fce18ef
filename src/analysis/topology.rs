//! Dependency structure of a flow, for executors and tools.
use crate::graph::{Flow, FlowError, Module, ModuleId};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// A petgraph view of a flow: one node per module, one edge per link
/// (source module -> target module). Parallel edges are kept.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<ModuleId, ()>,
    index: HashMap<ModuleId, NodeIndex>,
}

impl DependencyGraph {
    pub fn graph(&self) -> &DiGraph<ModuleId, ()> {
        &self.graph
    }

    pub fn node(&self, module: ModuleId) -> Option<NodeIndex> {
        self.index.get(&module).copied()
    }

    /// Modules feeding `module` directly.
    pub fn upstream(&self, module: ModuleId) -> Vec<ModuleId> {
        self.neighbors(module, Direction::Incoming)
    }

    /// Modules fed by `module` directly.
    pub fn downstream(&self, module: ModuleId) -> Vec<ModuleId> {
        self.neighbors(module, Direction::Outgoing)
    }

    fn neighbors(&self, module: ModuleId, direction: Direction) -> Vec<ModuleId> {
        let Some(node) = self.node(module) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        self.graph
            .neighbors_directed(node, direction)
            .map(|neighbor| self.graph[neighbor])
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

pub fn dependency_graph(flow: &Flow) -> DependencyGraph {
    let mut graph = DiGraph::with_capacity(flow.modules().len(), flow.links().len());
    let mut index = HashMap::with_capacity(flow.modules().len());
    for module in flow.modules() {
        index.insert(module.id(), graph.add_node(module.id()));
    }
    for link in flow.links() {
        if let (Some(&source), Some(&target)) = (index.get(&link.source().module), index.get(&link.target().module)) {
            graph.add_edge(source, target, ());
        }
    }
    DependencyGraph { graph, index }
}

/// Modules ordered so every module comes after all modules feeding it.
pub fn execution_order(flow: &Flow) -> Result<Vec<Arc<Module>>, FlowError> {
    let deps = dependency_graph(flow);
    let sorted = toposort(&deps.graph, None).map_err(|cycle| FlowError::Cycle {
        module: label_of(flow, deps.graph[cycle.node_id()]),
    })?;
    Ok(sorted
        .into_iter()
        .filter_map(|node| flow.module(deps.graph[node]).cloned())
        .collect())
}

/// Groups modules into levels: level 0 has no upstream modules, and every
/// module sits one level below its deepest upstream module. Modules within
/// a level do not depend on each other.
pub fn execution_levels(flow: &Flow) -> Result<Vec<Vec<Arc<Module>>>, FlowError> {
    let deps = dependency_graph(flow);
    let order = execution_order(flow)?;
    let mut depth: HashMap<ModuleId, usize> = HashMap::with_capacity(order.len());
    let mut levels: Vec<Vec<Arc<Module>>> = Vec::new();
    for module in order {
        let level = deps
            .upstream(module.id())
            .iter()
            .filter_map(|upstream| depth.get(upstream))
            .map(|d| d + 1)
            .max()
            .unwrap_or(0);
        depth.insert(module.id(), level);
        if levels.len() <= level {
            levels.resize_with(level + 1, Vec::new);
        }
        levels[level].push(module);
    }
    Ok(levels)
}

/// Every module reachable from `start` along links, `start` included.
pub fn downstream_of(flow: &Flow, start: &[ModuleId]) -> HashSet<ModuleId> {
    let deps = dependency_graph(flow);
    let mut visited = HashSet::new();
    let mut queue: VecDeque<ModuleId> = start.iter().copied().collect();
    while let Some(module) = queue.pop_front() {
        if visited.insert(module) {
            queue.extend(deps.downstream(module));
        }
    }
    visited
}

fn label_of(flow: &Flow, id: ModuleId) -> String {
    flow.module(id).map(|module| module.label()).unwrap_or_else(|| id.to_string())
}
