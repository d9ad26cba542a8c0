//! The graph of a finished solution, for display and "why is this here"
//! queries.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use vsolve_core::dependency::Atom;
use vsolve_core::version::Version;

/// Selected atoms connected by the dependency edges that were committed.
pub struct SolutionGraph {
    graph: DiGraph<Atom, ()>,
    /// Lookup from project name to node index.
    index: HashMap<String, NodeIndex>,
    pub root: Option<NodeIndex>,
}

impl SolutionGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            root: None,
        }
    }

    /// Add or retrieve a node. A project appears at most once.
    pub fn add_node(&mut self, atom: Atom) -> NodeIndex {
        let key = atom.id.local_name.as_str().to_string();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(atom);
        self.index.insert(key, idx);
        idx
    }

    pub fn set_root(&mut self, idx: NodeIndex) {
        self.root = Some(idx);
    }

    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn find(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(name).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &Atom {
        &self.graph[idx]
    }

    /// All selected atoms except the root.
    pub fn all_nodes(&self) -> Vec<&Atom> {
        self.graph
            .node_indices()
            .filter(|&idx| Some(idx) != self.root)
            .map(|idx| &self.graph[idx])
            .collect()
    }

    /// Direct dependencies of a node, ordered by name.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.sorted(self.graph.neighbors_directed(idx, Direction::Outgoing))
    }

    /// Who depends on this node, ordered by name.
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.sorted(self.graph.neighbors_directed(idx, Direction::Incoming))
    }

    fn sorted(&self, nodes: impl Iterator<Item = NodeIndex>) -> Vec<NodeIndex> {
        let mut nodes: Vec<NodeIndex> = nodes.collect();
        nodes.sort_by(|a, b| self.graph[*a].id.cmp(&self.graph[*b].id));
        nodes
    }

    fn label(&self, idx: NodeIndex) -> String {
        let atom = &self.graph[idx];
        match atom.version {
            Version::Root => atom.id.err_string(),
            ref v => format!("{} {v}", atom.id.err_string()),
        }
    }

    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let Some(root) = self.root else {
            return output;
        };
        output.push_str(&format!("{}\n", self.label(root)));

        let mut visited = HashSet::new();
        visited.insert(root);
        let deps = self.dependencies_of(root);
        let count = deps.len();
        for (i, idx) in deps.into_iter().enumerate() {
            self.print_subtree(&mut output, idx, "", i == count - 1, 1, max_depth, &mut visited);
        }
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", self.label(idx)));

        if max_depth.is_some_and(|max| depth >= max) {
            return;
        }
        // Cycles are legal between projects; print the repeat and stop.
        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, child) in deps.into_iter().enumerate() {
            self.print_subtree(
                output,
                child,
                &child_prefix,
                i == count - 1,
                depth + 1,
                max_depth,
                visited,
            );
        }
        visited.remove(&idx);
    }

    /// Everything that transitively depends on `name`, as a tree.
    pub fn print_inverted_tree(&self, name: &str) -> String {
        let mut output = String::new();
        let Some(idx) = self.resolve(name) else {
            return output;
        };
        output.push_str(&format!("{}\n", self.label(idx)));

        let mut visited = HashSet::new();
        visited.insert(idx);
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, dep) in dependents.into_iter().enumerate() {
            self.print_inverted_subtree(&mut output, dep, "", i == count - 1, &mut visited);
        }
        output
    }

    fn print_inverted_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", self.label(idx)));
        if !visited.insert(idx) {
            return;
        }
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, dep) in dependents.into_iter().enumerate() {
            self.print_inverted_subtree(output, dep, &child_prefix, i == count - 1, visited);
        }
        visited.remove(&idx);
    }

    /// A chain of atoms from the root to `name`.
    ///
    /// Accepts the full project name or its last path segment.
    pub fn find_path(&self, name: &str) -> Option<Vec<&Atom>> {
        let root = self.root?;
        let target = self.resolve(name)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    fn resolve(&self, name: &str) -> Option<NodeIndex> {
        if let Some(&idx) = self.index.get(name) {
            return Some(idx);
        }
        let mut matches: Vec<(&String, NodeIndex)> = self
            .index
            .iter()
            .filter(|(full, _)| full.rsplit('/').next() == Some(name))
            .map(|(full, &idx)| (full, idx))
            .collect();
        matches.sort();
        matches.first().map(|&(_, idx)| idx)
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for next in self.dependencies_of(current) {
            if self.dfs_path(next, target, path, visited) {
                return true;
            }
        }
        path.pop();
        false
    }

    /// Number of nodes, excluding the root.
    pub fn len(&self) -> usize {
        let total = self.graph.node_count();
        if self.root.is_some() {
            total.saturating_sub(1)
        } else {
            total
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SolutionGraph {
    fn default() -> Self {
        Self::new()
    }
}
