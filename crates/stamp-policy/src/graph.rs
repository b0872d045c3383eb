//! # Document Dependency Graph
//!
//! Directed graph of `dependencies` declared across one batch. Targets are
//! resolved lexically against the declaring document's directory, and only
//! targets with a governed suffix become edges.
//!
//! Cycle detection is an iterative depth-first search: an explicit path
//! stack, separate on-stack and visited sets, and a per-node cursor into the
//! adjacency list standing in for recursion frames. Deep chains cannot
//! overflow the call stack.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path};

use serde::Serialize;

use crate::config::PolicyConfig;

/// One cycle, starting and ending at the node where the search re-entered
/// the current path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle(pub Vec<String>);

impl Cycle {
    /// Documents in traversal order, first node repeated at the end.
    pub fn nodes(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" -> "))
    }
}

/// Lexically normalize a `/`-separated path: drop `.`, fold `..` into its
/// parent where one exists. Never touches the filesystem.
pub fn normalize_path(path: &str) -> String {
    let p = Path::new(path);
    let absolute = p.has_root();
    let mut parts: Vec<String> = Vec::new();

    for component in p.components() {
        match component {
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => match parts.last().map(String::as_str) {
                Some("..") | None if !absolute => parts.push("..".to_string()),
                Some("..") | None => {}
                Some(_) => {
                    parts.pop();
                }
            },
            Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Resolve `target` relative to the directory of `source`.
pub fn resolve_target(source: &str, target: &str) -> String {
    if Path::new(target).has_root() {
        return normalize_path(target);
    }
    let base = Path::new(source)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    if base.is_empty() {
        normalize_path(target)
    } else {
        normalize_path(&format!("{base}/{target}"))
    }
}

/// Adjacency list over interned document paths.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<Vec<usize>>,
    governed_suffixes: Vec<String>,
}

impl DependencyGraph {
    /// An empty graph keeping targets with the configured suffixes.
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            governed_suffixes: config
                .governed_suffixes
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            ..Self::default()
        }
    }

    fn intern(&mut self, path: String) -> usize {
        if let Some(&id) = self.index.get(&path) {
            return id;
        }
        let id = self.nodes.len();
        self.index.insert(path.clone(), id);
        self.nodes.push(path);
        self.edges.push(Vec::new());
        id
    }

    fn is_governed(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        self.governed_suffixes.iter().any(|s| lower.ends_with(s))
    }

    /// Record the dependencies `document` declares, replacing any recorded
    /// earlier for the same document.
    pub fn add_edges<S: AsRef<str>>(&mut self, document: &str, declared: &[S]) {
        let source = self.intern(normalize_path(document));
        let mut targets = Vec::new();
        for dep in declared {
            let resolved = resolve_target(document, dep.as_ref());
            if self.is_governed(&resolved) {
                targets.push(self.intern(resolved));
            }
        }
        self.edges[source] = targets;
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Resolved targets recorded for `document`.
    pub fn targets(&self, document: &str) -> Vec<&str> {
        self.index
            .get(&normalize_path(document))
            .map(|&id| self.edges[id].iter().map(|&t| self.nodes[t].as_str()).collect())
            .unwrap_or_default()
    }

    /// Every cycle reachable by depth-first search, restarting from each
    /// unvisited node in insertion order.
    pub fn detect_cycles(&self) -> Vec<Cycle> {
        let n = self.nodes.len();
        let mut visited = vec![false; n];
        let mut on_stack = vec![false; n];
        let mut cursor = vec![0usize; n];
        let mut path: Vec<usize> = Vec::new();
        let mut cycles = Vec::new();

        for root in 0..n {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            on_stack[root] = true;
            path.push(root);

            while let Some(&node) = path.last() {
                let Some(&next) = self.edges[node].get(cursor[node]) else {
                    on_stack[node] = false;
                    path.pop();
                    continue;
                };
                cursor[node] += 1;

                if !visited[next] {
                    visited[next] = true;
                    on_stack[next] = true;
                    path.push(next);
                } else if on_stack[next] {
                    if let Some(start) = path.iter().position(|&p| p == next) {
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|&i| self.nodes[i].clone()).collect();
                        cycle.push(self.nodes[next].clone());
                        cycles.push(Cycle(cycle));
                    }
                }
            }
        }

        if !cycles.is_empty() {
            tracing::warn!(count = cycles.len(), first = %cycles[0], "dependency cycles detected");
        }
        cycles
    }
}
