//! Dependency graph over kustomizations
//!
//! Nodes live in an arena indexed by declaration order; an edge from A to B
//! exists when A's `dependsOn` names B. Graph data comes from user-editable
//! configuration, so nothing here fails: cycles and dangling references
//! degrade to a finite wait budget and a best-effort order.

use crate::types::Kustomization;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Node {
    name: String,
    timeout: Duration,
    /// Resolved dependencies (arena indices, deduplicated)
    deps: Vec<usize>,
    /// `dependsOn` entries that name no kustomization
    dangling: Vec<String>,
}

/// Derived, disposable view of a blueprint's kustomizations
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl DependencyGraph {
    /// Build the graph. Duplicate names keep the first declaration.
    pub fn from_kustomizations(kustomizations: &[Kustomization]) -> Self {
        let mut index = HashMap::new();
        let mut declared = Vec::new();
        for k in kustomizations {
            if index.contains_key(&k.name) {
                log::warn!(
                    "duplicate kustomization '{}'; keeping the first declaration",
                    k.name
                );
                continue;
            }
            index.insert(k.name.clone(), declared.len());
            declared.push(k);
        }

        let nodes = declared
            .into_iter()
            .map(|k| {
                let mut deps = Vec::new();
                let mut dangling = Vec::new();
                for dep in &k.depends_on {
                    match index.get(dep) {
                        Some(&target) if !deps.contains(&target) => deps.push(target),
                        Some(_) => {}
                        None => dangling.push(dep.clone()),
                    }
                }
                Node {
                    name: k.name.clone(),
                    timeout: k.effective_timeout(),
                    deps,
                    dangling,
                }
            })
            .collect();

        Self { nodes, index }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Worst-case time to wait for every kustomization to converge.
    ///
    /// Each node costs its timeout plus the longest chain beneath it. A node
    /// reached again while still on the current path is charged its timeout
    /// once more and not descended into, so cyclic input yields a finite
    /// budget. Empty graphs need no wait.
    pub fn max_wait_time(&self) -> Duration {
        let mut visiting = vec![false; self.nodes.len()];
        let mut memo = vec![None; self.nodes.len()];

        (0..self.nodes.len())
            .map(|id| self.longest_path(id, &mut visiting, &mut memo).0)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Returns the path cost and whether a cycle was hit beneath `id`.
    ///
    /// Only cycle-free results are memoized: a cyclic result depends on
    /// which nodes were on the stack when it was computed.
    fn longest_path(
        &self,
        id: usize,
        visiting: &mut [bool],
        memo: &mut [Option<Duration>],
    ) -> (Duration, bool) {
        let node = &self.nodes[id];
        if visiting[id] {
            return (node.timeout, true);
        }
        if let Some(cost) = memo[id] {
            return (cost, false);
        }

        visiting[id] = true;
        let mut deepest = Duration::ZERO;
        let mut cyclic = false;
        for &dep in &node.deps {
            let (cost, hit_cycle) = self.longest_path(dep, visiting, memo);
            deepest = deepest.max(cost);
            cyclic |= hit_cycle;
        }
        visiting[id] = false;

        let total = node.timeout + deepest;
        if !cyclic {
            memo[id] = Some(total);
        }
        (total, cyclic)
    }

    /// Names in apply order: dependencies before dependents.
    ///
    /// Ties resolve by declaration order. When every remaining node waits on
    /// another, the earliest-declared node of a cycle that depends on nothing
    /// outside itself is emitted to break it. Nodes merely downstream of a
    /// cycle keep waiting for it.
    pub fn install_order(&self) -> Vec<String> {
        let count = self.nodes.len();
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.deps.len()).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (id, node) in self.nodes.iter().enumerate() {
            for &dep in &node.deps {
                dependents[dep].push(id);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| Reverse(id))
            .collect();
        let mut emitted = vec![false; count];
        let mut order = Vec::with_capacity(count);
        let mut components: Option<Vec<usize>> = None;

        while order.len() < count {
            let id = match ready.pop() {
                Some(Reverse(id)) => id,
                None => {
                    let components = components.get_or_insert_with(|| self.components());
                    let Some(forced) = (0..count).find(|&id| {
                        !emitted[id] && self.is_source_component(id, components, &emitted)
                    }) else {
                        break;
                    };
                    log::warn!(
                        "dependency cycle through '{}'; ordering it first",
                        self.nodes[forced].name
                    );
                    forced
                }
            };
            if emitted[id] {
                continue;
            }
            emitted[id] = true;
            order.push(self.nodes[id].name.clone());

            for &next in &dependents[id] {
                if emitted[next] {
                    continue;
                }
                in_degree[next] = in_degree[next].saturating_sub(1);
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        order
    }

    /// Whether no member of `id`'s component waits on an unemitted node
    /// outside it
    fn is_source_component(&self, id: usize, components: &[usize], emitted: &[bool]) -> bool {
        let component = components[id];
        self.nodes
            .iter()
            .enumerate()
            .filter(|(member, _)| components[*member] == component)
            .all(|(_, node)| {
                node.deps
                    .iter()
                    .all(|&dep| emitted[dep] || components[dep] == component)
            })
    }

    /// Strongly connected component of every node (Tarjan)
    fn components(&self) -> Vec<usize> {
        struct Tarjan<'a> {
            nodes: &'a [Node],
            next_index: usize,
            index: Vec<Option<usize>>,
            low: Vec<usize>,
            stack: Vec<usize>,
            on_stack: Vec<bool>,
            component: Vec<usize>,
            found: usize,
        }

        impl Tarjan<'_> {
            fn visit(&mut self, id: usize) {
                self.index[id] = Some(self.next_index);
                self.low[id] = self.next_index;
                self.next_index += 1;
                self.stack.push(id);
                self.on_stack[id] = true;

                for &dep in &self.nodes[id].deps {
                    match self.index[dep] {
                        None => {
                            self.visit(dep);
                            self.low[id] = self.low[id].min(self.low[dep]);
                        }
                        Some(dep_index) if self.on_stack[dep] => {
                            self.low[id] = self.low[id].min(dep_index);
                        }
                        Some(_) => {}
                    }
                }

                if Some(self.low[id]) == self.index[id] {
                    while let Some(member) = self.stack.pop() {
                        self.on_stack[member] = false;
                        self.component[member] = self.found;
                        if member == id {
                            break;
                        }
                    }
                    self.found += 1;
                }
            }
        }

        let count = self.nodes.len();
        let mut tarjan = Tarjan {
            nodes: &self.nodes,
            next_index: 0,
            index: vec![None; count],
            low: vec![0; count],
            stack: Vec::new(),
            on_stack: vec![false; count],
            component: vec![0; count],
            found: 0,
        };
        for id in 0..count {
            if tarjan.index[id].is_none() {
                tarjan.visit(id);
            }
        }
        tarjan.component
    }

    /// Names in teardown order: dependents before dependencies
    pub fn teardown_order(&self) -> Vec<String> {
        let mut order = self.install_order();
        order.reverse();
        order
    }

    /// Resolved dependency names of `name`, in declaration order
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|&id| {
                self.nodes[id]
                    .deps
                    .iter()
                    .map(|&dep| self.nodes[dep].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `(kustomization, missing dependency)` pairs
    pub fn dangling_references(&self) -> Vec<(&str, &str)> {
        self.nodes
            .iter()
            .flat_map(|node| {
                node.dangling
                    .iter()
                    .map(move |missing| (node.name.as_str(), missing.as_str()))
            })
            .collect()
    }

    /// Whether any dependency cycle exists
    pub fn has_cycle(&self) -> bool {
        // 0 = unvisited, 1 = on stack, 2 = done
        fn visit(graph: &DependencyGraph, id: usize, state: &mut [u8]) -> bool {
            match state[id] {
                1 => return true,
                2 => return false,
                _ => {}
            }
            state[id] = 1;
            let found = graph.nodes[id].deps.iter().any(|&dep| visit(graph, dep, state));
            state[id] = 2;
            found
        }

        let mut state = vec![0u8; self.nodes.len()];
        (0..self.nodes.len()).any(|id| visit(self, id, &mut state))
    }
}
