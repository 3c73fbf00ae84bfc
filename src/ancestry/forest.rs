//! Branch forest built from a parent map.
//!
//! Branches are indexed by position in sorted order. Depths are resolved
//! with an iterative walk over `mark[]`/`depth[]` arrays instead of
//! recursion, so long or cyclic parent chains cost nothing special.

use std::collections::BTreeMap;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Active branches arranged as a forest with resolved depths.
///
/// Every branch in the input map appears exactly once. A parent that is
/// not itself a key is ignored. Cycles are broken by cutting the parent
/// link of the first branch a walk meets twice, which makes it a root.
#[derive(Debug, Clone)]
pub struct BranchForest {
    names: Vec<String>,
    parent: Vec<Option<usize>>,
    depth: Vec<usize>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl BranchForest {
    /// Builds the forest from `branch -> parent` entries.
    pub fn build(parents: &BTreeMap<String, Option<String>>) -> Self {
        let names: Vec<String> = parents.keys().cloned().collect();
        let lookup = |name: &str| names.binary_search_by(|n| n.as_str().cmp(name)).ok();

        let mut parent: Vec<Option<usize>> = parents
            .values()
            .map(|p| p.as_deref().and_then(lookup))
            .collect();

        let depth = resolve_depths(&names, &mut parent);

        let mut children = vec![Vec::new(); names.len()];
        let mut roots = Vec::new();
        // Ascending index order keeps roots and children sorted by name.
        for (i, p) in parent.iter().enumerate() {
            match p {
                Some(p) => children[*p].push(i),
                None => roots.push(i),
            }
        }

        Self {
            names,
            parent,
            depth,
            children,
            roots,
        }
    }

    /// Number of branches.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` for an empty forest.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Depth of `branch`, or `None` if it is not in the forest.
    pub fn depth_of(&self, branch: &str) -> Option<usize> {
        self.index_of(branch).map(|i| self.depth[i])
    }

    /// Parent of `branch` after cycle breaking.
    pub fn parent_of(&self, branch: &str) -> Option<&str> {
        self.index_of(branch)
            .and_then(|i| self.parent[i])
            .map(|p| self.names[p].as_str())
    }

    /// Root branches in name order.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.roots.iter().map(|&i| self.names[i].as_str())
    }

    /// Children of `branch` in name order.
    pub fn children_of(&self, branch: &str) -> impl Iterator<Item = &str> {
        self.index_of(branch)
            .map(|i| self.children[i].as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&c| self.names[c].as_str())
    }

    /// Depth-first preorder from the sorted roots, with depths.
    pub fn preorder(&self) -> Vec<(&str, usize)> {
        let mut order = Vec::with_capacity(self.names.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();

        while let Some(i) = stack.pop() {
            order.push((self.names[i].as_str(), self.depth[i]));
            stack.extend(self.children[i].iter().rev().copied());
        }

        order
    }

    fn index_of(&self, branch: &str) -> Option<usize> {
        self.names
            .binary_search_by(|n| n.as_str().cmp(branch))
            .ok()
    }
}

/// Resolves every depth, cutting parent links that close a cycle.
fn resolve_depths(names: &[String], parent: &mut [Option<usize>]) -> Vec<usize> {
    let n = names.len();
    let mut depth = vec![0usize; n];
    let mut mark = vec![Mark::Unvisited; n];
    let mut chain: Vec<usize> = Vec::new();

    for start in 0..n {
        'walk: loop {
            chain.clear();
            let mut cursor = Some(start);

            // Depth of the first resolved ancestor, or None at a root.
            let base = loop {
                let Some(i) = cursor else {
                    break None;
                };
                match mark[i] {
                    Mark::Done => break Some(depth[i]),
                    Mark::Visiting => {
                        debug!(branch = %names[i], "branch ancestry cycle, treating as root");
                        parent[i] = None;
                        for &j in &chain {
                            mark[j] = Mark::Unvisited;
                        }
                        continue 'walk;
                    }
                    Mark::Unvisited => {
                        mark[i] = Mark::Visiting;
                        chain.push(i);
                        cursor = parent[i];
                    }
                }
            };

            let mut above = base;
            for &i in chain.iter().rev() {
                let d = above.map_or(0, |b| b + 1);
                depth[i] = d;
                mark[i] = Mark::Done;
                above = Some(d);
            }
            break;
        }
    }

    depth
}
