//! Parallel branches and connected groups of wanted elements.

use std::collections::{BTreeMap, BTreeSet};

use hr_core::ElementId;

use crate::view::ElementGraph;

/// Union-find keyed by element id.
#[derive(Debug, Default)]
struct Groups {
    parent: BTreeMap<ElementId, ElementId>,
}

impl Groups {
    fn find(&mut self, n: ElementId) -> ElementId {
        let mut root = n;
        while let Some(&p) = self.parent.get(&root) {
            if p == root {
                break;
            }
            root = p;
        }
        let mut cur = n;
        while cur != root {
            let next = self.parent.get(&cur).copied().unwrap_or(root);
            self.parent.insert(cur, root);
            cur = next;
        }
        self.parent.entry(root).or_insert(root);
        root
    }

    fn union(&mut self, a: ElementId, b: ElementId) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // smaller id stays root
            let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent.insert(drop, keep);
        }
    }

    fn sets(mut self) -> Vec<BTreeSet<ElementId>> {
        let keys: Vec<ElementId> = self.parent.keys().copied().collect();
        let mut by_root: BTreeMap<ElementId, BTreeSet<ElementId>> = BTreeMap::new();
        for k in keys {
            let r = self.find(k);
            by_root.entry(r).or_default().insert(k);
        }
        by_root.into_values().collect()
    }
}

impl<'g> ElementGraph<'g> {
    /// Groups of parallel branches: cycles through `wanted`/`inert` nodes
    /// that contain at least one `wanted` node. Cycles sharing two or more
    /// nodes (a common pair of junctions) belong to the same group.
    pub fn get_parallels(&self, wanted: &[&str], inert: &[&str]) -> Vec<ElementGraph<'g>> {
        let allowed = self.filter(|n| self.is_type_in(n, wanted) || self.is_type_in(n, inert));
        let cycles: Vec<BTreeSet<ElementId>> = allowed
            .get_cycles()
            .into_iter()
            .filter(|c| c.iter().any(|&n| self.is_type_in(n, wanted)))
            .map(|c| c.into_iter().collect())
            .collect();

        let mut groups = Groups::default();
        for (i, a) in cycles.iter().enumerate() {
            let Some(&first) = a.iter().next() else {
                continue;
            };
            for &n in a {
                groups.union(first, n);
            }
            for b in &cycles[i + 1..] {
                if a.intersection(b).count() >= 2 {
                    if let Some(&other) = b.iter().next() {
                        groups.union(first, other);
                    }
                }
            }
        }
        groups
            .sets()
            .into_iter()
            .map(|set| self.subgraph(set))
            .collect()
    }

    /// Groups of two or more `wanted` nodes linked directly or through
    /// nodes of `inert` type only. Each group includes the linking nodes.
    pub fn get_connections_between(
        &self,
        wanted: &[&str],
        inert: &[&str],
    ) -> Vec<ElementGraph<'g>> {
        self.connections_between(|n| self.is_type_in(n, wanted), |n| self.is_type_in(n, inert))
    }

    /// Predicate form of [`get_connections_between`](Self::get_connections_between).
    pub fn connections_between(
        &self,
        wanted: impl Fn(ElementId) -> bool,
        inert: impl Fn(ElementId) -> bool,
    ) -> Vec<ElementGraph<'g>> {
        let wanted_nodes: BTreeSet<ElementId> = self.nodes().filter(|&n| wanted(n)).collect();
        let mut groups = Groups::default();

        for &w in &wanted_nodes {
            groups.find(w);
            for m in self.neighbors(w) {
                if wanted_nodes.contains(&m) {
                    groups.union(w, m);
                }
            }
        }

        let inert_view = self.filter(|n| !wanted_nodes.contains(&n) && inert(n));
        for comp in inert_view.connected_components() {
            let touching: BTreeSet<ElementId> = comp
                .iter()
                .flat_map(|&n| self.neighbors(n))
                .filter(|m| wanted_nodes.contains(m))
                .collect();
            if touching.len() < 2 {
                continue;
            }
            let Some(&anchor) = touching.iter().next() else {
                continue;
            };
            for &n in touching.iter().chain(comp.iter()) {
                groups.union(anchor, n);
            }
        }

        groups
            .sets()
            .into_iter()
            .filter(|set| set.iter().filter(|n| wanted_nodes.contains(n)).count() >= 2)
            .map(|set| self.subgraph(set))
            .collect()
    }
}
