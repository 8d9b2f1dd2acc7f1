//! Node-induced views of the element graph.
//!
//! Matchers never copy the graph; they narrow an [`ElementGraph`] down to
//! the nodes they care about and run the structural queries on that.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use hr_core::{ElementId, PortId};

use crate::graph::HvacGraph;
use crate::model::{Element, Model};

#[derive(Debug, Clone)]
pub struct ElementGraph<'g> {
    graph: &'g HvacGraph,
    nodes: BTreeSet<ElementId>,
}

impl<'g> ElementGraph<'g> {
    pub(crate) fn new(graph: &'g HvacGraph, nodes: BTreeSet<ElementId>) -> Self {
        Self { graph, nodes }
    }

    pub fn graph(&self) -> &'g HvacGraph {
        self.graph
    }

    pub fn model(&self) -> &'g Model {
        self.graph.model()
    }

    pub fn nodes(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn node_set(&self) -> &BTreeSet<ElementId> {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn element(&self, id: ElementId) -> Option<&'g Element> {
        self.graph.model().element(id).ok()
    }

    pub fn ifc_type(&self, id: ElementId) -> &'g str {
        self.element(id).map(|e| e.ifc_type.as_str()).unwrap_or("")
    }

    pub fn is_type_in(&self, id: ElementId, types: &[&str]) -> bool {
        let t = self.ifc_type(id);
        types.iter().any(|w| *w == t)
    }

    /// Neighbors inside this view.
    pub fn neighbors(&self, id: ElementId) -> BTreeSet<ElementId> {
        let mut out = self.graph.neighbors(id);
        out.retain(|n| self.nodes.contains(n));
        out
    }

    pub fn degree(&self, id: ElementId) -> usize {
        self.neighbors(id).len()
    }

    pub fn adjacency(&self) -> BTreeMap<ElementId, BTreeSet<ElementId>> {
        self.nodes.iter().map(|&n| (n, self.neighbors(n))).collect()
    }

    /// Undirected edges, smaller id first, sorted.
    pub fn edges(&self) -> Vec<(ElementId, ElementId)> {
        let mut out = Vec::new();
        for &n in &self.nodes {
            for m in self.neighbors(n) {
                if n < m {
                    out.push((n, m));
                }
            }
        }
        out
    }

    /// View restricted to `nodes` (intersected with this view).
    pub fn subgraph<I: IntoIterator<Item = ElementId>>(&self, nodes: I) -> ElementGraph<'g> {
        let nodes = nodes
            .into_iter()
            .filter(|n| self.nodes.contains(n))
            .collect();
        ElementGraph::new(self.graph, nodes)
    }

    pub fn filter(&self, mut keep: impl FnMut(ElementId) -> bool) -> ElementGraph<'g> {
        let nodes = self.nodes.iter().copied().filter(|&n| keep(n)).collect();
        ElementGraph::new(self.graph, nodes)
    }

    pub fn of_types(&self, types: &[&str]) -> ElementGraph<'g> {
        self.filter(|n| self.is_type_in(n, types))
    }

    pub fn without<I: IntoIterator<Item = ElementId>>(&self, nodes: I) -> ElementGraph<'g> {
        let mut rest = self.nodes.clone();
        for n in nodes {
            rest.remove(&n);
        }
        ElementGraph::new(self.graph, rest)
    }

    /// Connected components ordered by their smallest node.
    pub fn connected_components(&self) -> Vec<BTreeSet<ElementId>> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for &start in &self.nodes {
            if seen.contains(&start) {
                continue;
            }
            let mut comp = BTreeSet::new();
            let mut queue = VecDeque::from([start]);
            seen.insert(start);
            while let Some(n) = queue.pop_front() {
                comp.insert(n);
                for m in self.neighbors(n) {
                    if seen.insert(m) {
                        queue.push_back(m);
                    }
                }
            }
            out.push(comp);
        }
        out
    }

    /// Contracted ports of view nodes whose peer is a live node outside
    /// the view. Unconnected ports are not edge ports.
    pub fn edge_ports(&self) -> Vec<PortId> {
        let mut out = Vec::new();
        for &n in &self.nodes {
            for &p in self.graph.contracted_ports(n) {
                if self
                    .graph
                    .peer_node(p)
                    .is_some_and(|m| !self.nodes.contains(&m))
                {
                    out.push(p);
                }
            }
        }
        out
    }

    /// All contracted ports of the view's nodes.
    pub fn ports(&self) -> Vec<PortId> {
        self.nodes
            .iter()
            .flat_map(|&n| self.graph.contracted_ports(n).iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NetworkBuilder;

    #[test]
    fn components_and_edge_ports() {
        // a - b - c - d, view {a, b, d}
        let mut bld = NetworkBuilder::new();
        let ids: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| bld.add_element(*n, "IfcPipeSegment"))
            .collect();
        let mut ports = Vec::new();
        for &id in &ids {
            ports.push(bld.add_port(id));
            ports.push(bld.add_port(id));
        }
        for i in 0..3 {
            bld.connect(ports[2 * i + 1], ports[2 * i + 2]);
        }
        let g = bld.build().unwrap();
        let view = g.element_graph().subgraph([ids[0], ids[1], ids[3]]);

        let comps = view.connected_components();
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0], BTreeSet::from([ids[0], ids[1]]));
        assert_eq!(view.degree(ids[1]), 1);
        assert_eq!(view.edge_ports(), vec![ports[3], ports[6]]);
        assert_eq!(view.without([ids[0]]).len(), 2);
    }
}
