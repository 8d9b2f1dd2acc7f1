//! Export of element views for inspection.

use std::collections::HashMap;

use petgraph::dot::{Config, Dot};
use petgraph::graph::{NodeIndex, UnGraph};

use hr_core::ElementId;

use crate::view::ElementGraph;

impl<'g> ElementGraph<'g> {
    /// Undirected petgraph copy labelled `name (type)`.
    pub fn to_petgraph(&self) -> UnGraph<String, ()> {
        let mut g = UnGraph::new_undirected();
        let mut index: HashMap<ElementId, NodeIndex> = HashMap::new();
        for n in self.nodes() {
            let label = match self.element(n) {
                Some(e) => format!("{} ({})", e.name, e.ifc_type),
                None => n.to_string(),
            };
            index.insert(n, g.add_node(label));
        }
        for (a, b) in self.edges() {
            if let (Some(&ia), Some(&ib)) = (index.get(&a), index.get(&b)) {
                g.add_edge(ia, ib, ());
            }
        }
        g
    }

    /// Graphviz dot source of the view.
    pub fn to_dot(&self) -> String {
        let g = self.to_petgraph();
        format!("{:?}", Dot::with_config(&g, &[Config::EdgeNoLabel]))
    }
}
