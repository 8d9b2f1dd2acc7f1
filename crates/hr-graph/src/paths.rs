//! Port-level tracing along unbranched runs.

use std::collections::BTreeSet;

use hr_core::PortId;

use crate::error::{GraphError, GraphResult};
use crate::graph::HvacGraph;

impl HvacGraph {
    /// Ports along the run that starts at `start` and continues through
    /// two-port elements.
    ///
    /// The walk stops at the first junction (an element owning more than
    /// two ports), at an open port, or when it comes back to an element it
    /// already passed. With `include_edges` the port by which the walk
    /// entered the junction is appended.
    pub fn get_path_without_junctions(
        &self,
        start: PortId,
        include_edges: bool,
    ) -> GraphResult<Vec<PortId>> {
        let mut node = self.node_of(start).ok_or_else(|| match self.port(start) {
            Ok(p) => GraphError::NotLive {
                element: p.parent(),
            },
            Err(e) => e,
        })?;
        let mut entry = start;
        let mut seen = BTreeSet::new();
        let mut path = Vec::new();

        loop {
            let ports = self.contracted_ports(node);
            if ports.len() > 2 {
                if include_edges {
                    path.push(entry);
                }
                break;
            }
            if !seen.insert(node) {
                break;
            }
            path.push(entry);
            let Some(&exit) = ports.iter().find(|&&p| p != entry) else {
                break;
            };
            path.push(exit);
            let Some(peer) = self.port(exit)?.connection() else {
                break;
            };
            let Some(next) = self.node_of(peer) else {
                break;
            };
            entry = peer;
            node = next;
        }
        Ok(path)
    }
}
