//! Open ports and the unbranched runs hanging off them.
//!
//! A port without a connection is a dead end. On a junction only the port
//! itself goes; on anything else the whole run up to the next junction is
//! removed, including the junction port it ends in.

use std::collections::BTreeSet;

use hr_core::{ElementId, PortId};
use hr_graph::{GraphResult, HvacGraph};

/// Removal plan for one open port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadEnd {
    pub port: PortId,
    /// Ports to drop from elements that stay.
    pub ports: Vec<PortId>,
    /// Elements covered completely by the run.
    pub elements: Vec<ElementId>,
}

/// Decides whether a detected dead end is really removed.
pub trait DeadEndResolver {
    fn remove(&self, graph: &HvacGraph, dead_end: &DeadEnd) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveAll;

impl DeadEndResolver for RemoveAll {
    fn remove(&self, _graph: &HvacGraph, _dead_end: &DeadEnd) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl DeadEndResolver for KeepAll {
    fn remove(&self, _graph: &HvacGraph, _dead_end: &DeadEnd) -> bool {
        false
    }
}

/// Every contracted port of a live element without a connection.
pub fn identify(graph: &HvacGraph) -> Vec<PortId> {
    let mut open = Vec::new();
    for node in graph.node_ids() {
        for &p in graph.contracted_ports(node) {
            if graph.port(p).is_ok_and(|port| port.connection().is_none()) {
                open.push(p);
            }
        }
    }
    tracing::info!(dead_ends = open.len(), "dead ends found");
    open
}

pub fn plan(graph: &HvacGraph, dead_ends: &[PortId]) -> GraphResult<Vec<DeadEnd>> {
    let mut plans = Vec::with_capacity(dead_ends.len());
    for &port in dead_ends {
        let Some(node) = graph.node_of(port) else {
            continue;
        };
        if graph.contracted_ports(node).len() > 2 {
            plans.push(DeadEnd {
                port,
                ports: vec![port],
                elements: Vec::new(),
            });
            continue;
        }

        let path = graph.get_path_without_junctions(port, true)?;
        let on_path: BTreeSet<PortId> = path.iter().copied().collect();
        let mut elements = BTreeSet::new();
        for &p in &path {
            if let Some(n) = graph.node_of(p) {
                if graph.contracted_ports(n).iter().all(|q| on_path.contains(q)) {
                    elements.insert(n);
                }
            }
        }
        let ports = path
            .into_iter()
            .filter(|&p| graph.node_of(p).is_some_and(|n| !elements.contains(&n)))
            .collect();
        plans.push(DeadEnd {
            port,
            ports,
            elements: elements.into_iter().collect(),
        });
    }
    Ok(plans)
}

/// Apply the plans the resolver agrees with. Plans overlapping an earlier
/// removal are skipped. Returns how many dead ends were removed.
pub fn apply(
    graph: &mut HvacGraph,
    plans: &[DeadEnd],
    resolver: &dyn DeadEndResolver,
) -> GraphResult<usize> {
    let mut removed = 0;
    for dead_end in plans {
        let live = dead_end.elements.iter().all(|&e| graph.contains(e))
            && dead_end.ports.iter().all(|&p| graph.node_of(p).is_some());
        if !live {
            tracing::debug!(port = %dead_end.port, "dead end already removed");
            continue;
        }
        if !resolver.remove(graph, dead_end) {
            continue;
        }
        graph.remove_elements(&dead_end.elements)?;
        graph.remove_ports(&dead_end.ports)?;
        removed += 1;
    }
    tracing::info!(removed, "dead ends removed");
    Ok(removed)
}
