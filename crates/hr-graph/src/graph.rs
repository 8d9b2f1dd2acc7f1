//! The contracted element graph.
//!
//! Nodes are live elements; each node carries the ports it currently owns
//! (its contraction). Edges are not stored: two nodes are adjacent when one
//! of their contracted ports is connected to a port of the other. Merging
//! swaps a set of nodes for aggregates while keeping the port connections
//! consistent.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use hr_core::{ElementId, PortId};

use crate::attribute::{Attr, AttributeState};
use crate::error::{GraphError, GraphResult};
use crate::model::{Element, Model, Port, flow_compatible};
use crate::resolve::ResolverChain;
use crate::validate;
use crate::view::ElementGraph;

/// Port of a removed element -> the port that takes over its connection.
/// `None` means the port disappears together with its element.
pub type ReplacementMapping = BTreeMap<PortId, Option<PortId>>;

/// Two connected ports, smaller id first.
pub type Connection = (PortId, PortId);

pub(crate) fn ordered(a: PortId, b: PortId) -> Connection {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub removed: Vec<ElementId>,
    pub added: Vec<ElementId>,
    pub links: usize,
}

#[derive(Debug, Clone)]
pub struct HvacGraph {
    model: Model,
    nodes: BTreeMap<ElementId, Vec<PortId>>,
    port_node: HashMap<PortId, ElementId>,
    inner_connections: Vec<Connection>,
}

impl HvacGraph {
    /// Contract a model into a graph. Every element not absorbed into an
    /// aggregate becomes a node owning all of its ports.
    pub fn from_model(model: Model) -> GraphResult<Self> {
        validate::validate_model(&model)?;
        let mut graph = Self {
            model,
            nodes: BTreeMap::new(),
            port_node: HashMap::new(),
            inner_connections: Vec::new(),
        };
        let live: Vec<(ElementId, Vec<PortId>)> = graph
            .model
            .elements()
            .iter()
            .filter(|e| e.aggregation().is_none())
            .map(|e| (e.id, e.ports().to_vec()))
            .collect();
        for (id, ports) in live {
            graph.insert_node(id, ports)?;
        }
        tracing::debug!(
            nodes = graph.nodes.len(),
            ports = graph.port_node.len(),
            "graph contracted"
        );
        Ok(graph)
    }

    fn insert_node(&mut self, id: ElementId, ports: Vec<PortId>) -> GraphResult<()> {
        for &p in &ports {
            if let Some(owner) = self.port_node.insert(p, id) {
                return Err(GraphError::InconsistentContraction {
                    port: p,
                    element: owner,
                });
            }
        }
        self.nodes.insert(id, ports);
        Ok(())
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Mutable model access for creating aggregates and their ports.
    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn element(&self, id: ElementId) -> GraphResult<&Element> {
        self.model.element(id)
    }

    pub fn port(&self, id: PortId) -> GraphResult<&Port> {
        self.model.port(id)
    }

    pub fn element_graph(&self) -> ElementGraph<'_> {
        ElementGraph::new(self, self.nodes.keys().copied().collect())
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.nodes.contains_key(&element)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.nodes.keys().copied()
    }

    /// Ports currently owned by a node; empty for non-live elements.
    pub fn contracted_ports(&self, element: ElementId) -> &[PortId] {
        self.nodes.get(&element).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Live node owning a port.
    pub fn node_of(&self, port: PortId) -> Option<ElementId> {
        self.port_node.get(&port).copied()
    }

    /// Live node on the other side of a port's connection.
    pub fn peer_node(&self, port: PortId) -> Option<ElementId> {
        let peer = self.model.port(port).ok()?.connection()?;
        self.node_of(peer)
    }

    pub fn neighbors(&self, element: ElementId) -> BTreeSet<ElementId> {
        self.contracted_ports(element)
            .iter()
            .filter_map(|&p| self.peer_node(p))
            .filter(|&n| n != element)
            .collect()
    }

    /// All connections between live nodes.
    pub fn connections(&self) -> Vec<Connection> {
        let mut out = BTreeSet::new();
        for (&p, &node) in &self.port_node {
            let Ok(port) = self.model.port(p) else {
                continue;
            };
            if let Some(q) = port.connection() {
                if self.node_of(q).is_some_and(|n| n != node) {
                    out.insert(ordered(p, q));
                }
            }
        }
        out.into_iter().collect()
    }

    /// Connections with both ends owned by `nodes`.
    pub fn inner_connections_of(&self, nodes: &BTreeSet<ElementId>) -> Vec<Connection> {
        let mut out = BTreeSet::new();
        for &n in nodes {
            for &p in self.contracted_ports(n) {
                let Some(q) = self.model.port(p).ok().and_then(Port::connection) else {
                    continue;
                };
                if self.node_of(q).is_some_and(|m| nodes.contains(&m)) {
                    out.insert(ordered(p, q));
                }
            }
        }
        out.into_iter().collect()
    }

    /// Connections that disappeared inside aggregates, in merge order.
    pub fn absorbed_connections(&self) -> &[Connection] {
        &self.inner_connections
    }

    fn not_live(&self, port: PortId) -> GraphError {
        match self.model.port(port) {
            Ok(p) => GraphError::NotLive { element: p.parent() },
            Err(e) => e,
        }
    }

    /// Replace every node owning a mapped port.
    ///
    /// Each port mapped to `Some(rep)` hands its external connection over to
    /// `rep`. When the peer is itself mapped, the link goes to the peer's
    /// replacement instead. Aggregates taking over the removed elements
    /// become nodes owning their aggregation ports, and their members are
    /// marked as absorbed. Every check runs before the graph is touched.
    pub fn merge(
        &mut self,
        mapping: &ReplacementMapping,
        inner_connections: &[Connection],
    ) -> GraphResult<MergeOutcome> {
        let mut removed = BTreeSet::new();
        for &port in mapping.keys() {
            let node = self.node_of(port).ok_or_else(|| self.not_live(port))?;
            removed.insert(node);
        }

        let mut links = BTreeSet::new();
        for (&orig, rep) in mapping {
            let Some(rep) = *rep else {
                continue;
            };
            self.model.port(rep)?;
            let peer = self
                .model
                .port(orig)?
                .connection()
                .ok_or(GraphError::DanglingPort { port: orig })?;
            let target = match mapping.get(&peer) {
                Some(Some(p)) => *p,
                Some(None) => return Err(GraphError::InteriorMapping { port: orig, peer }),
                None => match self.node_of(peer) {
                    Some(n) if removed.contains(&n) => {
                        return Err(GraphError::InteriorMapping { port: orig, peer });
                    }
                    Some(_) => peer,
                    None => return Err(GraphError::DanglingPort { port: orig }),
                },
            };
            if target != rep {
                links.insert(ordered(rep, target));
            }
        }

        for &(a, b) in inner_connections {
            let inside = |p: PortId| {
                self.node_of(p).is_some_and(|n| removed.contains(&n))
            };
            if !inside(a) || !inside(b) {
                return Err(GraphError::ForeignInnerConnection { a, b });
            }
        }

        let added = self.incoming_aggregates(mapping, &removed)?;
        self.check_links(&links, &removed)?;

        for &node in &removed {
            for p in self.contracted_ports(node).to_vec() {
                let external = match self.model.port(p)?.connection() {
                    Some(q) => !self.node_of(q).is_some_and(|n| removed.contains(&n)),
                    None => false,
                };
                if external {
                    self.model.disconnect(p)?;
                }
            }
        }

        for &node in &removed {
            if let Some(ports) = self.nodes.remove(&node) {
                for p in ports {
                    self.port_node.remove(&p);
                }
            }
            self.model.retire(node);
        }

        for &agg in &added {
            let ports = self.model.element(agg)?.ports().to_vec();
            self.insert_node(agg, ports)?;
            for m in self.model.element(agg)?.members().to_vec() {
                self.model.element_mut(m)?.aggregation = Some(agg);
            }
        }

        for &(a, b) in &links {
            self.model.connect(a, b)?;
        }

        for (&orig, rep) in mapping {
            let Some(rep) = *rep else {
                continue;
            };
            let rp = self.model.port(rep)?;
            if rp.originals().contains(&orig) {
                let parent = rp.parent();
                self.model.set_aggregated_parent(orig, parent)?;
            }
        }
        self.inner_connections.extend_from_slice(inner_connections);

        tracing::debug!(
            removed = removed.len(),
            added = added.len(),
            links = links.len(),
            "merged"
        );
        Ok(MergeOutcome {
            removed: removed.into_iter().collect(),
            added,
            links: links.len(),
        })
    }

    /// Aggregates that become nodes in a merge removing `removed`: parents
    /// of replacement ports and aggregates whose members all go.
    fn incoming_aggregates(
        &self,
        mapping: &ReplacementMapping,
        removed: &BTreeSet<ElementId>,
    ) -> GraphResult<Vec<ElementId>> {
        let mut candidates = BTreeSet::new();
        for rep in mapping.values().flatten() {
            candidates.insert(self.model.port(*rep)?.parent());
        }
        for e in self.model.elements() {
            if e.is_aggregate() && e.members().iter().all(|m| removed.contains(m)) {
                candidates.insert(e.id);
            }
        }

        let mut added = Vec::new();
        for agg in candidates {
            if self.contains(agg) || removed.contains(&agg) || !self.model.is_registered(agg) {
                continue;
            }
            for &m in self.model.element(agg)?.members() {
                if let Some(aggregate) = self.model.element(m)?.aggregation() {
                    return Err(GraphError::AlreadyAggregated {
                        element: m,
                        aggregate,
                    });
                }
            }
            added.push(agg);
        }
        Ok(added)
    }

    /// Each port takes at most one new link, must be free once the removed
    /// nodes are disconnected, and flow masters must agree.
    fn check_links(
        &self,
        links: &BTreeSet<Connection>,
        removed: &BTreeSet<ElementId>,
    ) -> GraphResult<()> {
        let mut planned: HashMap<PortId, PortId> = HashMap::new();
        for &(a, b) in links {
            for (port, requested) in [(a, b), (b, a)] {
                if let Some(&peer) = planned.get(&port) {
                    return Err(GraphError::AlreadyConnected {
                        port,
                        peer,
                        requested,
                    });
                }
                if let Some(peer) = self.model.port(port)?.connection() {
                    if !self.node_of(peer).is_some_and(|n| removed.contains(&n)) {
                        return Err(GraphError::AlreadyConnected {
                            port,
                            peer,
                            requested,
                        });
                    }
                }
                planned.insert(port, requested);
            }
            if !flow_compatible(self.model.port(a)?, self.model.port(b)?) {
                return Err(GraphError::FlowMasterConflict { port: a, peer: b });
            }
        }
        Ok(())
    }

    /// Delete nodes together with their connections.
    pub fn remove_elements(&mut self, elements: &[ElementId]) -> GraphResult<()> {
        for &e in elements {
            if !self.contains(e) {
                return Err(GraphError::NotLive { element: e });
            }
        }
        for &e in elements {
            if let Some(ports) = self.nodes.remove(&e) {
                for p in ports {
                    self.model.disconnect(p)?;
                    self.port_node.remove(&p);
                }
            }
            self.model.retire(e);
        }
        tracing::debug!(count = elements.len(), "elements removed");
        Ok(())
    }

    /// Drop ports from their nodes' contractions, disconnecting them first.
    pub fn remove_ports(&mut self, ports: &[PortId]) -> GraphResult<()> {
        for &p in ports {
            let node = self.node_of(p).ok_or_else(|| self.not_live(p))?;
            self.model.disconnect(p)?;
            self.port_node.remove(&p);
            if let Some(list) = self.nodes.get_mut(&node) {
                list.retain(|q| *q != p);
            }
            self.model.retire_port_guid(p);
        }
        Ok(())
    }

    /// Unregister an aggregate that was built but will not be merged, so it
    /// can neither be picked up by a later merge nor block its guid.
    pub fn discard_aggregate(&mut self, aggregate: ElementId) -> GraphResult<()> {
        if self.contains(aggregate) || !self.model.element(aggregate)?.is_aggregate() {
            return Err(GraphError::NotLive { element: aggregate });
        }
        self.model.retire(aggregate);
        Ok(())
    }

    /// Fill unknown attribute slots of all live nodes. Returns how many
    /// slots became available.
    pub fn resolve_attributes(&mut self, chain: &ResolverChain, attrs: &[Attr]) -> usize {
        let mut resolved = 0;
        let ids: Vec<ElementId> = self.nodes.keys().copied().collect();
        for id in ids {
            for &attr in attrs {
                let Ok(element) = self.model.element(id) else {
                    continue;
                };
                if !element.attributes.state(attr).is_unknown() {
                    continue;
                }
                let state = chain.resolve(element, attr);
                if matches!(state, AttributeState::Available(_)) {
                    resolved += 1;
                }
                if let Ok(element) = self.model.element_mut(id) {
                    element.attributes.set_state(attr, state);
                }
            }
        }
        tracing::debug!(resolved, "attributes resolved");
        resolved
    }
}
