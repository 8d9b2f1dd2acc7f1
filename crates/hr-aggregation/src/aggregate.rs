//! Aggregate construction and the merge step that applies it.
//!
//! Matchers only describe candidates ([`Match`]). Turning one into an
//! [`Aggregate`] creates the aggregate element and its aggregation ports in
//! the model and records how every member port is replaced; nothing leaves
//! the live graph until [`merge_aggregates`] hands those mappings to
//! [`HvacGraph::merge`].

use std::collections::{BTreeMap, BTreeSet};

use hr_core::{ElementId, PortId};
use hr_graph::{Attr, Attributes, Connection, HvacGraph, MergeOutcome, ReplacementMapping};
use sha2::{Digest, Sha256};

use crate::error::{AggregationError, AggregationResult};
use crate::kind::AggregateKind;

/// Values a matcher already computed while testing its predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchMeta {
    pub values: BTreeMap<Attr, f64>,
    /// Boundary ports chosen by the matcher, one group per aggregation port.
    /// Empty when the constructor derives them itself.
    pub boundary: Vec<Vec<PortId>>,
}

impl MatchMeta {
    pub fn with_value(mut self, attr: Attr, value: f64) -> Self {
        self.values.insert(attr, value);
        self
    }
}

/// A candidate node set together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub kind: AggregateKind,
    /// Member nodes; chains keep their path order.
    pub nodes: Vec<ElementId>,
    pub meta: MatchMeta,
}

impl Match {
    pub fn new(kind: AggregateKind, nodes: Vec<ElementId>) -> Self {
        Self {
            kind,
            nodes,
            meta: MatchMeta::default(),
        }
    }

    pub fn with_meta(mut self, meta: MatchMeta) -> Self {
        self.meta = meta;
        self
    }

    /// True while every member is still a live node.
    pub fn is_live(&self, graph: &HvacGraph) -> bool {
        self.nodes.iter().all(|&n| graph.contains(n))
    }
}

/// Everything needed to create an aggregate element.
#[derive(Debug, Clone)]
pub struct AggregatePlan {
    pub kind: AggregateKind,
    pub name: String,
    pub members: Vec<ElementId>,
    pub port_groups: Vec<Vec<PortId>>,
    pub record: Attributes,
}

/// A created, not yet merged aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub id: ElementId,
    pub kind: AggregateKind,
    pub name: String,
    pub guid: String,
    pub members: Vec<ElementId>,
    pub ports: Vec<PortId>,
    mapping: ReplacementMapping,
    inner_connections: Vec<Connection>,
}

impl Aggregate {
    /// Every member port, mapped to the aggregation port that takes over
    /// its connection or to `None`.
    pub fn get_replacement_mapping(&self) -> &ReplacementMapping {
        &self.mapping
    }

    pub fn inner_connections(&self) -> &[Connection] {
        &self.inner_connections
    }
}

/// Reproducible guid: SHA-256 over the kind tag and the sorted member guids.
pub fn aggregate_guid(kind: AggregateKind, member_guids: &[&str]) -> String {
    let mut guids = member_guids.to_vec();
    guids.sort_unstable();
    let mut hasher = Sha256::new();
    hasher.update(kind.tag().as_bytes());
    for g in guids {
        hasher.update(b"\n");
        hasher.update(g.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Create the aggregate element, one aggregation port per port group and
/// the replacement mapping. The graph topology is left untouched and the
/// members stay unclaimed until the aggregate is merged.
pub fn build_aggregate(graph: &mut HvacGraph, plan: AggregatePlan) -> AggregationResult<Aggregate> {
    if plan.members.is_empty() {
        return Err(AggregationError::EmptyMatch);
    }
    let member_set: BTreeSet<ElementId> = plan.members.iter().copied().collect();
    for &m in &member_set {
        if !graph.contains(m) {
            return Err(hr_graph::GraphError::NotLive { element: m }.into());
        }
    }

    let guid = {
        let model = graph.model();
        let mut guids = Vec::with_capacity(plan.members.len());
        for &m in &plan.members {
            guids.push(model.element(m)?.guid.as_str());
        }
        aggregate_guid(plan.kind, &guids)
    };

    let mut mapping = ReplacementMapping::new();
    for &m in &member_set {
        for &p in graph.contracted_ports(m) {
            mapping.insert(p, None);
        }
    }
    let inner_connections = graph.inner_connections_of(&member_set);
    for &orig in plan.port_groups.iter().flatten() {
        if !mapping.contains_key(&orig) {
            return Err(AggregationError::ForeignPort { port: orig });
        }
    }

    let id = graph
        .model_mut()
        .add_aggregate(guid.clone(), plan.name.clone(), plan.kind.tag(), &plan.members)?;
    let mut ports = Vec::with_capacity(plan.port_groups.len());
    for group in &plan.port_groups {
        let ap = graph.model_mut().add_aggregation_port(id, group)?;
        for &orig in group {
            mapping.insert(orig, Some(ap));
        }
        ports.push(ap);
    }
    graph.model_mut().element_mut(id)?.attributes = plan.record;

    for (&p, rep) in &mapping {
        if rep.is_none()
            && graph
                .peer_node(p)
                .is_some_and(|n| !member_set.contains(&n))
        {
            tracing::warn!(aggregate = %plan.name, port = %p, "boundary connection without replacement port");
        }
    }

    tracing::debug!(
        aggregate = %plan.name,
        kind = %plan.kind,
        members = plan.members.len(),
        ports = ports.len(),
        "aggregate created"
    );
    Ok(Aggregate {
        id,
        kind: plan.kind,
        name: plan.name,
        guid,
        members: plan.members,
        ports,
        mapping,
        inner_connections,
    })
}

/// Apply several aggregates built from disjoint member sets in one merge.
pub fn merge_aggregates(
    graph: &mut HvacGraph,
    aggregates: &[Aggregate],
) -> AggregationResult<MergeOutcome> {
    let mut mapping = ReplacementMapping::new();
    let mut inner = Vec::new();
    for agg in aggregates {
        mapping.extend(agg.mapping.iter().map(|(k, v)| (*k, *v)));
        inner.extend_from_slice(&agg.inner_connections);
    }
    Ok(graph.merge(&mapping, &inner)?)
}

/// Mapping that deletes `chain` and joins its two external neighbours.
///
/// Returns `None` unless the chain has exactly two external connections to
/// two different elements.
pub fn empty_mapping(
    graph: &HvacGraph,
    chain: &[ElementId],
) -> Option<(ReplacementMapping, Vec<Connection>)> {
    let view = graph.element_graph().subgraph(chain.iter().copied());
    let edge = view.edge_ports();
    let [first, second] = edge.as_slice() else {
        tracing::info!(edge_ports = edge.len(), "chain not removable, kept");
        return None;
    };
    let peer = |p: PortId| graph.port(p).ok().and_then(|p| p.connection());
    let (ext0, ext1) = (peer(*first)?, peer(*second)?);
    if graph.node_of(ext0) == graph.node_of(ext1) {
        tracing::info!("chain loops back onto one element, kept");
        return None;
    }

    let mut mapping: ReplacementMapping = view.ports().into_iter().map(|p| (p, None)).collect();
    mapping.insert(*first, Some(ext1));
    mapping.insert(*second, Some(ext0));
    let inner = graph.inner_connections_of(view.node_set());
    Some((mapping, inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hr_graph::NetworkBuilder;

    /// a - b - c - d, two ports each.
    fn row() -> (HvacGraph, Vec<ElementId>, Vec<PortId>) {
        let mut b = NetworkBuilder::new();
        let ids: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| b.add_element(*n, "IfcPipeSegment"))
            .collect();
        let mut ports = Vec::new();
        for &id in &ids {
            ports.push(b.add_port(id));
            ports.push(b.add_port(id));
        }
        for i in 0..3 {
            b.connect(ports[2 * i + 1], ports[2 * i + 2]);
        }
        (b.build().unwrap(), ids, ports)
    }

    #[test]
    fn guid_ignores_member_order() {
        let a = aggregate_guid(AggregateKind::PipeStrand, &["x", "y"]);
        let b = aggregate_guid(AggregateKind::PipeStrand, &["y", "x"]);
        let c = aggregate_guid(AggregateKind::Consumer, &["x", "y"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn build_maps_every_member_port() {
        let (mut g, ids, ports) = row();
        let plan = AggregatePlan {
            kind: AggregateKind::PipeStrand,
            name: "s".into(),
            members: vec![ids[1], ids[2]],
            port_groups: vec![vec![ports[2]], vec![ports[5]]],
            record: Attributes::new(),
        };
        let agg = build_aggregate(&mut g, plan).unwrap();
        let mapping = agg.get_replacement_mapping();
        assert_eq!(mapping.len(), 4);
        assert_eq!(mapping[&ports[2]], Some(agg.ports[0]));
        assert_eq!(mapping[&ports[3]], None);
        assert_eq!(agg.inner_connections(), &[(ports[3], ports[4])]);
        // nothing merged yet
        assert!(g.contains(ids[1]));

        merge_aggregates(&mut g, &[agg.clone()]).unwrap();
        assert!(g.contains(agg.id));
        assert_eq!(g.neighbors(agg.id), BTreeSet::from([ids[0], ids[3]]));
    }

    #[test]
    fn empty_plan_is_rejected() {
        let (mut g, _, _) = row();
        let plan = AggregatePlan {
            kind: AggregateKind::PipeStrand,
            name: "s".into(),
            members: Vec::new(),
            port_groups: Vec::new(),
            record: Attributes::new(),
        };
        assert_eq!(build_aggregate(&mut g, plan), Err(AggregationError::EmptyMatch));
    }

    #[test]
    fn failed_build_leaves_graph_alone() {
        let (mut g, ids, ports) = row();
        let elements = g.model().elements().len();
        let plan = AggregatePlan {
            kind: AggregateKind::PipeStrand,
            name: "s".into(),
            members: vec![ids[1]],
            port_groups: vec![vec![ports[2]], vec![ports[6]]],
            record: Attributes::new(),
        };
        assert_eq!(
            build_aggregate(&mut g, plan),
            Err(AggregationError::ForeignPort { port: ports[6] })
        );
        assert_eq!(g.model().elements().len(), elements);
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.element(ids[1]).unwrap().aggregation(), None);
    }

    #[test]
    fn members_are_claimed_on_merge() {
        let (mut g, ids, ports) = row();
        let plan = AggregatePlan {
            kind: AggregateKind::PipeStrand,
            name: "s".into(),
            members: vec![ids[1]],
            port_groups: vec![vec![ports[2]], vec![ports[3]]],
            record: Attributes::new(),
        };
        let agg = build_aggregate(&mut g, plan).unwrap();
        assert_eq!(g.element(ids[1]).unwrap().aggregation(), None);
        merge_aggregates(&mut g, &[agg.clone()]).unwrap();
        assert_eq!(g.element(ids[1]).unwrap().aggregation(), Some(agg.id));
    }

    #[test]
    fn empty_mapping_joins_neighbours() {
        let (mut g, ids, ports) = row();
        let (mapping, inner) = empty_mapping(&g, &[ids[1], ids[2]]).unwrap();
        assert_eq!(mapping[&ports[2]], Some(ports[6]));
        assert_eq!(mapping[&ports[5]], Some(ports[1]));
        g.merge(&mapping, &inner).unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.port(ports[1]).unwrap().connection(), Some(ports[6]));
    }

    #[test]
    fn empty_mapping_needs_two_external_connections() {
        let (g, ids, _) = row();
        assert!(empty_mapping(&g, &[ids[0], ids[1]]).is_none());
    }
}
