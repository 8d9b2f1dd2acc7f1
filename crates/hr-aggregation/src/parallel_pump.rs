//! Pumps working in parallel between two shared junctions.

use std::collections::{BTreeMap, BTreeSet};

use hr_core::{ElementId, PortId};
use hr_graph::types::{PIPE_FITTING, PIPE_SEGMENT, PUMP};
use hr_graph::{ElementGraph, HvacGraph};

use crate::aggregate::{Aggregate, AggregatePlan, Match, build_aggregate, merge_aggregates};
use crate::calc::{ParallelPumpRecord, is_pipe_like, is_pump_like};
use crate::error::{AggregationError, AggregationResult};
use crate::kind::AggregateKind;
use crate::pipe_fitting::build_fitting;
use crate::traits::Matcher;

const WANTED: &[&str] = &[PUMP, "ParallelPump"];
const INERT: &[&str] = &[
    PIPE_SEGMENT,
    PIPE_FITTING,
    "PipeStrand",
    "AggregatedPipeFitting",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelPump;

impl ParallelPump {
    pub fn new() -> Self {
        Self
    }
}

/// Members with more than two ports that are not pumps themselves.
fn edge_elements(graph: &HvacGraph, nodes: &BTreeSet<ElementId>) -> Vec<ElementId> {
    nodes
        .iter()
        .copied()
        .filter(|&n| is_junction(graph, n))
        .collect()
}

fn is_junction(graph: &HvacGraph, n: ElementId) -> bool {
    graph.contracted_ports(n).len() > 2
        && graph.element(n).is_ok_and(|e| !is_pump_like(e))
}

/// Junctions linked through pipes only, grouped for fitting aggregates.
fn junction_groups(graph: &HvacGraph, nodes: &BTreeSet<ElementId>) -> Vec<Vec<ElementId>> {
    let view = graph.element_graph().subgraph(nodes.iter().copied());
    view.connections_between(
        |n| is_junction(graph, n),
        |n| !is_junction(graph, n) && graph.element(n).is_ok_and(is_pipe_like),
    )
    .into_iter()
    .map(|v| v.nodes().collect())
    .collect()
}

/// Junction count once every group is collapsed into one fitting. Fails
/// when a group has too few edge ports to become a fitting.
fn junctions_after_grouping(
    graph: &HvacGraph,
    junctions: &[ElementId],
    groups: &[Vec<ElementId>],
) -> AggregationResult<usize> {
    let mut count = junctions.len();
    for group in groups {
        count -= group.iter().filter(|n| junctions.contains(n)).count();
        let edge = graph
            .element_graph()
            .subgraph(group.iter().copied())
            .edge_ports()
            .len();
        if edge < 2 {
            return Err(AggregationError::TooFewEdgePorts { found: edge });
        }
        if edge > 2 {
            count += 1;
        }
    }
    Ok(count)
}

/// Collapse the junction groups into fitting aggregates and merge them right
/// away. Returns the updated node set.
fn merge_additional_junctions(
    graph: &mut HvacGraph,
    name: &str,
    mut nodes: BTreeSet<ElementId>,
    groups: &[Vec<ElementId>],
) -> AggregationResult<BTreeSet<ElementId>> {
    for (i, group) in groups.iter().enumerate() {
        let agg = build_fitting(graph, &format!("{name} junction {}", i + 1), group, &[])?;
        merge_aggregates(graph, std::slice::from_ref(&agg))?;
        for n in group {
            nodes.remove(n);
        }
        nodes.insert(agg.id);
    }
    tracing::debug!(aggregate = name, merged = groups.len(), "additional junctions merged");
    Ok(nodes)
}

/// Junction ports leading out of the group.
fn outer_ports(graph: &HvacGraph, junctions: &[ElementId], nodes: &BTreeSet<ElementId>) -> Vec<PortId> {
    junctions
        .iter()
        .flat_map(|&j| graph.contracted_ports(j).iter().copied())
        .filter(|&p| graph.peer_node(p).is_some_and(|n| !nodes.contains(&n)))
        .collect()
}

impl Matcher for ParallelPump {
    fn kind(&self) -> AggregateKind {
        AggregateKind::ParallelPump
    }

    fn find_matches(&self, graph: &ElementGraph<'_>) -> Vec<Match> {
        let found: Vec<Match> = graph
            .get_parallels(WANTED, INERT)
            .into_iter()
            .map(|g| Match::new(AggregateKind::ParallelPump, g.nodes().collect()))
            .collect();
        tracing::info!(matches = found.len(), "parallel pumps found");
        found
    }

    /// The first aggregate is the pump group. When several outer ports lead
    /// to the same element, that element is wrapped into a fitting aggregate
    /// whose combined port faces the group's combined port; those fitting
    /// aggregates follow.
    fn build(
        &self,
        graph: &mut HvacGraph,
        name: &str,
        found: &Match,
    ) -> AggregationResult<Vec<Aggregate>> {
        let mut nodes: BTreeSet<ElementId> = found.nodes.iter().copied().collect();
        let mut junctions = edge_elements(graph, &nodes);

        // Everything that can reject the match is checked before the
        // junction fittings are merged.
        let groups = if junctions.len() > 2 {
            let groups = junction_groups(graph, &nodes);
            let remaining = junctions_after_grouping(graph, &junctions, &groups)?;
            if remaining > 2 {
                return Err(AggregationError::AmbiguousTopology {
                    what: "edge elements",
                    expected: 2,
                    found: remaining,
                });
            }
            groups
        } else {
            Vec::new()
        };
        let found_outer = outer_ports(graph, &junctions, &nodes).len();
        if found_outer < 2 {
            return Err(AggregationError::TooFewEdgePorts { found: found_outer });
        }

        if !groups.is_empty() {
            nodes = merge_additional_junctions(graph, name, nodes, &groups)?;
            junctions = edge_elements(graph, &nodes);
        }
        let outer = outer_ports(graph, &junctions, &nodes);

        let members: Vec<ElementId> = nodes.iter().copied().collect();
        let record = ParallelPumpRecord::compute(graph.model(), name, &members);

        let mut sides = Vec::new();
        let groups: Vec<Vec<PortId>> = if outer.len() == 2 {
            outer.iter().map(|&p| vec![p]).collect()
        } else {
            let mut by_parent: BTreeMap<ElementId, Vec<PortId>> = BTreeMap::new();
            for &p in &outer {
                if let Some(parent) = graph.peer_node(p) {
                    by_parent.entry(parent).or_default().push(p);
                }
            }
            for (&parent, ports) in &by_parent {
                if ports.len() < 2 {
                    continue;
                }
                let mut facing = Vec::with_capacity(ports.len());
                for &p in ports {
                    if let Some(q) = graph.port(p)?.connection() {
                        facing.push(q);
                    }
                }
                sides.push((parent, facing));
            }
            by_parent.into_values().collect()
        };

        let plan = AggregatePlan {
            kind: AggregateKind::ParallelPump,
            name: name.to_owned(),
            members,
            port_groups: groups,
            record: record.to_attributes(),
        };
        let mut out = vec![build_aggregate(graph, plan)?];
        for (i, (parent, facing)) in sides.into_iter().enumerate() {
            let side_name = format!("{name} connection {}", i + 1);
            match build_fitting(graph, &side_name, &[parent], &facing) {
                Ok(side) => out.push(side),
                Err(e) => {
                    for agg in &out {
                        graph.discard_aggregate(agg.id)?;
                    }
                    return Err(e);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hr_graph::{Attr, NetworkBuilder};

    fn link(b: &mut NetworkBuilder, x: ElementId, y: ElementId) {
        let px = b.add_port(x);
        let py = b.add_port(y);
        b.connect(px, py);
    }

    fn pump(b: &mut NetworkBuilder, name: &str) -> ElementId {
        let p = b.add_element(name, "IfcPump");
        b.set_attribute(p, Attr::RatedPower, 1.0);
        b.set_attribute(p, Attr::RatedHeight, 5.0);
        b.set_attribute(p, Attr::RatedVolumeFlow, 2.0);
        p
    }

    #[test]
    fn extra_junctions_are_consolidated() {
        // in - t1a - t1b, pumps from t1a/t1b to t2, t2 - out
        let mut b = NetworkBuilder::new();
        let inlet = b.add_element("in", "IfcValve");
        let t1a = b.add_element("t1a", "IfcPipeFitting");
        let t1b = b.add_element("t1b", "IfcPipeFitting");
        let t2 = b.add_element("t2", "IfcPipeFitting");
        let outlet = b.add_element("out", "IfcValve");
        let p1 = pump(&mut b, "p1");
        let p2 = pump(&mut b, "p2");
        let p3 = pump(&mut b, "p3");
        link(&mut b, inlet, t1a);
        link(&mut b, t1a, t1b);
        link(&mut b, t1a, p1);
        link(&mut b, t1b, p2);
        link(&mut b, t1b, p3);
        for p in [p1, p2, p3] {
            link(&mut b, p, t2);
        }
        link(&mut b, t2, outlet);
        let mut g = b.build().unwrap();

        let matcher = ParallelPump::new();
        let found = matcher.find_matches(&g.element_graph());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].nodes.len(), 6);

        let aggs = matcher.build(&mut g, "pp", &found[0]).unwrap();
        assert_eq!(aggs.len(), 1);
        assert!(!g.contains(t1a));
        merge_aggregates(&mut g, &aggs).unwrap();
        let pp = aggs[0].id;
        assert_eq!(g.neighbors(pp), BTreeSet::from([inlet, outlet]));
        assert_eq!(g.element(pp).unwrap().number(Attr::RatedPower), Some(3.0));
    }

    #[test]
    fn shared_outer_neighbor_gets_combined_ports() {
        // chamber d is attached to t1 twice
        let mut b = NetworkBuilder::new();
        let d = b.add_element("d", "IfcDistributionChamberElement");
        let feed = b.add_element("feed", "IfcBoiler");
        let t1 = b.add_element("t1", "IfcPipeFitting");
        let t2 = b.add_element("t2", "IfcPipeFitting");
        let outlet = b.add_element("out", "IfcValve");
        let p1 = pump(&mut b, "p1");
        let p2 = pump(&mut b, "p2");
        link(&mut b, feed, d);
        link(&mut b, d, t1);
        link(&mut b, d, t1);
        for p in [p1, p2] {
            link(&mut b, t1, p);
            link(&mut b, p, t2);
        }
        link(&mut b, t2, outlet);
        let mut g = b.build().unwrap();

        let matcher = ParallelPump::new();
        let found = matcher.find_matches(&g.element_graph());
        assert_eq!(found.len(), 1);
        let aggs = matcher.build(&mut g, "pp", &found[0]).unwrap();
        assert_eq!(aggs.len(), 2);
        assert_eq!(aggs[0].ports.len(), 2);
        assert_eq!(aggs[1].kind, AggregateKind::AggregatedPipeFitting);
        assert_eq!(aggs[1].members, vec![d]);

        merge_aggregates(&mut g, &aggs).unwrap();
        let (pp, side) = (aggs[0].id, aggs[1].id);
        assert_eq!(g.neighbors(pp), BTreeSet::from([side, outlet]));
        assert_eq!(g.neighbors(side), BTreeSet::from([feed, pp]));
    }

    #[test]
    fn ambiguous_junctions_are_rejected_before_merging() {
        // t1a - r - t1b would collapse, t3 hangs off t1b through a valve
        let mut b = NetworkBuilder::new();
        let inlet = b.add_element("in", "IfcValve");
        let t1a = b.add_element("t1a", "IfcPipeFitting");
        let r = b.add_element("r", "IfcPipeSegment");
        let t1b = b.add_element("t1b", "IfcPipeFitting");
        let v = b.add_element("v", "IfcValve");
        let t3 = b.add_element("t3", "IfcPipeFitting");
        let t2 = b.add_element("t2", "IfcPipeFitting");
        let outlet = b.add_element("out", "IfcValve");
        let pumps: Vec<_> = (1..=4).map(|i| pump(&mut b, &format!("p{i}"))).collect();
        link(&mut b, inlet, t1a);
        link(&mut b, t1a, r);
        link(&mut b, r, t1b);
        link(&mut b, t1b, v);
        link(&mut b, v, t3);
        for (p, from) in pumps.iter().zip([t1a, t1b, t3, t3]) {
            link(&mut b, from, *p);
            link(&mut b, *p, t2);
        }
        link(&mut b, t2, outlet);
        let mut g = b.build().unwrap();
        let elements = g.model().elements().len();

        let mut nodes = vec![t1a, r, t1b, v, t3, t2];
        nodes.extend(&pumps);
        let m = Match::new(AggregateKind::ParallelPump, nodes);
        let err = ParallelPump::new().build(&mut g, "pp", &m).unwrap_err();
        assert_eq!(
            err,
            AggregationError::AmbiguousTopology {
                what: "edge elements",
                expected: 2,
                found: 3
            }
        );
        assert!(g.contains(t1a) && g.contains(r) && g.contains(t1b));
        assert_eq!(g.node_count(), 8 + pumps.len());
        assert_eq!(g.model().elements().len(), elements);
        assert_eq!(g.element(r).unwrap().aggregation(), None);
    }
}
