//! Straight runs of pipes and fittings.

use hr_core::{ElementId, PortId};
use hr_graph::types::PIPE_LIKE;
use hr_graph::{ElementGraph, HvacGraph};

use crate::aggregate::{Aggregate, AggregatePlan, Match, build_aggregate};
use crate::calc::StrandRecord;
use crate::error::{AggregationError, AggregationResult};
use crate::kind::AggregateKind;
use crate::traits::Matcher;

/// Chains of pipe-like elements between two junctions or terminals.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipeStrand {
    /// Also match runs of a single element.
    pub include_singles: bool,
}

impl PipeStrand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_singles(include_singles: bool) -> Self {
        Self { include_singles }
    }
}

/// Ports of a straight chain that connect to the rest of the graph.
pub fn edge_ports_of_strait(view: &ElementGraph<'_>) -> AggregationResult<Vec<PortId>> {
    let edge = view.edge_ports();
    if edge.len() > 2 {
        return Err(AggregationError::NotStrait { found: edge.len() });
    }
    Ok(edge)
}

/// Chain candidates shared with the underfloor heating matcher.
pub(crate) fn chains(graph: &ElementGraph<'_>, include_singles: bool) -> Vec<Vec<ElementId>> {
    graph
        .get_type_chains(PIPE_LIKE, true)
        .into_iter()
        .filter(|c| include_singles || c.len() > 1)
        .collect()
}

impl Matcher for PipeStrand {
    fn kind(&self) -> AggregateKind {
        AggregateKind::PipeStrand
    }

    fn find_matches(&self, graph: &ElementGraph<'_>) -> Vec<Match> {
        let found: Vec<Match> = chains(graph, self.include_singles)
            .into_iter()
            .map(|c| Match::new(AggregateKind::PipeStrand, c))
            .collect();
        tracing::info!(matches = found.len(), "pipe strands found");
        found
    }

    fn build(
        &self,
        graph: &mut HvacGraph,
        name: &str,
        found: &Match,
    ) -> AggregationResult<Vec<Aggregate>> {
        let edge = edge_ports_of_strait(&graph.element_graph().subgraph(found.nodes.iter().copied()))?;
        let record = StrandRecord::compute(graph.model(), name, &found.nodes);
        let plan = AggregatePlan {
            kind: AggregateKind::PipeStrand,
            name: name.to_owned(),
            members: found.nodes.clone(),
            port_groups: edge.into_iter().map(|p| vec![p]).collect(),
            record: record.to_attributes(),
        };
        Ok(vec![build_aggregate(graph, plan)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::merge_aggregates;
    use hr_graph::{Attr, NetworkBuilder};

    /// boiler - p1 - p2 - pump, lengths 5 and 3 m.
    fn run() -> (HvacGraph, Vec<ElementId>) {
        let mut b = NetworkBuilder::new();
        let boiler = b.add_element("boiler", "IfcBoiler");
        let p1 = b.add_element("p1", "IfcPipeSegment");
        let p2 = b.add_element("p2", "IfcPipeSegment");
        let pump = b.add_element("pump", "IfcPump");
        for (id, l) in [(p1, 5.0), (p2, 3.0)] {
            b.set_attribute(id, Attr::Length, l);
            b.set_attribute(id, Attr::Diameter, 40.0);
        }
        let ids = vec![boiler, p1, p2, pump];
        for w in ids.windows(2) {
            let a = b.add_port(w[0]);
            let c = b.add_port(w[1]);
            b.connect(a, c);
        }
        (b.build().unwrap(), ids)
    }

    #[test]
    fn finds_and_builds_strand() {
        let (mut g, ids) = run();
        let matcher = PipeStrand::new();
        let found = matcher.find_matches(&g.element_graph());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].nodes, vec![ids[1], ids[2]]);

        let aggs = matcher.build(&mut g, "strand", &found[0]).unwrap();
        let agg = &aggs[0];
        assert_eq!(agg.ports.len(), 2);
        let e = g.element(agg.id).unwrap();
        assert_eq!(e.number(Attr::Length), Some(8.0));
        assert_eq!(e.number(Attr::Diameter), Some(40.0));

        merge_aggregates(&mut g, &aggs).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(
            g.neighbors(agg.id).into_iter().collect::<Vec<_>>(),
            vec![ids[0], ids[3]]
        );
    }

    #[test]
    fn singles_only_on_request() {
        let mut b = NetworkBuilder::new();
        let a = b.add_element("a", "IfcPump");
        let p = b.add_element("p", "IfcPipeSegment");
        let c = b.add_element("c", "IfcPump");
        for (x, y) in [(a, p), (p, c)] {
            let px = b.add_port(x);
            let py = b.add_port(y);
            b.connect(px, py);
        }
        let g = b.build().unwrap();
        assert!(PipeStrand::new().find_matches(&g.element_graph()).is_empty());
        let found = PipeStrand::with_singles(true).find_matches(&g.element_graph());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].nodes, vec![p]);
    }
}
