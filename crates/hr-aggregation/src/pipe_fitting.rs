//! Groups of fittings joined only by pipes, collapsed into one fitting.

use std::collections::BTreeSet;

use hr_core::{ElementId, PortId};
use hr_graph::types::{PIPE_FITTING, PIPE_SEGMENT};
use hr_graph::{Attributes, ElementGraph, HvacGraph};

use crate::aggregate::{Aggregate, AggregatePlan, Match, build_aggregate};
use crate::error::{AggregationError, AggregationResult};
use crate::kind::AggregateKind;
use crate::traits::Matcher;

const WANTED: &[&str] = &[PIPE_FITTING, "AggregatedPipeFitting"];
const INERT: &[&str] = &[PIPE_SEGMENT, "PipeStrand"];

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregatedPipeFitting;

impl AggregatedPipeFitting {
    pub fn new() -> Self {
        Self
    }
}

/// Build a fitting aggregate over `members`.
///
/// Every port facing an element outside the group becomes an aggregation
/// port of its own, except the ports listed in `combine`, which share a
/// single one.
pub fn build_fitting(
    graph: &mut HvacGraph,
    name: &str,
    members: &[ElementId],
    combine: &[PortId],
) -> AggregationResult<Aggregate> {
    let edge = graph
        .element_graph()
        .subgraph(members.iter().copied())
        .edge_ports();
    if edge.len() < 2 {
        return Err(AggregationError::TooFewEdgePorts { found: edge.len() });
    }
    let combined: BTreeSet<PortId> = combine.iter().copied().collect();
    let mut groups: Vec<Vec<PortId>> = edge
        .iter()
        .filter(|p| !combined.contains(p))
        .map(|&p| vec![p])
        .collect();
    let joined: Vec<PortId> = edge.iter().copied().filter(|p| combined.contains(p)).collect();
    if !joined.is_empty() {
        groups.push(joined);
    }

    let plan = AggregatePlan {
        kind: AggregateKind::AggregatedPipeFitting,
        name: name.to_owned(),
        members: members.to_vec(),
        port_groups: groups,
        record: Attributes::new(),
    };
    build_aggregate(graph, plan)
}

impl Matcher for AggregatedPipeFitting {
    fn kind(&self) -> AggregateKind {
        AggregateKind::AggregatedPipeFitting
    }

    fn find_matches(&self, graph: &ElementGraph<'_>) -> Vec<Match> {
        let found: Vec<Match> = graph
            .get_connections_between(WANTED, INERT)
            .into_iter()
            .map(|g| Match::new(AggregateKind::AggregatedPipeFitting, g.nodes().collect()))
            .collect();
        tracing::info!(matches = found.len(), "pipe fitting groups found");
        found
    }

    fn build(
        &self,
        graph: &mut HvacGraph,
        name: &str,
        found: &Match,
    ) -> AggregationResult<Vec<Aggregate>> {
        Ok(vec![build_fitting(graph, name, &found.nodes, &[])?])
    }
}
