//! Space heaters connected in parallel between two fittings.

use hr_core::ElementId;
use hr_graph::types::{PIPE_FITTING, PIPE_SEGMENT, SPACE_HEATER};
use hr_graph::{ElementGraph, HvacGraph};

use crate::aggregate::{Aggregate, AggregatePlan, Match, build_aggregate};
use crate::calc::{SpaceHeaterRecord, is_heater_like};
use crate::error::{AggregationError, AggregationResult};
use crate::kind::AggregateKind;
use crate::traits::Matcher;

const ALLOWED: &[&str] = &[
    SPACE_HEATER,
    PIPE_SEGMENT,
    PIPE_FITTING,
    "PipeStrand",
    "AggregatedPipeFitting",
];
const BOUNDARY: &[&str] = &[PIPE_FITTING, "AggregatedPipeFitting"];
/// Heater ports on the cycle, i.e. at least two two-port heaters.
const MIN_HEATER_PORTS: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelSpaceHeater;

impl ParallelSpaceHeater {
    pub fn new() -> Self {
        Self
    }

    /// Accept a cycle when two fittings split it into two strands that both
    /// hold a heater and the cycle is attached to the rest of the network
    /// through exactly two ports.
    fn check_cycle(graph: &ElementGraph<'_>, cycle: &[ElementId]) -> bool {
        let g = graph.graph();
        let heater_ports: usize = cycle
            .iter()
            .filter(|&&n| graph.element(n).is_some_and(is_heater_like))
            .map(|&n| g.contracted_ports(n).len())
            .sum();
        if heater_ports < MIN_HEATER_PORTS {
            return false;
        }

        let bounds: Vec<usize> = cycle
            .iter()
            .enumerate()
            .filter(|&(_, &n)| graph.is_type_in(n, BOUNDARY) && g.neighbors(n).len() > 2)
            .map(|(i, _)| i)
            .collect();
        let [first, second] = bounds.as_slice() else {
            return false;
        };
        let has_heater = |ns: &[ElementId]| {
            ns.iter()
                .any(|&n| graph.element(n).is_some_and(is_heater_like))
        };
        let upper = &cycle[first + 1..*second];
        let lower: Vec<ElementId> = cycle[second + 1..]
            .iter()
            .chain(&cycle[..*first])
            .copied()
            .collect();
        if !has_heater(upper) || !has_heater(&lower) {
            return false;
        }

        let edge = graph.subgraph(cycle.iter().copied()).edge_ports();
        if edge.len() != 2 {
            tracing::debug!(edge_ports = edge.len(), "heater cycle not cleanly bounded");
            return false;
        }
        true
    }
}

impl Matcher for ParallelSpaceHeater {
    fn kind(&self) -> AggregateKind {
        AggregateKind::ParallelSpaceHeater
    }

    fn find_matches(&self, graph: &ElementGraph<'_>) -> Vec<Match> {
        let allowed = graph.of_types(ALLOWED);
        let found: Vec<Match> = allowed
            .get_cycles()
            .into_iter()
            .filter(|c| Self::check_cycle(graph, c))
            .map(|c| Match::new(AggregateKind::ParallelSpaceHeater, c))
            .collect();
        tracing::info!(matches = found.len(), "parallel space heaters found");
        found
    }

    fn build(
        &self,
        graph: &mut HvacGraph,
        name: &str,
        found: &Match,
    ) -> AggregationResult<Vec<Aggregate>> {
        let edge = graph
            .element_graph()
            .subgraph(found.nodes.iter().copied())
            .edge_ports();
        if edge.len() != 2 {
            return Err(AggregationError::AmbiguousTopology {
                what: "edge ports",
                expected: 2,
                found: edge.len(),
            });
        }
        let record = SpaceHeaterRecord::compute(graph.model(), name, &found.nodes);
        let plan = AggregatePlan {
            kind: AggregateKind::ParallelSpaceHeater,
            name: name.to_owned(),
            members: found.nodes.clone(),
            port_groups: edge.into_iter().map(|p| vec![p]).collect(),
            record: record.to_attributes(),
        };
        Ok(vec![build_aggregate(graph, plan)?])
    }
}
