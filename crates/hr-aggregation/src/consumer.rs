//! Consumer circuits hanging off a distributor.
//!
//! Removing every distributor splits the network into components. A
//! component with heat consumers and no generator is a consumer circuit;
//! its ports facing the distributor become the aggregate's ports.

use std::collections::BTreeSet;

use hr_core::{ElementId, PortId};
use hr_graph::types::{DISTRIBUTOR, GENERATORS, SPACE_HEATER};
use hr_graph::{ElementGraph, HvacGraph};

use crate::aggregate::{Aggregate, AggregatePlan, Match, MatchMeta, build_aggregate};
use crate::calc::ConsumerRecord;
use crate::error::{AggregationError, AggregationResult};
use crate::kind::AggregateKind;
use crate::traits::Matcher;

/// Element types counted as heat consumers inside a circuit.
pub const CONSUMERS: &[&str] = &[SPACE_HEATER, "ParallelSpaceHeater", "UnderfloorHeating"];

/// Classification of a component left after removing distributors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Circuit {
    Consumer,
    Generator,
    Mixed,
    Undefined,
}

/// Sort a component by the element types it contains.
pub fn classify(graph: &ElementGraph<'_>, nodes: &BTreeSet<ElementId>, consumers: &[&str]) -> Circuit {
    let generator = nodes.iter().any(|&n| graph.is_type_in(n, GENERATORS));
    let consumer = nodes.iter().any(|&n| graph.is_type_in(n, consumers));
    match (generator, consumer) {
        (true, true) => Circuit::Mixed,
        (true, false) => Circuit::Generator,
        (false, true) => Circuit::Consumer,
        (false, false) => Circuit::Undefined,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Consumer;

impl Consumer {
    pub fn new() -> Self {
        Self
    }
}

impl Matcher for Consumer {
    fn kind(&self) -> AggregateKind {
        AggregateKind::Consumer
    }

    fn find_matches(&self, graph: &ElementGraph<'_>) -> Vec<Match> {
        let g = graph.graph();
        let distributors: BTreeSet<ElementId> = graph.of_types(&[DISTRIBUTOR]).nodes().collect();
        let rest = graph.without(distributors.iter().copied());

        let mut found = Vec::new();
        for comp in rest.connected_components() {
            match classify(graph, &comp, CONSUMERS) {
                Circuit::Consumer => {}
                Circuit::Mixed => {
                    tracing::debug!(nodes = comp.len(), "mixed generator/consumer circuit left as is");
                    continue;
                }
                _ => continue,
            }
            let boundary: Vec<Vec<PortId>> = comp
                .iter()
                .flat_map(|&n| g.contracted_ports(n).iter().copied())
                .filter(|&p| g.peer_node(p).is_some_and(|m| distributors.contains(&m)))
                .map(|p| vec![p])
                .collect();
            if boundary.is_empty() {
                tracing::debug!(nodes = comp.len(), "consumer circuit without distributor");
                continue;
            }
            let meta = MatchMeta {
                boundary,
                ..MatchMeta::default()
            };
            found.push(Match::new(AggregateKind::Consumer, comp.into_iter().collect()).with_meta(meta));
        }
        tracing::info!(matches = found.len(), "consumers found");
        found
    }

    fn build(
        &self,
        graph: &mut HvacGraph,
        name: &str,
        found: &Match,
    ) -> AggregationResult<Vec<Aggregate>> {
        if found.meta.boundary.is_empty() {
            return Err(AggregationError::TooFewEdgePorts { found: 0 });
        }
        let record = ConsumerRecord::compute(graph.model(), name, &found.nodes, CONSUMERS);
        let plan = AggregatePlan {
            kind: AggregateKind::Consumer,
            name: name.to_owned(),
            members: found.nodes.clone(),
            port_groups: found.meta.boundary.clone(),
            record: record.to_attributes(),
        };
        Ok(vec![build_aggregate(graph, plan)?])
    }
}
