//! A distributor together with the consumer circuits it feeds.

use std::collections::BTreeSet;

use hr_core::{ElementId, PortId};
use hr_graph::types::{DISTRIBUTOR, SPACE_HEATER};
use hr_graph::{ElementGraph, HvacGraph};

use crate::aggregate::{Aggregate, AggregatePlan, Match, MatchMeta, build_aggregate};
use crate::calc::DistributorRecord;
use crate::consumer::{Circuit, classify};
use crate::error::{AggregationError, AggregationResult};
use crate::kind::AggregateKind;
use crate::traits::Matcher;

/// Consumer types including already built consumer circuits.
pub const MODULE_CONSUMERS: &[&str] = &[
    SPACE_HEATER,
    "ParallelSpaceHeater",
    "UnderfloorHeating",
    "Consumer",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsumerHeatingDistributorModule;

impl ConsumerHeatingDistributorModule {
    pub fn new() -> Self {
        Self
    }
}

impl Matcher for ConsumerHeatingDistributorModule {
    fn kind(&self) -> AggregateKind {
        AggregateKind::ConsumerHeatingDistributorModule
    }

    /// One match per distributor that feeds at least one consumer circuit.
    /// Distributor ports facing anything else stay ports of the module.
    fn find_matches(&self, graph: &ElementGraph<'_>) -> Vec<Match> {
        let g = graph.graph();
        let mut found = Vec::new();
        for dist in graph.of_types(&[DISTRIBUTOR]).nodes() {
            let rest = graph.without([dist]);
            let mut members = vec![dist];
            let mut boundary: Vec<Vec<PortId>> = Vec::new();
            for comp in rest.connected_components() {
                let facing: Vec<PortId> = g
                    .contracted_ports(dist)
                    .iter()
                    .copied()
                    .filter(|&p| g.peer_node(p).is_some_and(|m| comp.contains(&m)))
                    .collect();
                if facing.is_empty() {
                    continue;
                }
                match classify(graph, &comp, MODULE_CONSUMERS) {
                    Circuit::Consumer => members.extend(comp.iter().copied()),
                    Circuit::Mixed => {
                        tracing::debug!(distributor = %dist, "mixed circuit kept outside the module");
                        boundary.extend(facing.into_iter().map(|p| vec![p]));
                    }
                    Circuit::Generator | Circuit::Undefined => {
                        boundary.extend(facing.into_iter().map(|p| vec![p]));
                    }
                }
            }
            if members.len() == 1 {
                continue;
            }
            let meta = MatchMeta {
                boundary,
                ..MatchMeta::default()
            };
            found.push(
                Match::new(AggregateKind::ConsumerHeatingDistributorModule, members).with_meta(meta),
            );
        }
        tracing::info!(matches = found.len(), "distributor modules found");
        found
    }

    fn build(
        &self,
        graph: &mut HvacGraph,
        name: &str,
        found: &Match,
    ) -> AggregationResult<Vec<Aggregate>> {
        let members: BTreeSet<ElementId> = found.nodes.iter().copied().collect();
        if members.len() < 2 {
            return Err(AggregationError::EmptyMatch);
        }
        let record =
            DistributorRecord::compute(graph.model(), name, &found.nodes, MODULE_CONSUMERS);
        let plan = AggregatePlan {
            kind: AggregateKind::ConsumerHeatingDistributorModule,
            name: name.to_owned(),
            members: found.nodes.clone(),
            port_groups: found.meta.boundary.clone(),
            record: record.to_attributes(),
        };
        Ok(vec![build_aggregate(graph, plan)?])
    }
}
