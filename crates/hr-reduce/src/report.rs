//! Summary of one reduction run.

use std::collections::BTreeMap;

use hr_aggregation::{Aggregate, AggregateKind};
use hr_graph::ReplacementMapping;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub kind: AggregateKind,
    pub name: String,
    pub guid: String,
    pub members: usize,
    pub ports: usize,
}

/// A match that could not be turned into an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassFailure {
    pub kind: AggregateKind,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReductionReport {
    pub nodes_before: usize,
    pub nodes_after: usize,
    pub per_kind: BTreeMap<AggregateKind, usize>,
    pub removed_pipes: usize,
    pub remaining_cycles: usize,
    pub dead_ends_found: usize,
    pub dead_ends_removed: usize,
    pub aggregates: Vec<AggregateSummary>,
    pub failures: Vec<PassFailure>,
    #[serde(skip)]
    replacement_mappings: BTreeMap<String, ReplacementMapping>,
}

impl ReductionReport {
    pub fn new(nodes_before: usize) -> Self {
        Self {
            nodes_before,
            ..Self::default()
        }
    }

    /// Aggregates of `kind` created so far.
    pub fn count(&self, kind: AggregateKind) -> usize {
        self.per_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn record(&mut self, aggregate: &Aggregate) {
        *self.per_kind.entry(aggregate.kind).or_default() += 1;
        self.aggregates.push(AggregateSummary {
            kind: aggregate.kind,
            name: aggregate.name.clone(),
            guid: aggregate.guid.clone(),
            members: aggregate.members.len(),
            ports: aggregate.ports.len(),
        });
        self.replacement_mappings.insert(
            aggregate.guid.clone(),
            aggregate.get_replacement_mapping().clone(),
        );
    }

    /// Port replacements of the aggregate with `guid`, for rewriting
    /// connections downstream.
    pub fn replacement_mapping(&self, guid: &str) -> Option<&ReplacementMapping> {
        self.replacement_mappings.get(guid)
    }

    pub fn replacement_mappings(&self) -> &BTreeMap<String, ReplacementMapping> {
        &self.replacement_mappings
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
