//! The matcher contract.

use hr_graph::{ElementGraph, HvacGraph};

use crate::aggregate::{Aggregate, Match};
use crate::error::AggregationResult;
use crate::kind::AggregateKind;

/// Finds one kind of reducible pattern and builds aggregates from it.
///
/// `find_matches` only reads the graph; an empty list is the normal
/// not-found outcome and rejected candidates are simply left out. `build`
/// creates aggregates in the model but leaves the live graph untouched,
/// except where a matcher has to consolidate nested structures first
/// (parallel pumps merge extra junctions before building).
pub trait Matcher {
    fn kind(&self) -> AggregateKind;

    fn find_matches(&self, graph: &ElementGraph<'_>) -> Vec<Match>;

    /// Build the aggregates for one match. Several aggregates are returned
    /// when the match needs helper aggregates around it; they are meant to
    /// be merged together.
    fn build(
        &self,
        graph: &mut HvacGraph,
        name: &str,
        found: &Match,
    ) -> AggregationResult<Vec<Aggregate>>;
}
