//! Aggregate variants.

use std::fmt;

/// Variant of an aggregate, fixed when it is created.
///
/// The tag doubles as the aggregate element's type name, so later matchers
/// can treat aggregates like any other element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AggregateKind {
    PipeStrand,
    UnderfloorHeating,
    ParallelPump,
    AggregatedPipeFitting,
    ParallelSpaceHeater,
    Consumer,
    ConsumerHeatingDistributorModule,
}

impl AggregateKind {
    pub const ALL: [AggregateKind; 7] = [
        AggregateKind::PipeStrand,
        AggregateKind::UnderfloorHeating,
        AggregateKind::ParallelPump,
        AggregateKind::AggregatedPipeFitting,
        AggregateKind::ParallelSpaceHeater,
        AggregateKind::Consumer,
        AggregateKind::ConsumerHeatingDistributorModule,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            AggregateKind::PipeStrand => "PipeStrand",
            AggregateKind::UnderfloorHeating => "UnderfloorHeating",
            AggregateKind::ParallelPump => "ParallelPump",
            AggregateKind::AggregatedPipeFitting => "AggregatedPipeFitting",
            AggregateKind::ParallelSpaceHeater => "ParallelSpaceHeater",
            AggregateKind::Consumer => "Consumer",
            AggregateKind::ConsumerHeatingDistributorModule => "ConsumerHeatingDistributorModule",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
