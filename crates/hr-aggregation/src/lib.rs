//! hr-aggregation: pattern matchers and aggregate construction.
//!
//! Provides:
//! - [`Matcher`] implementations for pipe strands, underfloor heating,
//!   parallel pumps, fitting groups, parallel space heaters, consumer
//!   circuits and distributor modules
//! - Aggregate construction: aggregation ports, replacement mappings and
//!   the derived attribute records
//! - The empty mapping used to delete plain pipe runs
//!
//! Matchers never change the graph; they report [`Match`]es. Building an
//! aggregate adds it to the model, and [`merge_aggregates`] swaps it into the
//! live graph.
//!
//! # Example
//!
//! ```
//! use hr_aggregation::{Matcher, PipeStrand, merge_aggregates};
//! use hr_graph::{Attr, NetworkBuilder};
//!
//! let mut b = NetworkBuilder::new();
//! let pump = b.add_element("P1", "IfcPump");
//! let r1 = b.add_element("R1", "IfcPipeSegment");
//! let r2 = b.add_element("R2", "IfcPipeSegment");
//! let heater = b.add_element("H1", "IfcSpaceHeater");
//! for (id, l) in [(r1, 2.0), (r2, 1.0)] {
//!     b.set_attribute(id, Attr::Length, l);
//!     b.set_attribute(id, Attr::Diameter, 20.0);
//! }
//! for (x, y) in [(pump, r1), (r1, r2), (r2, heater)] {
//!     let px = b.add_port(x);
//!     let py = b.add_port(y);
//!     b.connect(px, py);
//! }
//! let mut graph = b.build().unwrap();
//!
//! let matcher = PipeStrand::new();
//! let found = matcher.find_matches(&graph.element_graph());
//! let aggregates = matcher.build(&mut graph, "PipeStrand 1", &found[0]).unwrap();
//! merge_aggregates(&mut graph, &aggregates).unwrap();
//!
//! let strand = graph.element(aggregates[0].id).unwrap();
//! assert_eq!(strand.number(Attr::Length), Some(3.0));
//! assert_eq!(graph.node_count(), 3);
//! ```

pub mod aggregate;
pub mod calc;
pub mod consumer;
pub mod distributor;
pub mod error;
pub mod kind;
pub mod parallel_pump;
pub mod pipe_fitting;
pub mod pipe_strand;
pub mod space_heater;
pub mod traits;
pub mod underfloor_heating;

// Re-exports
pub use aggregate::{
    Aggregate, AggregatePlan, Match, MatchMeta, aggregate_guid, build_aggregate, empty_mapping,
    merge_aggregates,
};
pub use consumer::Consumer;
pub use distributor::ConsumerHeatingDistributorModule;
pub use error::{AggregationError, AggregationResult};
pub use kind::AggregateKind;
pub use parallel_pump::ParallelPump;
pub use pipe_fitting::{AggregatedPipeFitting, build_fitting};
pub use pipe_strand::{PipeStrand, edge_ports_of_strait};
pub use space_heater::ParallelSpaceHeater;
pub use traits::Matcher;
pub use underfloor_heating::UnderfloorHeating;
