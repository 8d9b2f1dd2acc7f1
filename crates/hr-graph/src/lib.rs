//! hr-graph: element/port model and the contracted element graph.
//!
//! Provides:
//! - The element/port arena with connections and aggregation provenance
//! - Contraction of ports into element nodes and the merge protocol that
//!   swaps matched nodes for aggregates
//! - Structural queries on node-induced views (cycles, type chains,
//!   parallel branches, connected groups, junction-free paths)
//! - Attribute slots and the resolver chain that fills them
//!
//! # Example
//!
//! ```
//! use hr_graph::NetworkBuilder;
//!
//! let mut b = NetworkBuilder::new();
//! let pump = b.add_element("P1", "IfcPump");
//! let pipe = b.add_element("R1", "IfcPipeSegment");
//! let p0 = b.add_port(pump);
//! let p1 = b.add_port(pipe);
//! b.connect(p0, p1);
//! let graph = b.build().unwrap();
//!
//! assert_eq!(graph.node_count(), 2);
//! assert!(graph.neighbors(pump).contains(&pipe));
//! ```

pub mod attribute;
pub mod builder;
mod chains;
mod cycles;
mod diagnostics;
pub mod error;
pub mod graph;
pub mod model;
mod parallels;
mod paths;
pub mod resolve;
pub mod types;
pub(crate) mod validate;
pub mod view;

// Re-exports for ergonomics
pub use attribute::{Attr, AttrValue, AttributeState, Attributes};
pub use builder::NetworkBuilder;
pub use error::{GraphError, GraphResult};
pub use graph::{Connection, HvacGraph, MergeOutcome, ReplacementMapping};
pub use model::{Element, FlowDirection, Model, Port};
pub use resolve::{
    AttributeResolver, DefaultResolver, FunctionResolver, PatternResolver, PropertyResolver,
    ResolverChain, hydraulic_power_kw,
};
pub use view::ElementGraph;
