//! hr-reduce: the graph reduction driver.
//!
//! Runs the matchers of `hr-aggregation` over an [`HvacGraph`] in a fixed
//! order, driven by per-category [`Lod`] settings, and reports what changed.
//!
//! # Example
//!
//! ```
//! use hr_graph::{Attr, NetworkBuilder};
//! use hr_reduce::{Lod, ReductionSettings, reduce};
//!
//! let mut b = NetworkBuilder::new();
//! let boiler = b.add_element("boiler", "IfcBoiler");
//! let r1 = b.add_element("R1", "IfcPipeSegment");
//! let r2 = b.add_element("R2", "IfcPipeSegment");
//! let pump = b.add_element("pump", "IfcPump");
//! for r in [r1, r2] {
//!     b.set_attribute(r, Attr::Length, 4.0);
//!     b.set_attribute(r, Attr::Diameter, 32.0);
//! }
//! for (x, y) in [(boiler, r1), (r1, r2), (r2, pump)] {
//!     let px = b.add_port(x);
//!     let py = b.add_port(y);
//!     b.connect(px, py);
//! }
//! let mut graph = b.build().unwrap();
//!
//! let settings = ReductionSettings {
//!     pipes: Lod::Low,
//!     ..ReductionSettings::default()
//! };
//! let report = reduce(&mut graph, &settings).unwrap();
//! assert_eq!(report.removed_pipes, 2);
//! assert_eq!(graph.node_count(), 2);
//! ```
//!
//! [`HvacGraph`]: hr_graph::HvacGraph

pub mod dead_ends;
pub mod error;
pub mod reduce;
pub mod report;
pub mod settings;

// Re-exports
pub use dead_ends::{DeadEnd, DeadEndResolver, KeepAll, RemoveAll};
pub use error::{ReduceError, ReduceResult};
pub use reduce::{Reducer, reduce};
pub use report::{AggregateSummary, PassFailure, ReductionReport};
pub use settings::{Lod, ReductionSettings, SettingsError, load_yaml, save_yaml};
