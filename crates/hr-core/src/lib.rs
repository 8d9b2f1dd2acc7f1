//! hr-core: shared foundation for the HVAC network reduction crates.
//!
//! Contains:
//! - ids (compact arena ids for elements and ports)
//! - error (shared error type)
//! - numeric (missing-value filter for attribute numbers)
//! - units (uom SI types + model length unit conversion)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::HrError;
pub use ids::*;
pub use numeric::*;
pub use units::*;
