//! Mapping orchestration layer.
//!
//! - [`slam`]: the online mapper driving scan matching
//! - [`graph`]: the scan graph it produces, with queries and markers

pub mod graph;
pub mod slam;
