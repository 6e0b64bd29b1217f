//! I/O layer.
//!
//! - [`bag`]: record container for sensor replays and saved graphs
//! - [`graph_store`]: scan graph save and load

pub mod bag;
pub mod graph_store;
