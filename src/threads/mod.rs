//! Worker threads for the mapping daemon.
//!
//! - [`MapperThread`]: sensor ingestion and scan matching
//! - [`PublisherThread`]: periodic map rebuilds from the shared history

mod mapper_thread;
mod publisher_thread;

pub use mapper_thread::{MapperThread, MapperWorker, MessageSource};
pub use publisher_thread::{MapPublisher, MapRenderer, PublisherConfig, PublisherThread};
