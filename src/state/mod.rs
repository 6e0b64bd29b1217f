//! State shared between the mapper and publisher threads.

mod shared;

pub use shared::{MapHistory, SharedState, SharedStateHandle, create_shared_state};
