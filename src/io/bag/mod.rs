//! Bag files: length-prefixed postcard records behind a fixed header.
//!
//! The same container holds sensor replays ([`SensorMessage`]) and saved
//! scan graphs ([`GraphRecord`]); the header records which kind a file
//! holds.
//!
//! # File Format
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ Header (64 bytes, postcard, zero-padded)         │
//! │ - Magic: "NBAG" (4 bytes)                        │
//! │ - Version: u16                                   │
//! │ - Flags: u16                                     │
//! │ - Record kind: u16                               │
//! │ - Start time: u64 (microseconds)                 │
//! │ - End time: u64 (microseconds)                   │
//! │ - Message count: u64                             │
//! │ - Index offset: u64 (0 if no index)              │
//! │ - Reserved: 8 bytes                              │
//! ├──────────────────────────────────────────────────┤
//! │ Record Stream                                    │
//! │ [len:u32 LE][postcard payload]...                │
//! └──────────────────────────────────────────────────┘
//! ```

mod player;
mod recorder;
mod types;

pub use player::BagPlayer;
pub use recorder::BagRecorder;
pub use types::{
    BAG_MAGIC, BAG_VERSION, BagError, BagHeader, BagInfo, BagRecord, GraphRecord, HEADER_SIZE,
    MAX_RECORD_SIZE, Result, SensorMessage,
};
