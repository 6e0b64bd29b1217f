//! Core data types for bag file format.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::core::types::{LaserScan, Pose2D, Scan, Timestamped};
use crate::engine::graph::Constraint;

/// Magic bytes at start of bag file.
pub const BAG_MAGIC: [u8; 4] = *b"NBAG";

/// Current bag file format version.
pub const BAG_VERSION: u16 = 1;

/// Size of the bag file header in bytes.
pub const HEADER_SIZE: usize = 64;

/// Largest accepted record payload.
pub const MAX_RECORD_SIZE: usize = 64 * 1024 * 1024;

/// Error type for bag recording and playback.
#[derive(Debug, Error)]
pub enum BagError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Postcard encoding or decoding failed
    #[error("serialization error: {0}")]
    Serialize(String),

    /// Header or framing is not a valid bag
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

impl From<postcard::Error> for BagError {
    fn from(e: postcard::Error) -> Self {
        BagError::Serialize(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BagError>;

/// A record type that can be stored in a bag.
pub trait BagRecord {
    /// Tag written to the header; a player only opens bags of its own kind.
    const KIND: u16;

    /// Capture time in microseconds, if the record has one.
    fn timestamp_us(&self) -> Option<u64> {
        None
    }
}

/// Bag file header (64 bytes fixed size).
///
/// Postcard-encoded at the start of every bag and zero-padded to
/// [`HEADER_SIZE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagHeader {
    /// Magic bytes: "NBAG"
    pub magic: [u8; 4],
    /// File format version
    pub version: u16,
    /// Feature flags, currently always 0
    pub flags: u16,
    /// [`BagRecord::KIND`] of the stored records
    pub record_kind: u16,
    /// Timestamp of first timed record (microseconds)
    pub start_time_us: u64,
    /// Timestamp of last timed record (microseconds)
    pub end_time_us: u64,
    /// Total number of records in the file
    pub message_count: u64,
    /// Byte offset to index section (0 if no index)
    pub index_offset: u64,
    /// Reserved for future use
    pub reserved: [u8; 8],
}

impl BagHeader {
    /// Create an empty header for records of `record_kind`.
    pub fn new(record_kind: u16) -> Self {
        Self {
            magic: BAG_MAGIC,
            version: BAG_VERSION,
            flags: 0,
            record_kind,
            start_time_us: 0,
            end_time_us: 0,
            message_count: 0,
            index_offset: 0,
            reserved: [0; 8],
        }
    }

    /// Check if magic bytes are valid.
    pub fn is_valid(&self) -> bool {
        self.magic == BAG_MAGIC
    }

    /// Get recording duration in microseconds.
    pub fn duration_us(&self) -> u64 {
        self.end_time_us.saturating_sub(self.start_time_us)
    }

    /// Get recording duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_us() as f64 / 1_000_000.0
    }

    /// Encode into the fixed-size on-disk block.
    pub fn to_bytes(&self) -> Result<[u8; HEADER_SIZE]> {
        let encoded = postcard::to_allocvec(self)?;
        if encoded.len() > HEADER_SIZE {
            return Err(BagError::InvalidFormat(format!(
                "header encodes to {} bytes",
                encoded.len()
            )));
        }
        let mut block = [0u8; HEADER_SIZE];
        block[..encoded.len()].copy_from_slice(&encoded);
        Ok(block)
    }

    /// Decode and check the magic bytes.
    pub fn from_bytes(block: &[u8; HEADER_SIZE]) -> Result<Self> {
        let header: BagHeader = postcard::from_bytes(block)
            .map_err(|e| BagError::InvalidFormat(format!("failed to parse header: {}", e)))?;
        if !header.is_valid() {
            return Err(BagError::InvalidFormat("invalid bag file magic bytes".into()));
        }
        if header.version != BAG_VERSION {
            return Err(BagError::InvalidFormat(format!(
                "unsupported bag version {}",
                header.version
            )));
        }
        Ok(header)
    }
}

/// Sensor stream stored in replay bags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SensorMessage {
    /// LiDAR sweep
    Laser(Timestamped<LaserScan>),
    /// Odometry pose at that time
    Odometry(Timestamped<Pose2D>),
}

impl SensorMessage {
    /// Get the timestamp of this message in microseconds.
    pub fn timestamp(&self) -> u64 {
        match self {
            SensorMessage::Laser(msg) => msg.timestamp_us,
            SensorMessage::Odometry(msg) => msg.timestamp_us,
        }
    }

    pub fn as_laser(&self) -> Option<&Timestamped<LaserScan>> {
        match self {
            SensorMessage::Laser(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn as_odometry(&self) -> Option<&Timestamped<Pose2D>> {
        match self {
            SensorMessage::Odometry(msg) => Some(msg),
            _ => None,
        }
    }
}

impl BagRecord for SensorMessage {
    const KIND: u16 = 1;

    fn timestamp_us(&self) -> Option<u64> {
        Some(self.timestamp())
    }
}

/// One element of a saved scan graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphRecord {
    Scan(Scan),
    OdomConstraint(Constraint),
    LoopConstraint(Constraint),
}

impl BagRecord for GraphRecord {
    const KIND: u16 = 2;
}

/// Information about a bag file.
///
/// Returned after recording.
#[derive(Debug, Clone)]
pub struct BagInfo {
    /// Path to the bag file
    pub path: PathBuf,
    /// Span of timed records in microseconds
    pub duration_us: u64,
    /// Total number of records
    pub message_count: u64,
    /// File size in bytes
    pub file_size_bytes: u64,
}

impl BagInfo {
    /// Get recording duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_us as f64 / 1_000_000.0
    }

    /// Get file size in megabytes.
    pub fn file_size_mb(&self) -> f64 {
        self.file_size_bytes as f64 / 1_048_576.0
    }
}
