//! Bag file recorder.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::types::{BagError, BagHeader, BagInfo, BagRecord, HEADER_SIZE, MAX_RECORD_SIZE, Result};

/// Bag file recorder.
///
/// Records are postcard-encoded and length-prefixed. The header block is
/// reserved on creation and filled in by [`BagRecorder::finish`]; a bag
/// that is never finished has a zeroed header and will not open.
///
/// # Example
///
/// ```no_run
/// use ndt_slam::core::types::{Pose2D, Timestamped};
/// use ndt_slam::io::bag::{BagRecorder, SensorMessage};
///
/// let mut recorder = BagRecorder::create("drive.bag")?;
/// recorder.record(&SensorMessage::Odometry(Timestamped::new(Pose2D::identity(), 0)))?;
/// let info = recorder.finish()?;
/// println!("Recorded {} messages", info.message_count);
/// # Ok::<(), ndt_slam::io::bag::BagError>(())
/// ```
pub struct BagRecorder<M> {
    writer: BufWriter<File>,
    path: PathBuf,
    message_count: u64,
    start_time_us: Option<u64>,
    end_time_us: u64,
    _record: PhantomData<fn(&M)>,
}

impl<M: BagRecord + Serialize> BagRecorder<M> {
    /// Create a new bag recorder writing to the specified path.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(&[0u8; HEADER_SIZE])?;

        Ok(Self {
            writer,
            path,
            message_count: 0,
            start_time_us: None,
            end_time_us: 0,
            _record: PhantomData,
        })
    }

    /// Append one record.
    pub fn record(&mut self, msg: &M) -> Result<()> {
        if let Some(timestamp) = msg.timestamp_us() {
            if self.start_time_us.is_none() {
                self.start_time_us = Some(timestamp);
            }
            self.end_time_us = timestamp;
        }

        let bytes = postcard::to_allocvec(msg)?;
        if bytes.len() > MAX_RECORD_SIZE {
            return Err(BagError::InvalidFormat(format!(
                "record too large: {} bytes",
                bytes.len()
            )));
        }

        // Length prefix (4 bytes, little-endian) + payload
        let len = bytes.len() as u32;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(&bytes)?;

        self.message_count += 1;
        Ok(())
    }

    /// Get current message count.
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Get current recording duration in microseconds.
    pub fn duration_us(&self) -> u64 {
        self.end_time_us
            .saturating_sub(self.start_time_us.unwrap_or(0))
    }

    /// Write the final header and close the file.
    pub fn finish(mut self) -> Result<BagInfo> {
        self.writer.flush()?;
        let file_size = self.writer.stream_position()?;

        let mut header = BagHeader::new(M::KIND);
        header.start_time_us = self.start_time_us.unwrap_or(0);
        header.end_time_us = self.end_time_us;
        header.message_count = self.message_count;

        self.writer.seek(SeekFrom::Start(0))?;
        self.writer.write_all(&header.to_bytes()?)?;
        self.writer.flush()?;

        let duration_us = self.duration_us();
        Ok(BagInfo {
            path: self.path,
            duration_us,
            message_count: self.message_count,
            file_size_bytes: file_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{LaserScan, Pose2D, Timestamped};
    use crate::io::bag::SensorMessage;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_recorder_create_and_finish() {
        let temp_dir = TempDir::new().unwrap();
        let bag_path = temp_dir.path().join("test.bag");

        let recorder = BagRecorder::<SensorMessage>::create(&bag_path).unwrap();
        let info = recorder.finish().unwrap();

        assert_eq!(info.message_count, 0);
        assert_eq!(fs::metadata(&bag_path).unwrap().len(), HEADER_SIZE as u64);
    }

    #[test]
    fn test_recorder_tracks_time_span() {
        let temp_dir = TempDir::new().unwrap();
        let bag_path = temp_dir.path().join("mixed.bag");

        let mut recorder = BagRecorder::create(&bag_path).unwrap();
        recorder
            .record(&SensorMessage::Odometry(Timestamped::new(Pose2D::identity(), 1000)))
            .unwrap();
        recorder
            .record(&SensorMessage::Laser(Timestamped::new(
                LaserScan::new(0.0, 0.1, 0.1, 5.0, vec![1.0, 2.0]),
                201_000,
            )))
            .unwrap();
        let info = recorder.finish().unwrap();

        assert_eq!(info.message_count, 2);
        assert_eq!(info.duration_us, 200_000);
        assert!(info.file_size_bytes > HEADER_SIZE as u64);
    }
}
