//! Bag file player.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::marker::PhantomData;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;

use super::types::{BagError, BagHeader, BagRecord, HEADER_SIZE, MAX_RECORD_SIZE, Result};

/// Bag file player for replaying recorded records.
///
/// Supports immediate playback (as fast as possible) and timed playback
/// with a speed multiplier.
///
/// # Example
///
/// ```no_run
/// use ndt_slam::io::bag::{BagPlayer, SensorMessage};
///
/// let mut player = BagPlayer::<SensorMessage>::open("drive.bag")?;
///
/// // Fast playback (no timing)
/// while let Some(msg) = player.next_immediate()? {
///     println!("Message at {} us", msg.timestamp());
/// }
///
/// // Real-time playback
/// player.rewind()?;
/// player.set_speed(1.0);
/// while let Some(msg) = player.next()? {
///     // Blocks to match the recorded timing
/// }
/// # Ok::<(), ndt_slam::io::bag::BagError>(())
/// ```
pub struct BagPlayer<M> {
    reader: BufReader<File>,
    header: BagHeader,
    /// Wall clock and record time of the first timed record
    playback_anchor: Option<(Instant, u64)>,
    playback_speed: f64,
    messages_read: u64,
    _record: PhantomData<fn() -> M>,
}

impl<M: BagRecord + DeserializeOwned> BagPlayer<M> {
    /// Open a bag file for playback.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut block = [0u8; HEADER_SIZE];
        reader.read_exact(&mut block).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                BagError::InvalidFormat("file shorter than header".into())
            }
            _ => BagError::Io(e),
        })?;
        let header = BagHeader::from_bytes(&block)?;

        if header.record_kind != M::KIND {
            return Err(BagError::InvalidFormat(format!(
                "bag holds record kind {}, expected {}",
                header.record_kind,
                M::KIND
            )));
        }

        Ok(Self {
            reader,
            header,
            playback_anchor: None,
            playback_speed: 0.0,
            messages_read: 0,
            _record: PhantomData,
        })
    }

    /// Get the bag file header.
    pub fn header(&self) -> &BagHeader {
        &self.header
    }

    /// Get total duration in microseconds.
    pub fn duration_us(&self) -> u64 {
        self.header.duration_us()
    }

    /// Get total message count.
    pub fn message_count(&self) -> u64 {
        self.header.message_count
    }

    /// Get number of messages read so far.
    pub fn messages_read(&self) -> u64 {
        self.messages_read
    }

    /// Set playback speed.
    ///
    /// - 0.0 = as fast as possible (no timing)
    /// - 1.0 = real-time
    /// - 2.0 = 2x speed
    pub fn set_speed(&mut self, speed: f64) {
        self.playback_speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
    }

    /// Get current playback speed.
    pub fn speed(&self) -> f64 {
        self.playback_speed
    }

    /// Read next record without timing delay.
    ///
    /// Returns `None` at a clean end of file.
    pub fn next_immediate(&mut self) -> Result<Option<M>> {
        let mut len_bytes = [0u8; 4];
        match self.reader.read_exact(&mut len_bytes) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_RECORD_SIZE {
            return Err(BagError::InvalidFormat(format!(
                "record too large: {} bytes",
                len
            )));
        }

        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                BagError::InvalidFormat("truncated record".into())
            }
            _ => BagError::Io(e),
        })?;

        let msg: M = postcard::from_bytes(&payload)?;
        self.messages_read += 1;
        Ok(Some(msg))
    }

    /// Read next record, blocking to match recorded timing when the speed
    /// is above zero.
    pub fn next(&mut self) -> Result<Option<M>> {
        let msg = self.next_immediate()?;

        if self.playback_speed > 0.0 {
            if let Some(timestamp) = msg.as_ref().and_then(|m| m.timestamp_us()) {
                self.wait_for_timing(timestamp);
            }
        }

        Ok(msg)
    }

    fn wait_for_timing(&mut self, msg_time_us: u64) {
        let Some((start, first_time_us)) = self.playback_anchor else {
            self.playback_anchor = Some((Instant::now(), msg_time_us));
            return;
        };

        let msg_offset_us = msg_time_us.saturating_sub(first_time_us);
        let target_elapsed =
            Duration::from_micros((msg_offset_us as f64 / self.playback_speed) as u64);
        let elapsed = start.elapsed();

        if target_elapsed > elapsed {
            std::thread::sleep(target_elapsed - elapsed);
        }
    }

    /// Reset to beginning of file.
    pub fn rewind(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        self.playback_anchor = None;
        self.messages_read = 0;
        Ok(())
    }
}

impl<M: BagRecord + DeserializeOwned> Iterator for BagPlayer<M> {
    type Item = Result<M>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_immediate().transpose()
    }
}
