//! Timestamp wrapper for recorded sensor data.

use serde::{Deserialize, Serialize};

/// A value tagged with its capture time in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamped<T> {
    /// The wrapped data
    pub data: T,
    /// Capture time in microseconds
    pub timestamp_us: u64,
}

impl<T> Timestamped<T> {
    /// Create a new timestamped value.
    #[inline]
    pub fn new(data: T, timestamp_us: u64) -> Self {
        Self { data, timestamp_us }
    }

    /// Map the inner data while preserving timestamp.
    #[inline]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Timestamped<U> {
        Timestamped {
            data: f(self.data),
            timestamp_us: self.timestamp_us,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_timestamp() {
        let ts = Timestamped::new(vec![1.0, 2.0], 1_500);
        let len = ts.map(|v| v.len());

        assert_eq!(len.data, 2);
        assert_eq!(len.timestamp_us, 1_500);
    }
}
