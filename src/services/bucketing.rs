//! Snapshot time bucketing
//!
//! Maps a source timestamp to the canonical `snapshot_time` used as half of
//! the deduplication key. Must stay pure: the unique index on
//! (crypto_id, snapshot_time) only deduplicates if the same input always
//! lands in the same bucket.

use chrono::{DateTime, Duration, Timelike, Utc};
use thiserror::Error;

/// Default bucket width in minutes
pub const DEFAULT_BUCKET_MINUTES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bucket width must be between 1 and 60 minutes (got {0})")]
pub struct InvalidBucketWidth(pub u32);

/// Bucket width in whole minutes, 1..=60
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketWidth(u32);

impl BucketWidth {
    pub fn new(minutes: u32) -> Result<Self, InvalidBucketWidth> {
        if (1..=60).contains(&minutes) {
            Ok(Self(minutes))
        } else {
            Err(InvalidBucketWidth(minutes))
        }
    }

    pub fn minutes(&self) -> u32 {
        self.0
    }
}

impl Default for BucketWidth {
    fn default() -> Self {
        Self(DEFAULT_BUCKET_MINUTES)
    }
}

/// Round `timestamp` to its snapshot bucket.
///
/// Truncates to the hour, then adds the minute component rounded half-up to
/// the nearest multiple of `width`. Seconds are ignored. A minute that rounds
/// to 60 rolls into the next hour (10:58 -> 11:00 with 5-minute buckets).
pub fn snapshot_bucket(timestamp: DateTime<Utc>, width: BucketWidth) -> DateTime<Utc> {
    // Truncate timestamp to hour boundary (e.g., 10:03:45 -> 10:00:00)
    let hour_start = timestamp
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(timestamp);

    let width = width.minutes();
    // floor(minute / width + 1/2) in integer arithmetic
    let slot = (2 * timestamp.minute() + width) / (2 * width);

    hour_start + Duration::minutes(i64::from(slot * width))
}
