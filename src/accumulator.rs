//! The in-memory block being built in embedded-schema mode.

use crate::container::ContainerFormat;
use crate::datum::Datum;
use crate::error::Result;
use crate::policy::BufferStats;
use std::time::{Duration, Instant};

/// A finished container unit, ready to hand downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSnapshot {
    pub bytes: Vec<u8>,
    pub records: u64,
}

/// Validated datums waiting to be emitted as one container unit.
///
/// The buffer is either empty or accumulating; [`reset`](Self::reset)
/// returns it to empty and restarts the interval clock.
#[derive(Debug)]
pub struct BlockAccumulator {
    format: ContainerFormat,
    datums: Vec<Datum>,
    data_len: usize,
    last_emit: Instant,
}

impl BlockAccumulator {
    pub fn new(format: ContainerFormat, now: Instant) -> Self {
        Self {
            format,
            datums: Vec::new(),
            data_len: 0,
            last_emit: now,
        }
    }

    /// Appends one datum whose binary encoding is `encoded_len` bytes.
    pub fn append(&mut self, datum: Datum, encoded_len: usize) {
        self.datums.push(datum);
        self.data_len += encoded_len;
    }

    pub fn record_count(&self) -> u64 {
        self.datums.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.datums.is_empty()
    }

    /// Size of the unit [`snapshot`](Self::snapshot) would produce now.
    pub fn byte_size(&self) -> usize {
        self.format.unit_len(self.record_count(), self.data_len)
    }

    pub fn last_emit(&self) -> Instant {
        self.last_emit
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_emit)
    }

    pub fn stats(&self, now: Instant) -> BufferStats {
        BufferStats {
            records: self.record_count(),
            bytes: self.byte_size() as u64,
            since_last_emit: self.elapsed(now),
        }
    }

    /// The framed unit (header plus one data block), or `None` when empty.
    /// Leaves the accumulated state untouched.
    pub fn snapshot(&self) -> Result<Option<BlockSnapshot>> {
        if self.is_empty() {
            return Ok(None);
        }
        let bytes = self.format.write_unit(&self.datums, self.data_len)?;
        Ok(Some(BlockSnapshot {
            bytes,
            records: self.record_count(),
        }))
    }

    pub fn reset(&mut self, now: Instant) {
        self.datums.clear();
        self.data_len = 0;
        self.last_emit = now;
    }
}
