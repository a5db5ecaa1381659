//! When to cut a block.
//!
//! The policy is evaluated after every appended record and on every
//! control signal. Checks run in a fixed order and the first one that
//! fires wins, so a single evaluation causes at most one emit.

use crate::config::FlushConfig;
use crate::sink::Signal;
use std::time::Duration;

/// Reason for emitting a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushReason {
    /// `minRecords` reached.
    RecordCount,
    /// `minBytes` reached.
    ByteSize,
    /// `maxIntervalSeconds` elapsed since the last emit.
    Interval,
    /// Boundary signal with `flushOnBoundarySignal` set.
    Boundary,
    /// End-of-stream drain.
    EndOfStream,
}

/// Counters of the accumulator at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    pub records: u64,
    pub bytes: u64,
    pub since_last_emit: Duration,
}

/// Threshold and signal rules derived from a [`FlushConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    min_records: u64,
    min_bytes: u64,
    max_interval: Option<Duration>,
    flush_on_boundary: bool,
}

impl FlushPolicy {
    pub fn new(config: &FlushConfig) -> Self {
        Self {
            min_records: config.min_records,
            min_bytes: config.min_bytes,
            max_interval: (config.max_interval_seconds > 0)
                .then(|| Duration::from_secs(config.max_interval_seconds)),
            flush_on_boundary: config.flush_on_boundary_signal,
        }
    }

    /// Evaluated after a record was appended.
    pub fn after_append(&self, stats: &BufferStats) -> Option<FlushReason> {
        if stats.records == 0 {
            return None;
        }
        if self.min_records > 0 && stats.records >= self.min_records {
            return Some(FlushReason::RecordCount);
        }
        if self.min_bytes > 0 && stats.bytes >= self.min_bytes {
            return Some(FlushReason::ByteSize);
        }
        match self.max_interval {
            Some(interval) if stats.since_last_emit >= interval => Some(FlushReason::Interval),
            _ => None,
        }
    }

    /// Evaluated when a control signal arrives.
    pub fn on_signal(&self, signal: Signal, stats: &BufferStats) -> Option<FlushReason> {
        if stats.records == 0 {
            return None;
        }
        match signal {
            Signal::EndOfStream => Some(FlushReason::EndOfStream),
            Signal::Boundary if self.flush_on_boundary => Some(FlushReason::Boundary),
            Signal::Boundary => self.after_append(stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(records: u64, bytes: u64, secs: u64) -> BufferStats {
        BufferStats {
            records,
            bytes,
            since_last_emit: Duration::from_secs(secs),
        }
    }

    #[test]
    fn first_matching_threshold_wins() {
        let policy = FlushPolicy::new(
            &FlushConfig::embedded()
                .with_min_records(2)
                .with_min_bytes(10)
                .with_max_interval_seconds(1),
        );
        assert_eq!(policy.after_append(&stats(2, 100, 9)), Some(FlushReason::RecordCount));
        assert_eq!(policy.after_append(&stats(1, 100, 9)), Some(FlushReason::ByteSize));
        assert_eq!(policy.after_append(&stats(1, 5, 9)), Some(FlushReason::Interval));
        assert_eq!(policy.after_append(&stats(1, 5, 0)), None);
    }

    #[test]
    fn zero_thresholds_are_disabled() {
        let policy = FlushPolicy::new(&FlushConfig::embedded().with_flush_on_boundary_signal(true));
        assert_eq!(policy.after_append(&stats(1_000_000, u64::MAX, 86_400)), None);
    }

    #[test]
    fn signals_never_flush_an_empty_buffer() {
        let policy = FlushPolicy::new(&FlushConfig::embedded().with_flush_on_boundary_signal(true));
        assert_eq!(policy.on_signal(Signal::EndOfStream, &stats(0, 0, 0)), None);
        assert_eq!(policy.on_signal(Signal::Boundary, &stats(0, 0, 0)), None);
    }

    #[test]
    fn boundary_flushes_only_when_enabled() {
        let on = FlushPolicy::new(&FlushConfig::embedded().with_flush_on_boundary_signal(true));
        let off = FlushPolicy::new(&FlushConfig::embedded().with_min_records(10));
        assert_eq!(on.on_signal(Signal::Boundary, &stats(1, 1, 0)), Some(FlushReason::Boundary));
        assert_eq!(off.on_signal(Signal::Boundary, &stats(1, 1, 0)), None);
        assert_eq!(
            off.on_signal(Signal::EndOfStream, &stats(1, 1, 0)),
            Some(FlushReason::EndOfStream)
        );
    }

    #[test]
    fn boundary_still_checks_elapsed_interval() {
        let policy = FlushPolicy::new(&FlushConfig::embedded().with_max_interval_seconds(5));
        assert_eq!(
            policy.on_signal(Signal::Boundary, &stats(1, 1, 6)),
            Some(FlushReason::Interval)
        );
    }
}
