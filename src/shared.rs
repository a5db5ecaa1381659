//! A lock-wrapped encoder for hosts that deliver from several threads.

use crate::clock::{Clock, SystemClock};
use crate::codec::{AvroCodec, PrimitiveCodec};
use crate::encoder::{BlockEncoder, EncoderStats, SubmitOutcome};
use crate::error::Result;
use crate::sink::{Signal, Sink};
use crate::value::Record;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Each `submit` or `signal` holds the lock for its whole duration, so only
/// one call mutates the block at a time.
pub struct SharedEncoder<S: Sink, C: PrimitiveCodec = AvroCodec, K: Clock = SystemClock> {
    inner: Arc<Mutex<BlockEncoder<S, C, K>>>,
}

impl<S: Sink, C: PrimitiveCodec, K: Clock> SharedEncoder<S, C, K> {
    pub fn new(encoder: BlockEncoder<S, C, K>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(encoder)),
        }
    }

    pub fn submit(&self, record: &Record) -> Result<SubmitOutcome> {
        self.inner.lock().submit(record)
    }

    pub fn signal(&self, signal: Signal) -> Result<()> {
        self.inner.lock().signal(signal)
    }

    pub fn stats(&self) -> EncoderStats {
        self.inner.lock().stats()
    }

    /// Exclusive access for several operations under one lock.
    pub fn lock(&self) -> MutexGuard<'_, BlockEncoder<S, C, K>> {
        self.inner.lock()
    }
}

impl<S: Sink, C: PrimitiveCodec, K: Clock> Clone for SharedEncoder<S, C, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncoderConfig, FlushConfig};
    use crate::encoder::EncoderBuilder;
    use crate::schema::TargetSchema;
    use crate::sink::Output;
    use crate::value::{SourceSchema, SourceType, Value};
    use std::thread;

    #[test]
    fn concurrent_submitters_lose_no_records() {
        let source = SourceSchema::new().with("n", SourceType::Int32);
        let output = SourceSchema::new().with("bytes", SourceType::Blob);
        let target = TargetSchema::parse_str(
            r#"{"type":"record","name":"N","fields":[{"name":"n","type":"int"}]}"#,
        )
        .unwrap();
        let encoder = EncoderBuilder::new(
            EncoderConfig::new(FlushConfig::embedded().with_min_records(10)),
            source,
            output,
        )
        .target_schema(target)
        .build(Vec::<Output>::new())
        .unwrap();
        let shared = SharedEncoder::new(encoder);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        shared
                            .submit(&Record::new(vec![Value::Int32(t * 100 + i)]))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        shared.signal(Signal::EndOfStream).unwrap();

        let stats = shared.stats();
        assert_eq!(stats.encoded, 100);
        assert_eq!(stats.emitted, 10);
        let guard = shared.lock();
        let blocks = guard.sink().iter().filter(|o| o.as_record().is_some()).count();
        assert_eq!(blocks, 10);
    }
}
