//! The encode-and-batch engine.

use crate::accumulator::BlockAccumulator;
use crate::clock::{Clock, SystemClock};
use crate::codec::{encode_datum, AvroCodec, PrimitiveCodec};
use crate::compat::{self, FieldMapping};
use crate::config::EncoderConfig;
use crate::container::{random_sync_marker, ContainerFormat};
use crate::datum::Datum;
use crate::error::{EncodeError, Error, Result};
use crate::output::OutputLayout;
use crate::policy::{FlushPolicy, FlushReason};
use crate::schema::TargetSchema;
use crate::sink::{Signal, Sink};
use crate::value::{Record, SourceSchema};
use apache_avro::Schema;

/// What happened to a submitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Appended to the current block, no emit yet.
    Buffered,
    /// An output record was emitted (bare message, or a block that this
    /// record completed).
    Emitted,
    /// The record failed to encode and was dropped.
    Skipped,
}

/// Running totals since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStats {
    pub submitted: u64,
    pub encoded: u64,
    pub skipped: u64,
    /// Output records emitted: blocks in embedded mode, messages in bare mode.
    pub emitted: u64,
}

#[derive(Debug)]
enum Mode {
    Bare,
    Embedded {
        accumulator: BlockAccumulator,
        policy: FlushPolicy,
        /// Pass-through source for the next block's output record.
        last_record: Option<Record>,
    },
}

/// Encodes records against a target schema and hands the bytes to a `Sink`,
/// either one bare message per record or batched into container blocks.
///
/// The encoder is single-writer: `submit` and `signal` take `&mut self`.
/// Hosts delivering from several threads wrap it in a
/// [`SharedEncoder`](crate::SharedEncoder).
pub struct BlockEncoder<S: Sink, C: PrimitiveCodec = AvroCodec, K: Clock = SystemClock> {
    mapping: FieldMapping,
    schema: Schema,
    layout: OutputLayout,
    mode: Mode,
    codec: C,
    clock: K,
    sink: S,
    stats: EncoderStats,
    consecutive_failures: u64,
    max_consecutive_failures: Option<u64>,
    closed: bool,
}

impl<S: Sink, C: PrimitiveCodec, K: Clock> BlockEncoder<S, C, K> {
    /// Maps, encodes and buffers or emits one record.
    ///
    /// A record that fails to encode is logged and skipped; only sink
    /// failures (and the optional failure limit) surface as errors.
    pub fn submit(&mut self, record: &Record) -> Result<SubmitOutcome> {
        if self.closed {
            return Err(Error::Closed);
        }
        self.stats.submitted += 1;
        let seq = self.stats.submitted;
        tracing::trace!(record = seq, "encoding record");

        let encoded = encode_record(
            &self.mapping,
            &self.codec,
            &self.schema,
            record,
            self.is_embedded(),
        );
        let (payload, retained) = match encoded {
            Ok(encoded) => encoded,
            Err(err) => return self.record_failed(seq, record, err),
        };
        self.consecutive_failures = 0;
        self.stats.encoded += 1;

        let reason = match (&mut self.mode, retained) {
            (
                Mode::Embedded {
                    accumulator,
                    policy,
                    last_record,
                },
                Some(datum),
            ) => {
                accumulator.append(datum, payload.len());
                *last_record = Some(record.clone());
                policy.after_append(&accumulator.stats(self.clock.now()))
            }
            _ => {
                self.sink.submit(self.layout.project(Some(record), payload))?;
                self.stats.emitted += 1;
                return Ok(SubmitOutcome::Emitted);
            }
        };

        match reason {
            Some(reason) => {
                self.emit_block(reason)?;
                Ok(SubmitOutcome::Emitted)
            }
            None => Ok(SubmitOutcome::Buffered),
        }
    }

    /// Handles a control signal.
    ///
    /// Bare mode forwards every signal. Embedded mode may emit the current
    /// block, and forwards only `EndOfStream`, after the final drain.
    pub fn signal(&mut self, signal: Signal) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        tracing::debug!(?signal, "signal received");

        let reason = match &self.mode {
            Mode::Bare => None,
            Mode::Embedded {
                accumulator,
                policy,
                ..
            } => policy.on_signal(signal, &accumulator.stats(self.clock.now())),
        };
        if let Some(reason) = reason {
            self.emit_block(reason)?;
        }

        match (&self.mode, signal) {
            (Mode::Embedded { .. }, Signal::Boundary) => {}
            _ => self.sink.punctuate(signal)?,
        }
        if signal == Signal::EndOfStream {
            self.closed = true;
            tracing::debug!(
                submitted = self.stats.submitted,
                skipped = self.stats.skipped,
                emitted = self.stats.emitted,
                "end of stream"
            );
        }
        Ok(())
    }

    fn record_failed(&mut self, seq: u64, record: &Record, err: EncodeError) -> Result<SubmitOutcome> {
        self.stats.skipped += 1;
        self.consecutive_failures += 1;
        tracing::warn!(
            record = seq,
            error = %err,
            input = ?record,
            "skipping record that failed to encode"
        );
        match self.max_consecutive_failures {
            Some(limit) if self.consecutive_failures >= limit => Err(Error::TooManyFailures {
                count: self.consecutive_failures,
                last: err,
            }),
            _ => Ok(SubmitOutcome::Skipped),
        }
    }

    /// Emits the current block followed by a boundary signal. The buffer is
    /// reset only once the sink accepted the block.
    fn emit_block(&mut self, reason: FlushReason) -> Result<()> {
        let Self {
            mode,
            layout,
            sink,
            clock,
            stats,
            ..
        } = self;
        let Mode::Embedded {
            accumulator,
            last_record,
            ..
        } = mode
        else {
            return Ok(());
        };
        let Some(block) = accumulator.snapshot()? else {
            return Ok(());
        };

        let bytes = block.bytes.len();
        sink.submit(layout.project(last_record.as_ref(), block.bytes))?;
        accumulator.reset(clock.now());
        *last_record = None;
        stats.emitted += 1;
        tracing::debug!(?reason, records = block.records, bytes, "emitted block");

        sink.punctuate(Signal::Boundary)
    }

    pub fn stats(&self) -> EncoderStats {
        self.stats
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn output_field(&self) -> &str {
        self.layout.output_field()
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.mode, Mode::Embedded { .. })
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Records in the current block; always 0 in bare mode.
    pub fn buffered_records(&self) -> u64 {
        match &self.mode {
            Mode::Bare => 0,
            Mode::Embedded { accumulator, .. } => accumulator.record_count(),
        }
    }

    /// Size of the block that would be emitted now; 0 when nothing is buffered.
    pub fn buffered_bytes(&self) -> usize {
        match &self.mode {
            Mode::Embedded { accumulator, .. } if !accumulator.is_empty() => {
                accumulator.byte_size()
            }
            _ => 0,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consumes the encoder, returning the sink. Buffered records are dropped;
    /// send `Signal::EndOfStream` first to drain them.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// Maps and encodes one record. With `retain` the datum is also returned
/// for the container writer.
fn encode_record<C: PrimitiveCodec>(
    mapping: &FieldMapping,
    codec: &C,
    schema: &Schema,
    record: &Record,
    retain: bool,
) -> std::result::Result<(Vec<u8>, Option<Datum>), EncodeError> {
    let datum = mapping.build_datum_with(codec, record)?;
    let retained = retain.then(|| datum.clone());
    let bytes = encode_datum(schema, datum).map_err(|err| err.within(mapping.record_name()))?;
    Ok((bytes, retained))
}

/// Validates configuration and schemas, then constructs a [`BlockEncoder`].
pub struct EncoderBuilder<C = AvroCodec, K = SystemClock> {
    config: EncoderConfig,
    source: SourceSchema,
    output: SourceSchema,
    target: Option<TargetSchema>,
    codec: C,
    clock: K,
}

impl EncoderBuilder {
    pub fn new(config: EncoderConfig, source: SourceSchema, output: SourceSchema) -> Self {
        Self {
            config,
            source,
            output,
            target: None,
            codec: AvroCodec,
            clock: SystemClock,
        }
    }
}

impl<C: PrimitiveCodec, K: Clock> EncoderBuilder<C, K> {
    /// Uses an already parsed schema instead of reading `schemaPath`.
    pub fn target_schema(mut self, schema: TargetSchema) -> Self {
        self.target = Some(schema);
        self
    }

    pub fn codec<C2: PrimitiveCodec>(self, codec: C2) -> EncoderBuilder<C2, K> {
        EncoderBuilder {
            config: self.config,
            source: self.source,
            output: self.output,
            target: self.target,
            codec,
            clock: self.clock,
        }
    }

    pub fn clock<K2: Clock>(self, clock: K2) -> EncoderBuilder<C, K2> {
        EncoderBuilder {
            config: self.config,
            source: self.source,
            output: self.output,
            target: self.target,
            codec: self.codec,
            clock,
        }
    }

    /// Runs every startup check. Any failure is fatal: no encoder is built.
    pub fn build<S: Sink>(self, sink: S) -> Result<BlockEncoder<S, C, K>> {
        self.try_build(sink).inspect_err(|err| {
            tracing::error!(error = %err, "encoder initialization failed");
        })
    }

    fn try_build<S: Sink>(self, sink: S) -> Result<BlockEncoder<S, C, K>> {
        let config = self.config;
        let layout =
            OutputLayout::resolve(&self.source, &self.output, config.output_field.as_deref())?;

        let target = match (self.target, &config.schema_path) {
            (Some(schema), _) => schema,
            (None, Some(path)) => {
                tracing::trace!(path = %path.display(), "loading target schema");
                TargetSchema::from_file(path)?
            }
            (None, None) => {
                return Err(Error::invalid_config("schemaPath is required"));
            }
        };
        let mapping = compat::check(&self.source, &target)?;
        config.validate()?;

        let mode = if config.flush.embed_schema {
            let sync = config.sync_marker.unwrap_or_else(random_sync_marker);
            Mode::Embedded {
                accumulator: BlockAccumulator::new(
                    ContainerFormat::new(target.avro(), sync)?,
                    self.clock.now(),
                ),
                policy: FlushPolicy::new(&config.flush),
                last_record: None,
            }
        } else {
            Mode::Bare
        };

        tracing::info!(
            schema = %mapping.record_name(),
            output_field = layout.output_field(),
            embed_schema = config.flush.embed_schema,
            flush_on_boundary_signal = config.flush.flush_on_boundary_signal,
            min_bytes = config.flush.min_bytes,
            min_records = config.flush.min_records,
            max_interval_seconds = config.flush.max_interval_seconds,
            "encoder initialized"
        );

        Ok(BlockEncoder {
            mapping,
            schema: target.avro().clone(),
            layout,
            mode,
            codec: self.codec,
            clock: self.clock,
            sink,
            stats: EncoderStats::default(),
            consecutive_failures: 0,
            max_consecutive_failures: config.max_consecutive_failures,
            closed: false,
        })
    }
}
