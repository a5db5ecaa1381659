//! # avrostream
//!
//! Encodes a stream of structured records into Avro binary form against a
//! target schema, emitting either one bare message per record or batched
//! blocks framed as self-describing object containers.
//!
//! ## Overview
//!
//! An encoder is built once per stream. Startup validates everything that
//! can be validated without data:
//!
//! * the output field exists and is a blob,
//! * the target schema parses,
//! * every target field can be populated from the source record shape
//!   ([`compat::check`] reports all failing fields at once),
//! * the flush configuration is consistent.
//!
//! After that, the host drives the encoder with two calls:
//! [`BlockEncoder::submit`] for records and [`BlockEncoder::signal`] for
//! control markers. Output goes to a [`Sink`].
//!
//! ## Quick Start
//!
//! ```rust
//! use avrostream::*;
//!
//! fn main() -> Result<()> {
//!     let schema = TargetSchema::parse_str(r#"{
//!         "type": "record", "name": "Reading",
//!         "fields": [
//!             {"name": "sensor", "type": "string"},
//!             {"name": "value", "type": "double"}
//!         ]
//!     }"#)?;
//!     let source = SourceSchema::new()
//!         .with("sensor", SourceType::Text)
//!         .with("value", SourceType::Float64);
//!     let output = SourceSchema::new().with("avroMessage", SourceType::Blob);
//!
//!     let config = EncoderConfig::new(FlushConfig::embedded().with_min_records(2));
//!     let mut encoder = EncoderBuilder::new(config, source, output)
//!         .target_schema(schema)
//!         .build(Vec::<Output>::new())?;
//!
//!     encoder.submit(&record!["t1", 20.5])?;
//!     encoder.submit(&record!["t2", 21.0])?; // completes a block
//!     encoder.signal(Signal::EndOfStream)?;
//!
//!     // one block, its boundary marker, and the forwarded end-of-stream
//!     assert_eq!(encoder.sink().len(), 3);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! * **[`compat`]**: startup checker producing a [`FieldMapping`]
//! * **[`schema`]**: the target schema, parsed by `apache-avro`
//! * **[`datum`]** and **[`codec`]**: record → [`Datum`] (an
//!   `apache_avro::types::Value`) → bytes, with primitive values taken from
//!   a pluggable [`PrimitiveCodec`]
//! * **[`accumulator`]**, **[`container`]** and **[`policy`]**: the block
//!   being built, its `apache_avro::Writer` framing, and when to cut it
//! * **[`encoder`]**: the engine tying them together

pub mod accumulator;
pub mod clock;
pub mod codec;
pub mod compat;
pub mod config;
pub mod container;
pub mod datum;
pub mod encoder;
pub mod error;
pub mod output;
pub mod policy;
pub mod schema;
pub mod shared;
pub mod sink;
pub mod value;

// Re-export the main public API for user convenience.
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{AvroCodec, PrimitiveCodec};
pub use compat::{FieldIncompatibility, FieldMapping, IncompatibilityReason};
pub use config::{EncoderConfig, FlushConfig};
pub use datum::Datum;
pub use encoder::{BlockEncoder, EncoderBuilder, EncoderStats, SubmitOutcome};
pub use error::{EncodeError, Error, Result};
pub use policy::FlushReason;
pub use schema::{TargetSchema, TargetType};
pub use shared::SharedEncoder;
pub use sink::{Output, Signal, Sink};
pub use value::{Record, SourceSchema, SourceType, Value};
