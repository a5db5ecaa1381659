//! Writes every emitted container block to its own `.avro` file.
//!
//! Run with `RUST_LOG=avrostream=debug` to see flush decisions.

use avrostream::{
    record, EncoderBuilder, EncoderConfig, FlushConfig, Record, Signal, Sink, SourceSchema,
    SourceType, TargetSchema, Value,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA: &str = r#"{
    "type": "record",
    "name": "Trade",
    "namespace": "demo",
    "fields": [
        {"name": "symbol", "type": "string"},
        {"name": "price", "type": "double"},
        {"name": "size", "type": "long"},
        {"name": "venue", "type": "string", "default": "XNAS"}
    ]
}"#;

/// Collects the current block and writes it out when the boundary arrives.
struct BlockFiles {
    dir: PathBuf,
    pending: Option<Vec<u8>>,
    written: Vec<PathBuf>,
}

impl Sink for BlockFiles {
    fn submit(&mut self, record: Record) -> avrostream::Result<()> {
        if let Some(Value::Blob(bytes)) = record.get(1) {
            self.pending = Some(bytes.clone());
        }
        Ok(())
    }

    fn punctuate(&mut self, signal: Signal) -> avrostream::Result<()> {
        if signal == Signal::Boundary {
            if let Some(bytes) = self.pending.take() {
                let path = self.dir.join(format!("trades-{:04}.avro", self.written.len()));
                fs::write(&path, bytes)?;
                tracing::info!(path = %path.display(), "wrote block");
                self.written.push(path);
            }
        }
        Ok(())
    }
}

fn main() -> avrostream::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let source = SourceSchema::new()
        .with("symbol", SourceType::Text)
        .with("price", SourceType::Float64)
        .with("size", SourceType::Int64);
    let output = SourceSchema::new()
        .with("symbol", SourceType::Text)
        .with("avroMessage", SourceType::Blob);
    let config = EncoderConfig::new(
        FlushConfig::embedded()
            .with_min_records(250)
            .with_flush_on_boundary_signal(true),
    );

    let dir = std::env::temp_dir().join("avrostream-demo");
    fs::create_dir_all(&dir)?;
    let sink = BlockFiles {
        dir,
        pending: None,
        written: Vec::new(),
    };

    let mut encoder = EncoderBuilder::new(config, source, output)
        .target_schema(TargetSchema::parse_str(SCHEMA)?)
        .build(sink)?;

    let symbols = ["AAPL", "MSFT", "NVDA", "AMZN"];
    for i in 0..1_000u32 {
        let symbol = symbols[i as usize % symbols.len()];
        encoder.submit(&record![symbol, 100.0 + f64::from(i % 50) * 0.25, i64::from(i % 7 + 1)])?;
        // A window closes every 400 trades.
        if i % 400 == 399 {
            encoder.signal(Signal::Boundary)?;
        }
    }
    encoder.signal(Signal::EndOfStream)?;

    let stats = encoder.stats();
    let files = &encoder.sink().written;
    println!(
        "{} records in {} blocks, written to {}",
        stats.encoded,
        files.len(),
        encoder.sink().dir.display()
    );
    Ok(())
}
