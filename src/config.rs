//! Encoder configuration.
//!
//! Keys follow the operator option names (`embedSchema`, `minRecords`, ...)
//! so a JSON configuration file can be deserialized directly.

use crate::container::SyncMarker;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Output framing and flush triggers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlushConfig {
    /// Batch records into schema-embedded container blocks.
    pub embed_schema: bool,
    pub flush_on_boundary_signal: bool,
    /// 0 disables the threshold.
    pub min_bytes: u64,
    /// 0 disables the threshold.
    pub min_records: u64,
    /// 0 disables the threshold.
    pub max_interval_seconds: u64,
}

impl FlushConfig {
    /// One bare message per record.
    pub fn bare() -> Self {
        Self::default()
    }

    /// Container blocks; at least one trigger still has to be set.
    pub fn embedded() -> Self {
        Self {
            embed_schema: true,
            ..Self::default()
        }
    }

    pub fn with_flush_on_boundary_signal(mut self, enabled: bool) -> Self {
        self.flush_on_boundary_signal = enabled;
        self
    }

    pub fn with_min_bytes(mut self, bytes: u64) -> Self {
        self.min_bytes = bytes;
        self
    }

    pub fn with_min_records(mut self, records: u64) -> Self {
        self.min_records = records;
        self
    }

    pub fn with_max_interval_seconds(mut self, seconds: u64) -> Self {
        self.max_interval_seconds = seconds;
        self
    }

    /// Whether any threshold or the boundary trigger is set.
    pub fn has_trigger(&self) -> bool {
        self.flush_on_boundary_signal
            || self.min_bytes > 0
            || self.min_records > 0
            || self.max_interval_seconds > 0
    }

    pub fn validate(&self) -> Result<()> {
        const TRIGGERS: &str = "flushOnBoundarySignal, minBytes, minRecords, maxIntervalSeconds";
        match (self.embed_schema, self.has_trigger()) {
            (false, true) => Err(Error::invalid_config(format!(
                "{TRIGGERS} are only valid when embedSchema is true"
            ))),
            (true, false) => Err(Error::invalid_config(format!(
                "embedSchema requires at least one of {TRIGGERS}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Complete encoder configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncoderConfig {
    /// Blob attribute of the output schema receiving the encoded bytes.
    pub output_field: Option<String>,
    /// Location of the Avro schema (`.avsc`) file.
    pub schema_path: Option<PathBuf>,
    #[serde(flatten)]
    pub flush: FlushConfig,
    /// Fail `submit` after this many consecutive undecodable records.
    pub max_consecutive_failures: Option<u64>,
    /// Fixed container sync marker; random when absent.
    pub sync_marker: Option<SyncMarker>,
}

impl EncoderConfig {
    pub fn new(flush: FlushConfig) -> Self {
        Self {
            flush,
            ..Self::default()
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn with_output_field(mut self, name: impl Into<String>) -> Self {
        self.output_field = Some(name.into());
        self
    }

    pub fn with_schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = Some(path.into());
        self
    }

    pub fn with_max_consecutive_failures(mut self, limit: u64) -> Self {
        self.max_consecutive_failures = Some(limit);
        self
    }

    pub fn with_sync_marker(mut self, sync: SyncMarker) -> Self {
        self.sync_marker = Some(sync);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.flush.validate()?;
        if self.max_consecutive_failures == Some(0) {
            return Err(Error::invalid_config(
                "maxConsecutiveFailures must be greater than 0",
            ));
        }
        Ok(())
    }
}
