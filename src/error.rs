use thiserror::Error;

use crate::compat::FieldIncompatibility;

/// Error types for the avrostream library.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying I/O errors, e.g. an unreadable schema file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration text that is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema text that does not describe a usable Avro record schema.
    #[error("Invalid Avro schema: {message}")]
    SchemaParse { message: String },

    /// The Avro writer failed while framing a container unit.
    #[error("Avro error: {0}")]
    Avro(#[from] apache_avro::Error),

    /// The source record shape cannot populate the target schema.
    #[error("Source schema does not match target schema: {}", join_failures(.failures))]
    Incompatible { failures: Vec<FieldIncompatibility> },

    /// The output field is missing from the output schema or is not a blob.
    #[error("Output field `{name}`: {reason}")]
    OutputField { name: String, reason: String },

    /// Inconsistent flush configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The downstream collaborator rejected an emitted record or signal.
    #[error("Downstream error: {0}")]
    Downstream(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A record or signal arrived after end-of-stream.
    #[error("Encoder is closed: end-of-stream already received")]
    Closed,

    /// Per-record failures reached the configured consecutive limit.
    #[error("{count} consecutive records failed to encode, last: {last}")]
    TooManyFailures { count: u64, last: EncodeError },
}

impl Error {
    /// Create a new `SchemaParse` error with a descriptive message.
    pub fn schema_parse(message: impl Into<String>) -> Self {
        Self::SchemaParse {
            message: message.into(),
        }
    }

    /// Create a new `InvalidConfig` error with a descriptive message.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a new `OutputField` error.
    pub fn output_field(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OutputField {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wrap any sink-side error.
    pub fn downstream(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Downstream(Box::new(err))
    }
}

fn join_failures(failures: &[FieldIncompatibility]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A failure to map or encode one record. The record is skipped; the
/// accumulated block is untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// A null or absent value for a target field that requires one.
    #[error("missing value for required field `{field}`")]
    MissingValue { field: String },

    /// A runtime value whose type differs from the declared source type.
    #[error("field `{field}`: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A numeric value that does not fit the narrower target type.
    #[error("field `{field}`: value {value} does not fit in {target}")]
    OutOfRange {
        field: String,
        value: i64,
        target: &'static str,
    },

    /// A record or tuple with fewer values than its schema declares.
    #[error("field `{field}`: expected {expected} values, found {found}")]
    Arity {
        field: String,
        expected: usize,
        found: usize,
    },

    /// The encoded datum was rejected by the Avro writer, e.g. a custom
    /// codec produced a value of the wrong type.
    #[error("field `{field}`: {message}")]
    Codec { field: String, message: String },
}

impl EncodeError {
    /// Prefixes the failing field path with the enclosing field name.
    pub(crate) fn within(mut self, parent: &str) -> Self {
        let field = match &mut self {
            Self::MissingValue { field }
            | Self::TypeMismatch { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::Arity { field, .. }
            | Self::Codec { field, .. } => field,
        };
        *field = if field.is_empty() {
            parent.to_string()
        } else if field.starts_with('[') {
            format!("{parent}{field}")
        } else {
            format!("{parent}.{field}")
        };
        self
    }

    /// Dotted path of the failing field.
    pub fn field(&self) -> &str {
        match self {
            Self::MissingValue { field }
            | Self::TypeMismatch { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::Arity { field, .. }
            | Self::Codec { field, .. } => field,
        }
    }
}

/// Result type alias for the library operations.
pub type Result<T> = std::result::Result<T, Error>;
