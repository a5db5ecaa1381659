//! Pluggable primitive conversion, and the Avro binary encoding behind it.
//!
//! A [`PrimitiveCodec`] turns each primitive source value into an
//! `apache-avro` [`Datum`]; the datum walk in [`crate::datum`] decides the
//! traversal, the codec only the leaf values. Bytes are always produced by
//! `apache-avro`:
//!
//! | Avro type | encoding                                         |
//! |-----------|--------------------------------------------------|
//! | null      | nothing                                          |
//! | boolean   | one byte, 0 or 1                                 |
//! | int, long | zig-zag varint                                   |
//! | float     | 4 bytes, little-endian IEEE 754                  |
//! | double    | 8 bytes, little-endian IEEE 754                  |
//! | bytes     | long length, then the bytes                      |
//! | string    | long length, then UTF-8 bytes                    |
//! | array     | blocks of (long count, items), closed by count 0 |
//! | union     | long branch index, then the branch value         |
//! | record    | field values in schema order                     |

use crate::datum::Datum;
use crate::error::EncodeError;
use apache_avro::Schema;

/// A strategy for producing primitive values.
///
/// Every hook has a default that yields the matching Avro value, so an
/// implementation overrides only what it needs. Hooks are called in target
/// schema order, depth first.
pub trait PrimitiveCodec {
    fn null(&self) -> Datum {
        Datum::Null
    }

    fn boolean(&self, value: bool) -> Datum {
        Datum::Boolean(value)
    }

    fn int(&self, value: i32) -> Datum {
        Datum::Int(value)
    }

    fn long(&self, value: i64) -> Datum {
        Datum::Long(value)
    }

    fn float(&self, value: f32) -> Datum {
        Datum::Float(value)
    }

    fn double(&self, value: f64) -> Datum {
        Datum::Double(value)
    }

    fn bytes(&self, value: &[u8]) -> Datum {
        Datum::Bytes(value.to_vec())
    }

    fn string(&self, value: &str) -> Datum {
        Datum::String(value.to_string())
    }
}

/// Plain Avro values, unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct AvroCodec;

impl PrimitiveCodec for AvroCodec {}

/// Validates `datum` against `schema` and encodes it as a bare Avro binary
/// message. The error carries an empty field path.
pub fn encode_datum(schema: &Schema, datum: Datum) -> Result<Vec<u8>, EncodeError> {
    apache_avro::to_avro_datum(schema, datum).map_err(|err| EncodeError::Codec {
        field: String::new(),
        message: err.to_string(),
    })
}
