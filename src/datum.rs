//! Schema-conformant value trees built from source records.

use crate::codec::{AvroCodec, PrimitiveCodec};
use crate::compat::{Coercion, FieldMapping, FieldPlan, RecordPlan, ValuePlan};
use crate::error::EncodeError;
use crate::value::{Record, Value};

/// A value conforming to the target schema.
pub type Datum = apache_avro::types::Value;

impl FieldMapping {
    /// Builds the datum for one source record with plain Avro values.
    pub fn build_datum(&self, record: &Record) -> Result<Datum, EncodeError> {
        self.build_datum_with(&AvroCodec, record)
    }

    /// Builds the datum for one source record, taking primitive values
    /// from `codec`.
    pub fn build_datum_with<C: PrimitiveCodec>(
        &self,
        codec: &C,
        record: &Record,
    ) -> Result<Datum, EncodeError> {
        self.root.build(codec, record.values()).map_err(|err| {
            if err.field().is_empty() {
                err.within(self.record_name())
            } else {
                err
            }
        })
    }
}

impl RecordPlan {
    fn build<C: PrimitiveCodec>(&self, codec: &C, values: &[Value]) -> Result<Datum, EncodeError> {
        if values.len() < self.arity {
            return Err(EncodeError::Arity {
                field: String::new(),
                expected: self.arity,
                found: values.len(),
            });
        }
        let mut out = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let datum = match field {
                FieldPlan::Mapped { name, index, plan } => plan
                    .build(codec, &values[*index])
                    .map_err(|e| e.within(name))?,
                FieldPlan::Defaulted { datum, .. } => datum.clone(),
            };
            out.push((field.name().to_string(), datum));
        }
        Ok(Datum::Record(out))
    }
}

impl ValuePlan {
    fn build<C: PrimitiveCodec>(&self, codec: &C, value: &Value) -> Result<Datum, EncodeError> {
        match (self, value) {
            (Self::Nullable { null_index, .. }, Value::Null) => {
                Ok(Datum::Union(*null_index as u32, Box::new(codec.null())))
            }
            (Self::Nullable { null_index, inner }, value) => Ok(Datum::Union(
                (1 - null_index) as u32,
                Box::new(inner.build(codec, value)?),
            )),
            (_, Value::Null) => Err(EncodeError::MissingValue {
                field: String::new(),
            }),
            (Self::Primitive(coercion), value) => coercion.apply(codec, value),
            (Self::List(element), Value::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    element
                        .build(codec, item)
                        .map_err(|e| e.within(&format!("[{i}]")))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Datum::Array),
            (Self::Record(plan), Value::Tuple(values)) => plan.build(codec, values),
            (Self::List(_), other) => Err(mismatch("list", other)),
            (Self::Record(_), other) => Err(mismatch("tuple", other)),
        }
    }
}

fn mismatch(expected: &'static str, found: &Value) -> EncodeError {
    EncodeError::TypeMismatch {
        field: String::new(),
        expected,
        found: found.kind(),
    }
}

impl Coercion {
    /// Converts one primitive value through `codec`.
    pub fn apply<C: PrimitiveCodec>(self, codec: &C, value: &Value) -> Result<Datum, EncodeError> {
        Ok(match (self, value) {
            (Self::Boolean, Value::Boolean(v)) => codec.boolean(*v),
            (Self::IntToInt, Value::Int32(v)) => codec.int(*v),
            (Self::IntToLong, Value::Int32(v)) => codec.long(i64::from(*v)),
            (Self::LongToInt, Value::Int64(v)) => {
                codec.int(i32::try_from(*v).map_err(|_| EncodeError::OutOfRange {
                    field: String::new(),
                    value: *v,
                    target: "int",
                })?)
            }
            (Self::LongToLong, Value::Int64(v)) => codec.long(*v),
            (Self::FloatToFloat, Value::Float32(v)) => codec.float(*v),
            (Self::FloatToDouble, Value::Float32(v)) => codec.double(f64::from(*v)),
            (Self::DoubleToFloat, Value::Float64(v)) => codec.float(*v as f32),
            (Self::DoubleToDouble, Value::Float64(v)) => codec.double(*v),
            (Self::Text, Value::Text(v)) => codec.string(v),
            (Self::Blob, Value::Blob(v)) => codec.bytes(v),
            (coercion, other) => return Err(mismatch(coercion.source_name(), other)),
        })
    }
}
