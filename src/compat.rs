//! Startup check that a source record shape can populate a target schema.
//!
//! The check walks the target schema once and produces a [`FieldMapping`]:
//! for each target field, the index of the source attribute it is read
//! from and the coercion applied to it. Every failing field is collected,
//! not only the first one.

use crate::datum::Datum;
use crate::error::{Error, Result};
use crate::schema::{RecordSchema, TargetField, TargetSchema, TargetType};
use crate::value::{SourceSchema, SourceType};
use serde_json::Value as Json;
use std::fmt;

/// Primitive conversion from a source type to a target type.
///
/// | source  | target         |
/// |---------|----------------|
/// | boolean | boolean        |
/// | int32   | int, long      |
/// | int64   | long, int (range checked) |
/// | float32 | float, double  |
/// | float64 | double, float  |
/// | text    | string         |
/// | blob    | bytes          |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Boolean,
    IntToInt,
    IntToLong,
    LongToInt,
    LongToLong,
    FloatToFloat,
    FloatToDouble,
    DoubleToFloat,
    DoubleToDouble,
    Text,
    Blob,
}

impl Coercion {
    pub fn resolve(source: &SourceType, target: &TargetType) -> Option<Self> {
        use SourceType as S;
        use TargetType as T;
        Some(match (source, target) {
            (S::Boolean, T::Boolean) => Self::Boolean,
            (S::Int32, T::Int) => Self::IntToInt,
            (S::Int32, T::Long) => Self::IntToLong,
            (S::Int64, T::Int) => Self::LongToInt,
            (S::Int64, T::Long) => Self::LongToLong,
            (S::Float32, T::Float) => Self::FloatToFloat,
            (S::Float32, T::Double) => Self::FloatToDouble,
            (S::Float64, T::Float) => Self::DoubleToFloat,
            (S::Float64, T::Double) => Self::DoubleToDouble,
            (S::Text, T::String) => Self::Text,
            (S::Blob, T::Bytes) => Self::Blob,
            _ => return None,
        })
    }

    /// Name of the source type this coercion reads.
    pub fn source_name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::IntToInt | Self::IntToLong => "int32",
            Self::LongToInt | Self::LongToLong => "int64",
            Self::FloatToFloat | Self::FloatToDouble => "float32",
            Self::DoubleToFloat | Self::DoubleToDouble => "float64",
            Self::Text => "text",
            Self::Blob => "blob",
        }
    }
}

/// How one target value is produced from one source value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValuePlan {
    Primitive(Coercion),
    List(Box<ValuePlan>),
    Record(RecordPlan),
    Nullable {
        null_index: usize,
        inner: Box<ValuePlan>,
    },
}

/// How one target field is populated.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPlan {
    /// Read from the source attribute at `index`.
    Mapped {
        name: String,
        index: usize,
        plan: ValuePlan,
    },
    /// No source attribute; the field's default is written.
    Defaulted { name: String, datum: Datum },
}

impl FieldPlan {
    pub fn name(&self) -> &str {
        match self {
            Self::Mapped { name, .. } | Self::Defaulted { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordPlan {
    pub(crate) fields: Vec<FieldPlan>,
    /// Number of values a source tuple of this shape carries.
    pub(crate) arity: usize,
}

impl RecordPlan {
    pub fn fields(&self) -> &[FieldPlan] {
        &self.fields
    }
}

/// The validated relation between a source shape and a target schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    pub(crate) root: RecordPlan,
    record_name: String,
}

impl FieldMapping {
    pub fn root(&self) -> &RecordPlan {
        &self.root
    }

    /// Full name of the target record.
    pub fn record_name(&self) -> &str {
        &self.record_name
    }
}

/// Why a target field cannot be populated.
#[derive(Debug, Clone, PartialEq)]
pub enum IncompatibilityReason {
    /// No source attribute of that name, and the field is required.
    Missing { expected: String },
    TypeMismatch { expected: String, found: String },
    Unsupported { kind: String },
    InvalidDefault { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldIncompatibility {
    /// Dotted path of the target field; `[]` marks list elements.
    pub field: String,
    pub reason: IncompatibilityReason,
}

impl fmt::Display for FieldIncompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            IncompatibilityReason::Missing { expected } => write!(
                f,
                "required field `{}` ({expected}) has no source attribute",
                self.field
            ),
            IncompatibilityReason::TypeMismatch { expected, found } => write!(
                f,
                "field `{}`: target {expected} cannot be populated from source {found}",
                self.field
            ),
            IncompatibilityReason::Unsupported { kind } => {
                write!(f, "field `{}`: target type {kind} is not supported", self.field)
            }
            IncompatibilityReason::InvalidDefault { message } => {
                write!(f, "field `{}`: invalid default, {message}", self.field)
            }
        }
    }
}

/// Validates that every target field can be populated from `source`.
///
/// Returns the mapping on success, or `Error::Incompatible` listing every
/// failing field.
pub fn check(source: &SourceSchema, target: &TargetSchema) -> Result<FieldMapping> {
    let mut failures = Vec::new();
    let root = plan_record(source, target.root(), "", &mut failures);
    match root {
        Some(root) if failures.is_empty() => Ok(FieldMapping {
            root,
            record_name: target.root().name.clone(),
        }),
        _ => {
            for failure in &failures {
                tracing::error!(record = %target.root().name, "{failure}");
            }
            Err(Error::Incompatible { failures })
        }
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn plan_record(
    source: &SourceSchema,
    target: &RecordSchema,
    path: &str,
    failures: &mut Vec<FieldIncompatibility>,
) -> Option<RecordPlan> {
    let before = failures.len();
    let mut fields = Vec::with_capacity(target.fields.len());

    for field in &target.fields {
        let field_path = join_path(path, &field.name);
        match source.find(&field.name) {
            Some((index, attr)) => {
                if let Some(plan) = plan_value(&attr.ty, &field.ty, &field_path, failures) {
                    fields.push(FieldPlan::Mapped {
                        name: field.name.clone(),
                        index,
                        plan,
                    });
                }
            }
            None if field.is_required() => failures.push(FieldIncompatibility {
                field: field_path,
                reason: IncompatibilityReason::Missing {
                    expected: field.ty.name(),
                },
            }),
            None => match field_default(field) {
                Ok(datum) => fields.push(FieldPlan::Defaulted {
                    name: field.name.clone(),
                    datum,
                }),
                Err(message) => failures.push(FieldIncompatibility {
                    field: field_path,
                    reason: IncompatibilityReason::InvalidDefault { message },
                }),
            },
        }
    }

    (failures.len() == before).then(|| RecordPlan {
        fields,
        arity: source.len(),
    })
}

fn plan_value(
    source: &SourceType,
    target: &TargetType,
    path: &str,
    failures: &mut Vec<FieldIncompatibility>,
) -> Option<ValuePlan> {
    match (source, target) {
        (_, TargetType::Nullable { inner, null_index }) => plan_value(source, inner, path, failures)
            .map(|plan| ValuePlan::Nullable {
                null_index: *null_index,
                inner: Box::new(plan),
            }),
        (SourceType::List(element), TargetType::Array(items)) => {
            plan_value(element, items, &format!("{path}[]"), failures)
                .map(|plan| ValuePlan::List(Box::new(plan)))
        }
        (SourceType::Tuple(schema), TargetType::Record(record)) => {
            plan_record(schema, record, path, failures).map(ValuePlan::Record)
        }
        (_, TargetType::Unsupported(kind)) => {
            failures.push(FieldIncompatibility {
                field: path.to_string(),
                reason: IncompatibilityReason::Unsupported { kind: kind.clone() },
            });
            None
        }
        _ => match Coercion::resolve(source, target) {
            Some(coercion) => Some(ValuePlan::Primitive(coercion)),
            None => {
                failures.push(FieldIncompatibility {
                    field: path.to_string(),
                    reason: IncompatibilityReason::TypeMismatch {
                        expected: target.name(),
                        found: source.to_string(),
                    },
                });
                None
            }
        },
    }
}

fn field_default(field: &TargetField) -> std::result::Result<Datum, String> {
    match (&field.default, &field.ty) {
        (Some(json), ty) => default_datum(json, ty),
        (None, TargetType::Nullable { null_index, .. }) => {
            Ok(Datum::Union(*null_index as u32, Box::new(Datum::Null)))
        }
        (None, _) => Ok(Datum::Null),
    }
}

/// Converts a JSON default into a datum of type `ty`. Union defaults
/// belong to the first branch.
fn default_datum(json: &Json, ty: &TargetType) -> std::result::Result<Datum, String> {
    let mismatch = || format!("{json} is not a valid {ty}");
    Ok(match ty {
        TargetType::Null => json.is_null().then_some(Datum::Null).ok_or_else(mismatch)?,
        TargetType::Boolean => Datum::Boolean(json.as_bool().ok_or_else(mismatch)?),
        TargetType::Int => Datum::Int(
            json.as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(mismatch)?,
        ),
        TargetType::Long => Datum::Long(json.as_i64().ok_or_else(mismatch)?),
        TargetType::Float => Datum::Float(json.as_f64().ok_or_else(mismatch)? as f32),
        TargetType::Double => Datum::Double(json.as_f64().ok_or_else(mismatch)?),
        TargetType::String => Datum::String(json.as_str().ok_or_else(mismatch)?.to_string()),
        TargetType::Bytes => {
            // Avro byte defaults are strings of code points 0-255.
            let text = json.as_str().ok_or_else(mismatch)?;
            let bytes = text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).map_err(|_| mismatch()))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Datum::Bytes(bytes)
        }
        TargetType::Array(items) => Datum::Array(
            json.as_array()
                .ok_or_else(mismatch)?
                .iter()
                .map(|item| default_datum(item, items))
                .collect::<std::result::Result<_, _>>()?,
        ),
        TargetType::Record(record) => {
            let obj = json.as_object().ok_or_else(mismatch)?;
            let mut fields = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                let datum = match obj.get(&field.name) {
                    Some(value) => default_datum(value, &field.ty)?,
                    None if field.is_required() => {
                        return Err(format!("default has no value for `{}`", field.name))
                    }
                    None => field_default(field)?,
                };
                fields.push((field.name.clone(), datum));
            }
            Datum::Record(fields)
        }
        TargetType::Nullable { inner, null_index } => {
            if *null_index == 0 {
                json.is_null().then_some(()).ok_or_else(mismatch)?;
                Datum::Union(0, Box::new(Datum::Null))
            } else {
                Datum::Union(0, Box::new(default_datum(json, inner)?))
            }
        }
        TargetType::Unsupported(kind) => return Err(format!("{kind} defaults are not supported")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(fields: &str) -> TargetSchema {
        TargetSchema::parse_str(&format!(
            r#"{{"type":"record","name":"T","fields":[{fields}]}}"#
        ))
        .unwrap()
    }

    fn failures(source: &SourceSchema, target: &TargetSchema) -> Vec<FieldIncompatibility> {
        match check(source, target) {
            Err(Error::Incompatible { failures }) => failures,
            other => panic!("expected incompatibility, got {other:?}"),
        }
    }

    #[test]
    fn maps_fields_by_name_not_position() {
        let source = SourceSchema::new()
            .with("extra", SourceType::Timestamp)
            .with("b", SourceType::Text)
            .with("a", SourceType::Int32);
        let mapping = check(
            &source,
            &target(r#"{"name":"a","type":"long"},{"name":"b","type":"string"}"#),
        )
        .unwrap();
        assert_eq!(
            mapping.root().fields(),
            &[
                FieldPlan::Mapped {
                    name: "a".into(),
                    index: 2,
                    plan: ValuePlan::Primitive(Coercion::IntToLong)
                },
                FieldPlan::Mapped {
                    name: "b".into(),
                    index: 1,
                    plan: ValuePlan::Primitive(Coercion::Text)
                },
            ]
        );
    }

    #[test]
    fn reports_every_failing_field() {
        let source = SourceSchema::new()
            .with("a", SourceType::Text)
            .with("nested", SourceType::Tuple(SourceSchema::new().with("x", SourceType::Boolean)));
        let target = target(
            r#"{"name":"a","type":"int"},
               {"name":"missing","type":"string"},
               {"name":"nested","type":{"type":"record","name":"N","fields":[
                   {"name":"x","type":"double"},{"name":"y","type":"long"}]}}"#,
        );
        let fields: Vec<_> = failures(&source, &target)
            .into_iter()
            .map(|f| f.field)
            .collect();
        assert_eq!(fields, ["a", "missing", "nested.x", "nested.y"]);
    }

    #[test]
    fn optional_fields_fall_back_to_defaults() {
        let source = SourceSchema::new().with("id", SourceType::Int64);
        let mapping = check(
            &source,
            &target(
                r#"{"name":"id","type":"long"},
                   {"name":"note","type":["null","string"]},
                   {"name":"n","type":"int","default":7}"#,
            ),
        )
        .unwrap();
        let fields = mapping.root().fields();
        assert!(matches!(
            &fields[1],
            FieldPlan::Defaulted { datum: Datum::Union(0, inner), .. } if **inner == Datum::Null
        ));
        assert!(matches!(&fields[2], FieldPlan::Defaulted { datum: Datum::Int(7), .. }));
    }

    #[test]
    fn list_elements_are_checked() {
        let source = SourceSchema::new().with("xs", SourceType::list(SourceType::Text));
        let failures = failures(
            &source,
            &target(r#"{"name":"xs","type":{"type":"array","items":"long"}}"#),
        );
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "xs[]");
    }

    #[test]
    fn unsupported_target_types_are_rejected() {
        let source = SourceSchema::new().with("m", SourceType::Text);
        let failures = failures(
            &source,
            &target(r#"{"name":"m","type":{"type":"map","values":"string"}}"#),
        );
        assert!(matches!(
            &failures[0].reason,
            IncompatibilityReason::Unsupported { kind } if kind == "map"
        ));
    }

    #[test]
    fn union_default_must_match_the_first_branch() {
        let source = SourceSchema::new();
        let failures = failures(
            &source,
            &target(r#"{"name":"n","type":["null","string"],"default":"x"}"#),
        );
        assert_eq!(failures[0].field, "n");
        assert!(matches!(
            failures[0].reason,
            IncompatibilityReason::InvalidDefault { .. }
        ));
    }

    #[test]
    fn ill_typed_default_fails_schema_parsing() {
        let result = TargetSchema::parse_str(
            r#"{"type":"record","name":"T","fields":[{"name":"n","type":"int","default":"x"}]}"#,
        );
        assert!(matches!(result, Err(Error::SchemaParse { .. })));
    }

    #[test]
    fn record_defaults_carry_field_names() {
        let source = SourceSchema::new();
        let mapping = check(
            &source,
            &target(
                r#"{"name":"p","type":{"type":"record","name":"P","fields":[
                    {"name":"x","type":"long"},{"name":"tag","type":"string","default":"t"}]},
                    "default":{"x":4}}"#,
            ),
        )
        .unwrap();
        assert_eq!(
            mapping.root().fields()[0],
            FieldPlan::Defaulted {
                name: "p".into(),
                datum: Datum::Record(vec![
                    ("x".into(), Datum::Long(4)),
                    ("tag".into(), Datum::String("t".into())),
                ]),
            }
        );
    }
}
