//! The target side: an Avro schema, parsed by `apache-avro` and lowered
//! into a small typed tree the compatibility checker walks.
//!
//! Only the shapes the encoder can populate get their own node
//! (primitives, arrays, records and `null` unions). Everything else
//! (`map`, `enum`, `fixed`, `decimal`, wider unions) lowers into
//! [`TargetType::Unsupported`] so the checker can name it.

use crate::error::{Error, Result};
use apache_avro::schema::{Name, UnionSchema};
use apache_avro::Schema;
use serde_json::Value as Json;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// One node of the target schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetType {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Array(Box<TargetType>),
    Record(RecordSchema),
    /// A two-branch union with `null`. `null_index` is the position of the
    /// `null` branch, the value branch is the other one.
    Nullable {
        inner: Box<TargetType>,
        null_index: usize,
    },
    Unsupported(String),
}

impl TargetType {
    pub fn name(&self) -> String {
        match self {
            Self::Null => "null".into(),
            Self::Boolean => "boolean".into(),
            Self::Int => "int".into(),
            Self::Long => "long".into(),
            Self::Float => "float".into(),
            Self::Double => "double".into(),
            Self::Bytes => "bytes".into(),
            Self::String => "string".into(),
            Self::Array(items) => format!("array<{}>", items.name()),
            Self::Record(record) => format!("record {}", record.name),
            Self::Nullable { inner, .. } => format!("nullable {}", inner.name()),
            Self::Unsupported(kind) => kind.clone(),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// A field of a target record.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetField {
    pub name: String,
    pub ty: TargetType,
    pub default: Option<Json>,
}

impl TargetField {
    /// A required field must be populated from the source record.
    pub fn is_required(&self) -> bool {
        self.default.is_none()
            && !matches!(self.ty, TargetType::Nullable { .. })
            && self.ty != TargetType::Null
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// Full name, including the namespace.
    pub name: String,
    pub fields: Vec<TargetField>,
}

/// A parsed Avro record schema: the `apache-avro` schema used to encode
/// and frame datums, plus its lowered [`TargetType`] tree.
#[derive(Debug, Clone)]
pub struct TargetSchema {
    root: RecordSchema,
    avro: Schema,
}

impl TargetSchema {
    /// Parses an Avro schema from JSON text. The top level must be a record.
    pub fn parse_str(text: &str) -> Result<Self> {
        let avro = Schema::parse_str(text).map_err(|e| Error::schema_parse(e.to_string()))?;
        Self::from_avro(avro)
    }

    /// Wraps an already parsed schema.
    pub fn from_avro(avro: Schema) -> Result<Self> {
        match Lowering::default().lower(&avro)? {
            TargetType::Record(root) => Ok(Self { root, avro }),
            other => Err(Error::schema_parse(format!(
                "top-level schema must be a record, found {other}"
            ))),
        }
    }

    /// Reads and parses a schema file (conventionally `.avsc`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_str(&text)
    }

    pub fn root(&self) -> &RecordSchema {
        &self.root
    }

    pub fn fields(&self) -> &[TargetField] {
        &self.root.fields
    }

    pub fn avro(&self) -> &Schema {
        &self.avro
    }
}

/// Walks an `apache-avro` schema. Named types are registered on first
/// definition so later `Ref`s resolve to the same node.
#[derive(Default)]
struct Lowering {
    named: HashMap<String, TargetType>,
    in_progress: HashSet<String>,
}

impl Lowering {
    fn lower(&mut self, schema: &Schema) -> Result<TargetType> {
        Ok(match schema {
            Schema::Null => TargetType::Null,
            Schema::Boolean => TargetType::Boolean,
            Schema::Int | Schema::Date | Schema::TimeMillis => TargetType::Int,
            Schema::Long
            | Schema::TimeMicros
            | Schema::TimestampMillis
            | Schema::TimestampMicros
            | Schema::LocalTimestampMillis
            | Schema::LocalTimestampMicros => TargetType::Long,
            Schema::Float => TargetType::Float,
            Schema::Double => TargetType::Double,
            Schema::Bytes => TargetType::Bytes,
            Schema::String | Schema::Uuid => TargetType::String,
            Schema::Array(items) => TargetType::Array(Box::new(self.lower(items)?)),
            Schema::Map(values) => {
                self.lower(values)?;
                TargetType::Unsupported("map".into())
            }
            Schema::Union(union) => self.lower_union(union)?,
            Schema::Record(record) => {
                let full = record.name.fullname(None);
                self.in_progress.insert(full.clone());
                let fields = record
                    .fields
                    .iter()
                    .map(|field| {
                        Ok(TargetField {
                            name: field.name.clone(),
                            ty: self.lower(&field.schema)?,
                            default: field.default.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.in_progress.remove(&full);
                let ty = TargetType::Record(RecordSchema {
                    name: full.clone(),
                    fields,
                });
                self.named.insert(full, ty.clone());
                ty
            }
            Schema::Enum(e) => self.unsupported_named(&e.name, "enum"),
            Schema::Fixed(f) => self.unsupported_named(&f.name, "fixed"),
            Schema::Decimal(decimal) => {
                self.lower(&decimal.inner)?;
                TargetType::Unsupported("decimal".into())
            }
            Schema::Duration => TargetType::Unsupported("duration".into()),
            Schema::Ref { name } => self.resolve(name)?,
        })
    }

    fn lower_union(&mut self, union: &UnionSchema) -> Result<TargetType> {
        let branches = union
            .variants()
            .iter()
            .map(|b| self.lower(b))
            .collect::<Result<Vec<_>>>()?;
        Ok(match branches.as_slice() {
            [TargetType::Null, other] if *other != TargetType::Null => TargetType::Nullable {
                inner: Box::new(other.clone()),
                null_index: 0,
            },
            [other, TargetType::Null] if *other != TargetType::Null => TargetType::Nullable {
                inner: Box::new(other.clone()),
                null_index: 1,
            },
            _ => TargetType::Unsupported(format!("union of {} branches", branches.len())),
        })
    }

    fn unsupported_named(&mut self, name: &Name, kind: &str) -> TargetType {
        let ty = TargetType::Unsupported(kind.to_string());
        self.named.insert(name.fullname(None), ty.clone());
        ty
    }

    fn resolve(&self, name: &Name) -> Result<TargetType> {
        let full = name.fullname(None);
        if self.in_progress.contains(&full) {
            return Err(Error::schema_parse(format!(
                "recursive reference to `{full}` is not supported"
            )));
        }
        self.named
            .get(&full)
            .cloned()
            .ok_or_else(|| Error::schema_parse(format!("unknown type `{full}`")))
    }
}
