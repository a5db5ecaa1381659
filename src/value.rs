//! The source side: record shapes delivered by the host and their values.

use std::fmt;

/// Type of one attribute of an incoming record.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceType {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Blob,
    /// Microseconds since the epoch. Has no Avro primitive counterpart.
    Timestamp,
    List(Box<SourceType>),
    Tuple(SourceSchema),
}

impl SourceType {
    pub fn list(element: SourceType) -> Self {
        Self::List(Box::new(element))
    }

    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Text => "text",
            Self::Blob => "blob",
            Self::Timestamp => "timestamp",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
        }
    }

    /// The value an attribute of this type holds when nothing was assigned.
    pub fn default_value(&self) -> Value {
        match self {
            Self::Boolean => Value::Boolean(false),
            Self::Int32 => Value::Int32(0),
            Self::Int64 => Value::Int64(0),
            Self::Float32 => Value::Float32(0.0),
            Self::Float64 => Value::Float64(0.0),
            Self::Text => Value::Text(String::new()),
            Self::Blob => Value::Blob(Vec::new()),
            Self::Timestamp => Value::Timestamp(0),
            Self::List(_) => Value::List(Vec::new()),
            Self::Tuple(schema) => Value::Tuple(
                schema
                    .attributes()
                    .iter()
                    .map(|a| a.ty.default_value())
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(element) => write!(f, "list<{element}>"),
            Self::Tuple(schema) => write!(f, "tuple<{schema}>"),
            other => f.write_str(other.name()),
        }
    }
}

/// A named, typed attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub ty: SourceType,
}

/// Ordered sequence of attributes describing a record shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceSchema {
    attributes: Vec<Attribute>,
}

impl SourceSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attribute, builder style.
    pub fn with(mut self, name: impl Into<String>, ty: SourceType) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Position and definition of the attribute called `name`.
    pub fn find(&self, name: &str) -> Option<(usize, &Attribute)> {
        self.attributes
            .iter()
            .enumerate()
            .find(|(_, a)| a.name == name)
    }
}

impl fmt::Display for SourceSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attr) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", attr.ty, attr.name)?;
        }
        Ok(())
    }
}

/// One runtime value. `Null` stands for an absent value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(i64),
    List(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Float32(_) => "float32",
            Self::Float64(_) => "float64",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Timestamp(_) => "timestamp",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A record whose values are positional with respect to its `SourceSchema`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl FromIterator<Value> for Record {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Builds a `Record` from a list of values convertible into `Value`.
///
/// ```rust
/// use avrostream::{record, Value};
/// let r = record![true, 7i32, "seven"];
/// assert_eq!(r.get(2), Some(&Value::Text("seven".into())));
/// ```
#[macro_export]
macro_rules! record {
    ($($value:expr),* $(,)?) => {
        $crate::Record::new(vec![$($crate::Value::from($value)),*])
    };
}
