//! Shape of the records handed downstream.

use crate::error::{Error, Result};
use crate::value::{Record, SourceSchema, SourceType, Value};

/// Output field name used when none is configured and the output schema
/// has more than one attribute.
pub const DEFAULT_OUTPUT_FIELD: &str = "avroMessage";

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Payload,
    Copy(usize),
    Default(Value),
}

/// How each output attribute is filled: the encoded bytes, a copy of the
/// same-named input attribute, or the attribute type's default value.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    output_field: String,
    output_index: usize,
    slots: Vec<Slot>,
}

impl OutputLayout {
    pub fn resolve(
        input: &SourceSchema,
        output: &SourceSchema,
        output_field: Option<&str>,
    ) -> Result<Self> {
        let name = match output_field {
            Some(name) => name.to_string(),
            None if output.len() == 1 => output.attributes()[0].name.clone(),
            None => DEFAULT_OUTPUT_FIELD.to_string(),
        };
        let (output_index, attr) = output
            .find(&name)
            .ok_or_else(|| Error::output_field(&name, "not found in the output schema"))?;
        if attr.ty != SourceType::Blob {
            return Err(Error::output_field(
                &name,
                format!("must be of type blob, found {}", attr.ty),
            ));
        }

        let slots = output
            .attributes()
            .iter()
            .enumerate()
            .map(|(i, attr)| {
                if i == output_index {
                    return Slot::Payload;
                }
                match input.find(&attr.name) {
                    Some((src, input_attr)) if input_attr.ty == attr.ty => Slot::Copy(src),
                    _ => Slot::Default(attr.ty.default_value()),
                }
            })
            .collect();

        Ok(Self {
            output_field: name,
            output_index,
            slots,
        })
    }

    pub fn output_field(&self) -> &str {
        &self.output_field
    }

    pub fn output_index(&self) -> usize {
        self.output_index
    }

    /// Builds the output record carrying `payload`, copying pass-through
    /// attributes from `input` when there is one.
    pub fn project(&self, input: Option<&Record>, payload: Vec<u8>) -> Record {
        let mut payload = Some(payload);
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Payload => Value::Blob(payload.take().unwrap_or_default()),
                Slot::Copy(src) => input
                    .and_then(|r| r.get(*src))
                    .cloned()
                    .unwrap_or(Value::Null),
                Slot::Default(value) => value.clone(),
            })
            .collect()
    }
}
