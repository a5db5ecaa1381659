#![allow(dead_code)]

use apache_avro::types::Value as Avro;
use avrostream::{
    AvroCodec, BlockEncoder, EncoderBuilder, EncoderConfig, ManualClock, Output, Record,
    SourceSchema, SourceType, TargetSchema, Value,
};

pub const ORDER_SCHEMA: &str = r#"{
    "type": "record",
    "name": "Order",
    "namespace": "shop",
    "fields": [
        {"name": "id", "type": "long"},
        {"name": "customer", "type": "string"},
        {"name": "express", "type": "boolean"},
        {"name": "total", "type": "double"},
        {"name": "discount", "type": "float"},
        {"name": "note", "type": ["null", "string"], "default": null},
        {"name": "lines", "type": {"type": "array", "items": {
            "type": "record", "name": "Line", "fields": [
                {"name": "sku", "type": "string"},
                {"name": "qty", "type": "int"},
                {"name": "tags", "type": {"type": "array", "items": "string"}}
            ]}}},
        {"name": "ship_to", "type": {"type": "record", "name": "Address", "fields": [
            {"name": "city", "type": "string"},
            {"name": "zip", "type": "string"}
        ]}},
        {"name": "channel", "type": "string", "default": "web"}
    ]
}"#;

pub const OUTPUT_INDEX: usize = 2;

pub fn line_shape() -> SourceType {
    SourceType::Tuple(
        SourceSchema::new()
            .with("sku", SourceType::Text)
            .with("qty", SourceType::Int32)
            .with("tags", SourceType::list(SourceType::Text)),
    )
}

pub fn order_source() -> SourceSchema {
    SourceSchema::new()
        .with("received_at", SourceType::Timestamp)
        .with("id", SourceType::Int64)
        .with("customer", SourceType::Text)
        .with("express", SourceType::Boolean)
        .with("total", SourceType::Float64)
        .with("discount", SourceType::Float32)
        .with("note", SourceType::Text)
        .with("lines", SourceType::list(line_shape()))
        .with(
            "ship_to",
            SourceType::Tuple(
                SourceSchema::new()
                    .with("city", SourceType::Text)
                    .with("zip", SourceType::Text),
            ),
        )
}

pub fn order_output() -> SourceSchema {
    SourceSchema::new()
        .with("id", SourceType::Int64)
        .with("received_at", SourceType::Timestamp)
        .with("avroMessage", SourceType::Blob)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub sku: String,
    pub qty: i32,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub customer: String,
    pub express: bool,
    pub total: f64,
    pub discount: f32,
    pub note: Option<String>,
    pub lines: Vec<Line>,
    pub city: String,
    pub zip: String,
}

impl Order {
    pub fn sample(id: i64) -> Self {
        Self {
            id,
            customer: format!("customer-{id}"),
            express: id % 2 == 0,
            total: id as f64 * 1.25,
            discount: 0.5,
            note: (id % 3 == 0).then(|| "leave at door".to_string()),
            lines: vec![Line {
                sku: "SKU-1".into(),
                qty: 2,
                tags: vec!["fragile".into()],
            }],
            city: "Lisbon".into(),
            zip: "1100".into(),
        }
    }

    pub fn to_record(&self) -> Record {
        let lines = self
            .lines
            .iter()
            .map(|l| {
                Value::Tuple(vec![
                    Value::from(l.sku.as_str()),
                    Value::Int32(l.qty),
                    Value::List(l.tags.iter().map(|t| Value::from(t.as_str())).collect()),
                ])
            })
            .collect();
        Record::new(vec![
            Value::Timestamp(self.id.wrapping_add(1_700_000_000_000_000)),
            Value::Int64(self.id),
            Value::from(self.customer.as_str()),
            Value::Boolean(self.express),
            Value::Float64(self.total),
            Value::Float32(self.discount),
            Value::from(self.note.clone()),
            Value::List(lines),
            Value::Tuple(vec![
                Value::from(self.city.as_str()),
                Value::from(self.zip.as_str()),
            ]),
        ])
    }

    /// The value an independent Avro reader should decode.
    pub fn to_avro(&self) -> Avro {
        let note = match &self.note {
            Some(text) => Avro::Union(1, Box::new(Avro::String(text.clone()))),
            None => Avro::Union(0, Box::new(Avro::Null)),
        };
        let lines = self
            .lines
            .iter()
            .map(|l| {
                Avro::Record(vec![
                    ("sku".into(), Avro::String(l.sku.clone())),
                    ("qty".into(), Avro::Int(l.qty)),
                    (
                        "tags".into(),
                        Avro::Array(l.tags.iter().cloned().map(Avro::String).collect()),
                    ),
                ])
            })
            .collect();
        Avro::Record(vec![
            ("id".into(), Avro::Long(self.id)),
            ("customer".into(), Avro::String(self.customer.clone())),
            ("express".into(), Avro::Boolean(self.express)),
            ("total".into(), Avro::Double(self.total)),
            ("discount".into(), Avro::Float(self.discount)),
            ("note".into(), note),
            ("lines".into(), Avro::Array(lines)),
            (
                "ship_to".into(),
                Avro::Record(vec![
                    ("city".into(), Avro::String(self.city.clone())),
                    ("zip".into(), Avro::String(self.zip.clone())),
                ]),
            ),
            ("channel".into(), Avro::String("web".into())),
        ])
    }
}

pub fn order_encoder(config: EncoderConfig) -> BlockEncoder<Vec<Output>, AvroCodec, ManualClock> {
    order_encoder_with_clock(config, ManualClock::new())
}

pub fn order_encoder_with_clock(
    config: EncoderConfig,
    clock: ManualClock,
) -> BlockEncoder<Vec<Output>, AvroCodec, ManualClock> {
    EncoderBuilder::new(config, order_source(), order_output())
        .target_schema(TargetSchema::parse_str(ORDER_SCHEMA).unwrap())
        .clock(clock)
        .build(Vec::new())
        .unwrap()
}

/// Encoded payloads of every emitted record, in order.
pub fn payloads(outputs: &[Output]) -> Vec<Vec<u8>> {
    outputs
        .iter()
        .filter_map(Output::as_record)
        .map(|r| match r.get(OUTPUT_INDEX) {
            Some(Value::Blob(bytes)) => bytes.clone(),
            other => panic!("expected blob payload, found {other:?}"),
        })
        .collect()
}

pub fn decode_container(bytes: &[u8]) -> Vec<Avro> {
    apache_avro::Reader::new(bytes)
        .expect("valid container header")
        .map(|value| value.expect("valid datum"))
        .collect()
}

pub fn decode_bare(bytes: &[u8]) -> Avro {
    let schema = apache_avro::Schema::parse_str(ORDER_SCHEMA).unwrap();
    let mut reader = bytes;
    let value = apache_avro::from_avro_datum(&schema, &mut reader, None).unwrap();
    assert!(reader.is_empty(), "trailing bytes after datum");
    value
}
