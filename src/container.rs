//! Object container framing through `apache_avro::Writer`: a header that
//! embeds the schema, then one data block ending with the sync marker.
//!
//! `[magic "Obj\x01" | metadata map | 16-byte sync]` then
//! `[long count | long byte length | datums | 16-byte sync]`.

use crate::datum::Datum;
use crate::error::Result;
use apache_avro::types::Value as AvroValue;
use apache_avro::{Schema, Writer};
use std::collections::HashMap;

pub const MAGIC: [u8; 4] = *b"Obj\x01";
pub const SYNC_LEN: usize = 16;

pub type SyncMarker = [u8; SYNC_LEN];

/// A fresh random sync marker.
pub fn random_sync_marker() -> SyncMarker {
    rand::random()
}

/// Writes standalone single-block containers for one schema.
#[derive(Debug, Clone)]
pub struct ContainerFormat {
    schema: Schema,
    sync: SyncMarker,
    header_len: usize,
}

impl ContainerFormat {
    pub fn new(schema: &Schema, sync: SyncMarker) -> Result<Self> {
        let metadata = HashMap::from([
            (
                "avro.schema".to_string(),
                AvroValue::Bytes(serde_json::to_string(schema)?.into_bytes()),
            ),
            ("avro.codec".to_string(), AvroValue::Bytes(b"null".to_vec())),
        ]);
        let map_schema = Schema::Map(Box::new(Schema::Bytes));
        let metadata_len = apache_avro::to_avro_datum(&map_schema, AvroValue::Map(metadata))?.len();
        Ok(Self {
            schema: schema.clone(),
            sync,
            header_len: MAGIC.len() + metadata_len + SYNC_LEN,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn sync(&self) -> &SyncMarker {
        &self.sync
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Size of a unit holding `count` datums totalling `data_len` bytes.
    pub fn unit_len(&self, count: u64, data_len: usize) -> usize {
        self.header_len + long_len(count as i64) + long_len(data_len as i64) + data_len + SYNC_LEN
    }

    /// Writes `datums` as one container with a single block. `data_len` is
    /// their total encoded size and sizes the writer's block so nothing is
    /// cut early.
    pub fn write_unit(&self, datums: &[Datum], data_len: usize) -> Result<Vec<u8>> {
        let mut writer = Writer::builder()
            .schema(&self.schema)
            .writer(Vec::with_capacity(self.unit_len(datums.len() as u64, data_len)))
            .block_size(data_len + 1)
            .marker(self.sync)
            .build();
        writer.extend_from_slice(datums)?;
        Ok(writer.into_inner()?)
    }
}

fn long_len(value: i64) -> usize {
    apache_avro::to_avro_datum(&Schema::Long, value).map_or(0, |bytes| bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use apache_avro::Reader;

    fn format(sync: SyncMarker) -> ContainerFormat {
        ContainerFormat::new(&Schema::Int, sync).unwrap()
    }

    #[test]
    fn unit_layout() {
        let sync = [7u8; SYNC_LEN];
        let format = format(sync);
        let bytes = format.write_unit(&[Datum::Int(1), Datum::Int(-2)], 2).unwrap();
        assert_eq!(&bytes[..4], &MAGIC);
        assert_eq!(&bytes[format.header_len() - SYNC_LEN..format.header_len()], &sync);
        assert_eq!(&bytes[bytes.len() - SYNC_LEN..], &sync);
        // count 2, length 2, then the two zig-zag ints
        assert_eq!(&bytes[format.header_len()..bytes.len() - SYNC_LEN], [0x04, 0x04, 0x02, 0x03]);
    }

    #[test]
    fn unit_len_is_exact() {
        let format = format([1u8; SYNC_LEN]);
        for count in [1usize, 200, 5_000] {
            let datums: Vec<_> = (0..count).map(|i| Datum::Int(i as i32 * 1_000)).collect();
            let data_len: usize = datums
                .iter()
                .map(|d| apache_avro::to_avro_datum(&Schema::Int, d.clone()).unwrap().len())
                .sum();
            let bytes = format.write_unit(&datums, data_len).unwrap();
            assert_eq!(bytes.len(), format.unit_len(count as u64, data_len));
        }
    }

    #[test]
    fn unit_decodes_with_the_embedded_schema() {
        let bytes = format(random_sync_marker())
            .write_unit(&[Datum::Int(5)], 1)
            .unwrap();
        let values: Vec<_> = Reader::new(&bytes[..])
            .unwrap()
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(values, [Datum::Int(5)]);
    }

    #[test]
    fn random_markers_differ() {
        assert_ne!(random_sync_marker(), random_sync_marker());
    }
}
