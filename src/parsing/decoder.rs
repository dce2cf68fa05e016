use byteorder::{ByteOrder, LittleEndian};

use crate::error::{CastorError, Result};
use crate::record::Record;
use crate::schema::{CdfField, RecordSchema, ScalarType};

/// Decodes the record starting at `offset` in `bytes`.
///
/// Reads exactly `schema.record_size()` bytes and interprets each field with
/// its declared scalar type, little-endian.
///
/// # Returns
/// The decoded [`Record`], or [`CastorError::TruncatedRecord`] if fewer than
/// `schema.record_size()` bytes remain after `offset`.
pub fn decode_record(bytes: &[u8], schema: &RecordSchema, offset: usize) -> Result<Record> {
    let record_size = schema.record_size();
    let end = offset
        .checked_add(record_size)
        .filter(|end| *end <= bytes.len())
        .ok_or(CastorError::TruncatedRecord {
            offset,
            expected: record_size,
            actual: bytes.len().saturating_sub(offset),
        })?;
    let raw = &bytes[offset..end];

    let mut record = Record::default();
    for layout in schema.fields() {
        let slice = &raw[layout.offset..layout.offset + layout.scalar.byte_width()];
        match (layout.field, layout.scalar) {
            (CdfField::Timestamp, _) => record.timestamp = LittleEndian::read_u32(slice),
            (CdfField::CrystalId1, _) => record.crystal_id_1 = LittleEndian::read_u32(slice),
            (CdfField::CrystalId2, _) => record.crystal_id_2 = LittleEndian::read_u32(slice),
            (field, ScalarType::F32) => {
                if let Some(flag) = field.correction() {
                    record.set_correction(flag, LittleEndian::read_f32(slice));
                }
            }
            (_, ScalarType::U32) => {}
        }
    }
    Ok(record)
}
