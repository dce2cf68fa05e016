use castor_rs::error::CastorError;
use castor_rs::parsing::{CdfFile, decode_record};
use castor_rs::record::{FieldValue, Record};
use castor_rs::schema::{CdfField, CorrectionFlag, CorrectionFlags, RecordSchema};
use castor_rs::writer::{CdfWriter, encode_record};
use proptest::prelude::*;

#[test]
fn encode_mandatory_fields() -> Result<(), CastorError> {
    let schema = RecordSchema::resolve(&CorrectionFlags::none());
    let bytes = encode_record(&Record::new(1, 1, 2), &schema)?;
    assert_eq!(bytes, [1, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0]);
    assert_eq!(decode_record(&bytes, &schema, 0)?, Record::new(1, 1, 2));
    Ok(())
}

#[test]
fn decode_at_offset() -> Result<(), CastorError> {
    let schema = RecordSchema::resolve(&CorrectionFlags::none());
    let mut bytes = encode_record(&Record::new(1, 1, 2), &schema)?;
    bytes.extend(encode_record(&Record::new(2, 2, 1), &schema)?);
    assert_eq!(decode_record(&bytes, &schema, 12)?, Record::new(2, 2, 1));
    Ok(())
}

#[test]
fn decode_past_end_is_truncated() {
    let schema = RecordSchema::resolve(&CorrectionFlags::none());
    let bytes = [0u8; 20];
    match decode_record(&bytes, &schema, 12) {
        Err(CastorError::TruncatedRecord { offset, expected, actual }) => {
            assert_eq!(offset, 12);
            assert_eq!(expected, 12);
            assert_eq!(actual, 8);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(decode_record(&bytes, &schema, 100).is_err());
}

#[test]
fn encode_missing_correction_is_mismatch() {
    let flags = CorrectionFlags::none().with(CorrectionFlag::Normalization);
    let schema = RecordSchema::resolve(&flags);
    match encode_record(&Record::new(1, 1, 2), &schema) {
        Err(CastorError::SchemaMismatch { field }) => assert_eq!(field, "n"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn encode_ignores_corrections_outside_schema() -> Result<(), CastorError> {
    let schema = RecordSchema::resolve(&CorrectionFlags::none());
    let mut record = Record::new(3, 4, 5);
    record.set_correction(CorrectionFlag::Scatter, 0.25);
    assert_eq!(encode_record(&record, &schema)?.len(), 12);
    Ok(())
}

#[test]
fn normalization_shifts_following_fields() -> Result<(), CastorError> {
    let base = CorrectionFlags::none()
        .with(CorrectionFlag::Attenuation)
        .with(CorrectionFlag::Tof);
    let without = RecordSchema::resolve(&base);
    let with = RecordSchema::resolve(&base.with(CorrectionFlag::Normalization));
    assert_eq!(with.record_size(), without.record_size() + 4);

    let n_offset = with.layout_of(CdfField::Normalization).map(|l| l.offset).unwrap();
    for layout in without.fields() {
        let shifted = with.layout_of(layout.field).map(|l| l.offset).unwrap();
        if layout.offset >= n_offset {
            assert_eq!(shifted, layout.offset + 4, "{:?}", layout.field);
        } else {
            assert_eq!(shifted, layout.offset, "{:?}", layout.field);
        }
    }

    let mut record = Record::new(7, 8, 9);
    record.set_correction(CorrectionFlag::Attenuation, 0.5);
    record.set_correction(CorrectionFlag::Tof, -12.5);
    record.set_correction(CorrectionFlag::Normalization, 2.0);
    let bytes = encode_record(&record, &with)?;
    assert_eq!(&bytes[n_offset..n_offset + 4], &2.0f32.to_le_bytes());
    assert_eq!(
        decode_record(&bytes, &with, 0)?.get(CdfField::Normalization),
        Some(FieldValue::Float(2.0))
    );
    Ok(())
}

#[test]
fn cdf_file_rejects_partial_record() -> Result<(), CastorError> {
    let schema = RecordSchema::resolve(&CorrectionFlags::none());
    match CdfFile::from_bytes(vec![0u8; 13], schema) {
        Err(CastorError::RecordWidthMismatch { len, record_size }) => {
            assert_eq!(len, 13);
            assert_eq!(record_size, 12);
        }
        other => panic!("unexpected {:?}", other),
    }
    Ok(())
}

#[test]
fn writer_and_file_roundtrip() -> Result<(), CastorError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("roundtrip.Cdf");
    let schema = RecordSchema::resolve(&CorrectionFlags::none().with(CorrectionFlag::Random));

    let records: Vec<Record> = (0..5u32)
        .map(|i| {
            let mut r = Record::new(i * 10, i, i + 100);
            r.set_correction(CorrectionFlag::Random, i as f32 / 4.0);
            r
        })
        .collect();
    let mut writer = CdfWriter::create(&path, schema.clone())?;
    for r in &records {
        writer.write_record(r)?;
    }
    assert_eq!(writer.records_written(), 5);
    writer.finalize()?;

    let cdf = CdfFile::open(&path, schema)?;
    assert_eq!(cdf.record_count(), 5);
    let decoded = cdf.records().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(decoded, records);
    Ok(())
}

#[test]
fn empty_file_has_no_records() -> Result<(), CastorError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("empty.Cdf");
    std::fs::write(&path, [])?;
    let cdf = CdfFile::open(&path, RecordSchema::resolve(&CorrectionFlags::none()))?;
    assert_eq!(cdf.record_count(), 0);
    assert_eq!(cdf.records().count(), 0);
    Ok(())
}

fn arb_flags() -> impl Strategy<Value = CorrectionFlags> {
    prop::array::uniform5(any::<bool>()).prop_map(|bits| {
        let mut flags = CorrectionFlags::none();
        for (flag, on) in CorrectionFlag::ALL.into_iter().zip(bits) {
            flags.set(flag, on);
        }
        flags
    })
}

proptest! {
    #[test]
    fn schema_follows_declaration_order(flags in arb_flags()) {
        let schema = RecordSchema::resolve(&flags);
        let fields: Vec<CdfField> = schema.fields().iter().map(|l| l.field).collect();
        let mut expected = vec![CdfField::Timestamp];
        expected.extend(flags.enabled().map(|f| f.field()));
        expected.extend([CdfField::CrystalId1, CdfField::CrystalId2]);
        prop_assert_eq!(fields, expected);
        prop_assert_eq!(schema.record_size(), 12 + 4 * flags.enabled().count());
    }

    #[test]
    fn encode_then_decode_is_identity(
        flags in arb_flags(),
        timestamp in any::<u32>(),
        c1 in any::<u32>(),
        c2 in any::<u32>(),
        values in prop::array::uniform5(-1.0e6f32..1.0e6f32),
    ) {
        let schema = RecordSchema::resolve(&flags);
        let mut record = Record::new(timestamp, c1, c2);
        for (flag, value) in CorrectionFlag::ALL.into_iter().zip(values) {
            if flags.is_enabled(flag) {
                record.set_correction(flag, value);
            }
        }
        let bytes = encode_record(&record, &schema).unwrap();
        prop_assert_eq!(bytes.len(), schema.record_size());
        prop_assert_eq!(decode_record(&bytes, &schema, 0).unwrap(), record);
    }
}
