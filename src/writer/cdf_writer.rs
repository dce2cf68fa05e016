use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use tracing::info;

use crate::error::{CastorError, Result};
use crate::record::{FieldValue, Record};
use crate::schema::RecordSchema;

/// Serialize `record` into `buf`, which must be exactly one record long.
///
/// Fields are written strictly in schema order. Corrections defined by the
/// record but absent from the schema are not written.
pub fn encode_record_into(record: &Record, schema: &RecordSchema, buf: &mut [u8]) -> Result<()> {
    for layout in schema.fields() {
        let slice = &mut buf[layout.offset..layout.offset + layout.scalar.byte_width()];
        match record.get(layout.field) {
            Some(FieldValue::UnsignedInteger(v)) => LittleEndian::write_u32(slice, v),
            Some(FieldValue::Float(v)) => LittleEndian::write_f32(slice, v),
            None => {
                return Err(CastorError::SchemaMismatch {
                    field: layout.field.name(),
                });
            }
        }
    }
    Ok(())
}

/// Serialize `record` into a freshly allocated buffer of
/// `schema.record_size()` bytes.
pub fn encode_record(record: &Record, schema: &RecordSchema) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; schema.record_size()];
    encode_record_into(record, schema, &mut buf)?;
    Ok(buf)
}

/// Buffered writer for CASToR binary data files.
///
/// Records are appended back to back, without padding or separators.
pub struct CdfWriter<W: Write = BufWriter<File>> {
    out: W,
    path: Option<PathBuf>,
    schema: RecordSchema,
    scratch: Vec<u8>,
    records_written: u64,
}

impl CdfWriter {
    /// Creates a new CdfWriter for the given file path (overwrites existing).
    pub fn create(path: impl AsRef<Path>, schema: RecordSchema) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| CastorError::from_io(e, path))?;
        let mut writer = CdfWriter::new(BufWriter::new(file), schema);
        writer.path = Some(path.to_path_buf());
        Ok(writer)
    }
}

impl<W: Write> CdfWriter<W> {
    /// Wraps any byte sink.
    pub fn new(out: W, schema: RecordSchema) -> Self {
        let scratch = vec![0u8; schema.record_size()];
        CdfWriter {
            out,
            path: None,
            schema,
            scratch,
            records_written: 0,
        }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Append one record to the stream.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        encode_record_into(record, &self.schema, &mut self.scratch)?;
        self.out.write_all(&self.scratch)?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flushes all records and hands back the underlying sink.
    pub fn finalize(mut self) -> Result<W> {
        self.out.flush()?;
        if let Some(path) = &self.path {
            info!("Successfully wrote {}.", path.display());
        }
        Ok(self.out)
    }
}
