use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, info};

use crate::error::{CastorError, Result};
use crate::parsing::decoder::decode_record;
use crate::record::Record;
use crate::schema::RecordSchema;

#[derive(Debug)]
enum Storage {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

/// A CASToR binary data file (`.Cdf`) paired with the layout of its records.
#[derive(Debug)]
pub struct CdfFile {
    storage: Storage,
    schema: RecordSchema,
}

impl CdfFile {
    /// Memory-map a data file from disk.
    ///
    /// # Arguments
    /// * `path` - Path to the `.Cdf` file.
    /// * `schema` - Record layout declared by the paired header.
    ///
    /// # Returns
    /// A [`CdfFile`] whose length is a whole number of records, or a
    /// [`CastorError`] if the file is missing or its length does not match
    /// the record size.
    pub fn open(path: impl AsRef<Path>, schema: RecordSchema) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CastorError::from_io(e, path))?;
        let len = file.metadata().map_err(|e| CastorError::from_io(e, path))?.len();

        // Zero-length maps are rejected by some platforms.
        let storage = if len == 0 {
            Storage::Owned(Vec::new())
        } else {
            Storage::Mapped(unsafe { Mmap::map(&file)? })
        };

        let cdf = Self::with_storage(storage, schema)?;
        info!("Successfully read {}.", path.display());
        Ok(cdf)
    }

    /// Wrap an in-memory record stream.
    pub fn from_bytes(bytes: Vec<u8>, schema: RecordSchema) -> Result<Self> {
        Self::with_storage(Storage::Owned(bytes), schema)
    }

    /// Copy a mapped stream into memory and release the mapping, so that the
    /// file on disk can be truncated or rewritten.
    pub fn into_owned(self) -> Result<Self> {
        let CdfFile { storage, schema } = self;
        match storage {
            Storage::Mapped(mmap) => Self::from_bytes(mmap[..].to_vec(), schema),
            owned @ Storage::Owned(_) => Ok(CdfFile { storage: owned, schema }),
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.storage, Storage::Mapped(_))
    }

    fn with_storage(storage: Storage, schema: RecordSchema) -> Result<Self> {
        let cdf = CdfFile { storage, schema };
        let len = cdf.bytes().len();
        if len % cdf.schema.record_size() != 0 {
            return Err(CastorError::RecordWidthMismatch {
                len: len as u64,
                record_size: cdf.schema.record_size(),
            });
        }
        debug!(
            bytes = len,
            record_size = cdf.schema.record_size(),
            records = cdf.record_count(),
            "record stream validated"
        );
        Ok(cdf)
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Mapped(mmap) => &mmap[..],
            Storage::Owned(bytes) => bytes.as_slice(),
        }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Number of records in the stream.
    pub fn record_count(&self) -> u64 {
        (self.bytes().len() / self.schema.record_size()) as u64
    }

    /// Decode the record at `index`, located at byte `index * record_size`.
    pub fn record(&self, index: u64) -> Result<Record> {
        let offset = index as usize * self.schema.record_size();
        decode_record(self.bytes(), &self.schema, offset)
    }

    /// Iterate over all records in stream order.
    pub fn records(&self) -> impl Iterator<Item = Result<Record>> + '_ {
        (0..self.record_count()).map(move |index| self.record(index))
    }
}
