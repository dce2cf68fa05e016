//! CASToR binary data file writer.
//!
//! Records are encoded little-endian following a [`RecordSchema`](crate::schema::RecordSchema).

pub mod cdf_writer;
pub use cdf_writer::{CdfWriter, encode_record, encode_record_into};
