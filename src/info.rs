use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::header::codec::{data_filename, max_lines_per_event, number_of_events, read_field};
use crate::header::keys::CdhKey;
use crate::schema::{CorrectionFlag, FieldLayout};
use crate::update::DatafilePair;

/// Summary of a list-mode datafile pair, serializable to JSON.
#[derive(Debug, Clone, Serialize)]
pub struct DatafileInfo {
    pub header_path: PathBuf,
    pub data_filename: String,
    pub data_path: PathBuf,
    pub data_mode: String,
    pub max_lines_per_event: i64,
    pub corrections: Vec<CorrectionFlag>,
    pub fields: Vec<FieldLayout>,
    pub record_size: usize,
    pub record_count: u64,
    /// `Number of events` as declared by the header
    pub declared_events: Option<u64>,
}

impl DatafileInfo {
    pub fn from_header(cdh_path: impl AsRef<Path>) -> Result<Self> {
        let pair = DatafilePair::open(cdh_path)?;
        let header = pair.header.as_str();
        let schema = pair.schema();
        Ok(DatafileInfo {
            header_path: pair.cdh_path.clone(),
            data_filename: data_filename(header)?.to_string(),
            data_path: pair.cdf_path.clone(),
            data_mode: read_field(header, CdhKey::DATA_MODE)?.unwrap_or_default().to_string(),
            max_lines_per_event: max_lines_per_event(header)?,
            corrections: schema.flags().enabled().collect(),
            fields: schema.fields().to_vec(),
            record_size: schema.record_size(),
            record_count: pair.cdf.record_count(),
            declared_events: number_of_events(header)?,
        })
    }

    /// Whether the declared event count, if any, matches the data file.
    pub fn is_consistent(&self) -> bool {
        self.declared_events.is_none_or(|declared| declared == self.record_count)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
