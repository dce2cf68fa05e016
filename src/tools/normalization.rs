//! Add pre-computed normalization factors to a datafile.
//!
//! Factors come from a CSV file with header `c1,c2,n`: the LOR between
//! crystals `c1` and `c2` receives factor `n`. LORs absent from the file
//! receive [`DEFAULT_NORMALIZATION_FACTOR`].

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{CastorError, Result};
use crate::header::codec::append_field;
use crate::header::keys::CdhKey;
use crate::schema::CorrectionFlag;
use crate::stream::{RowAction, StreamSummary};
use crate::update::{UpdateOptions, update_castor_datafile_with};

pub const DEFAULT_NORMALIZATION_FACTOR: f32 = 1.0;

#[derive(Debug, Deserialize)]
struct NormalizationRow {
    c1: u32,
    c2: u32,
    n: f32,
}

/// Normalization factor per ordered crystal pair.
#[derive(Debug, Clone, Default)]
pub struct NormalizationTable {
    factors: HashMap<(u32, u32), f32>,
}

impl NormalizationTable {
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CastorError::from_io(e, path))?;
        let table = Self::from_reader(file)?;
        info!("Successfully read {}.", path.display());
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut factors = HashMap::new();
        for row in reader.deserialize() {
            let row: NormalizationRow = row?;
            factors.insert((row.c1, row.c2), row.n);
        }
        Ok(NormalizationTable { factors })
    }

    pub fn insert(&mut self, c1: u32, c2: u32, factor: f32) {
        self.factors.insert((c1, c2), factor);
    }

    /// Factor for the LOR `(c1, c2)`, in that order.
    pub fn factor(&self, c1: u32, c2: u32) -> f32 {
        self.factors
            .get(&(c1, c2))
            .copied()
            .unwrap_or(DEFAULT_NORMALIZATION_FACTOR)
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// Add normalization factors to a pair of CASToR header/data files.
///
/// Fails with [`CastorError::AlreadyCorrected`] if the input already
/// carries normalization data; nothing is written in that case.
pub fn add_normalization_factors(
    cdh_path: impl AsRef<Path>,
    table: &NormalizationTable,
    output_cdh: impl AsRef<Path>,
    output_cdf: impl AsRef<Path>,
    options: &UpdateOptions,
) -> Result<StreamSummary> {
    update_castor_datafile_with(
        cdh_path,
        output_cdh,
        output_cdf,
        options,
        |header| append_field(header, CdhKey::NORMALIZATION_CORRECTION_FLAG, "1"),
        |mut record| {
            let factor = table.factor(record.crystal_id_1, record.crystal_id_2);
            record.set_correction(CorrectionFlag::Normalization, factor);
            RowAction::Keep(record)
        },
    )
}
