//! Add random-correction factors to a datafile.
//!
//! Factors are looked up in a random-correction probability matrix whose
//! rows and columns index detector sections. A crystal's section comes from
//! its position in a geometry look-up table: the angular module it sits in,
//! then its axial slice. The mapping assumes module IDs increase
//! counter-clockwise, starting with module 0 just above the x-axis.

use std::fs;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use tracing::{info, warn};

use crate::error::{CastorError, Result};
use crate::header::codec::append_field;
use crate::header::keys::CdhKey;
use crate::record::Record;
use crate::schema::CorrectionFlag;
use crate::stream::{RowAction, StreamSummary};
use crate::update::{UpdateOptions, update_castor_datafile_with};

/// Factor used when a crystal pair falls outside the LUT or the matrix.
pub const DEFAULT_RANDOM_FACTOR: f32 = 0.0;

/// Values stored per crystal in the geometry LUT: x, y, z, then three
/// orientation components this module ignores.
const LUT_ENTRY_LEN: usize = 6;

/// Scanner geometry used to map crystals onto matrix sections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModularGeometry {
    /// Modules around the ring.
    pub modules: u32,
    /// Axial field of view, same unit as the LUT z coordinate.
    pub axial_fov: f64,
    /// Axial slices per module.
    pub axial_sections: u32,
    /// Crystals described by the LUT.
    pub crystals: usize,
    /// Side of the square probability matrix.
    pub matrix_size: usize,
}

impl Default for ModularGeometry {
    /// 24-module, 50-slice modular J-PET layout.
    fn default() -> Self {
        ModularGeometry {
            modules: 24,
            axial_fov: 500.0,
            axial_sections: 50,
            crystals: 62_400,
            matrix_size: 1_200,
        }
    }
}

impl ModularGeometry {
    /// Module hit at transaxial position `(x, y)`.
    pub fn module_of(&self, x: f64, y: f64) -> u32 {
        let angle = y.atan2(x).to_degrees().rem_euclid(360.0);
        let step = 360.0 / f64::from(self.modules);
        (angle / step).floor() as u32
    }

    /// Matrix row/column of a hit, `None` outside the axial field of view.
    pub fn section_of(&self, x: f64, y: f64, z: f64) -> Option<usize> {
        let slice_len = self.axial_fov / f64::from(self.axial_sections);
        let slice = ((z + self.axial_fov / 2.0) / slice_len).floor();
        if !(0.0..f64::from(self.axial_sections)).contains(&slice) {
            return None;
        }
        let module = self.module_of(x, y) as usize;
        (self.axial_sections as usize)
            .checked_mul(module)?
            .checked_add(slice as usize)
    }
}

/// Lookup model for random-correction factors.
#[derive(Debug, Clone)]
pub struct RandomFactorModel {
    geometry: ModularGeometry,
    lut: Vec<[f32; LUT_ENTRY_LEN]>,
    matrix: Vec<f32>,
}

impl RandomFactorModel {
    /// Load the geometry LUT (raw little-endian `f32`) and the probability
    /// matrix (whitespace-separated text).
    pub fn load(
        lut_path: impl AsRef<Path>,
        map_path: impl AsRef<Path>,
        geometry: ModularGeometry,
    ) -> Result<Self> {
        let (lut_path, map_path) = (lut_path.as_ref(), map_path.as_ref());
        let lut_bytes = fs::read(lut_path).map_err(|e| CastorError::from_io(e, lut_path))?;
        info!("Successfully read {}.", lut_path.display());
        let map_text =
            fs::read_to_string(map_path).map_err(|e| CastorError::from_io(e, map_path))?;
        info!("Successfully read {}.", map_path.display());
        Self::from_parts(&lut_bytes, &map_text, geometry)
    }

    pub fn from_parts(lut_bytes: &[u8], map_text: &str, geometry: ModularGeometry) -> Result<Self> {
        let entry_bytes = LUT_ENTRY_LEN * 4;
        let expected = geometry.crystals * entry_bytes;
        if lut_bytes.len() != expected {
            return Err(CastorError::LookupTable(format!(
                "geometry LUT holds {} bytes, expected {} ({} crystals)",
                lut_bytes.len(),
                expected,
                geometry.crystals
            )));
        }
        let lut = lut_bytes
            .chunks_exact(entry_bytes)
            .map(|chunk| {
                let mut entry = [0f32; LUT_ENTRY_LEN];
                LittleEndian::read_f32_into(chunk, &mut entry);
                entry
            })
            .collect();

        let matrix = map_text
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f32>()
                    .map_err(|_| {
                        CastorError::LookupTable(format!("invalid matrix value {token:?}"))
                    })
            })
            .collect::<Result<Vec<f32>>>()?;
        let cells = geometry.matrix_size * geometry.matrix_size;
        if matrix.len() != cells {
            return Err(CastorError::LookupTable(format!(
                "random matrix holds {} values, expected {}x{}",
                matrix.len(),
                geometry.matrix_size,
                geometry.matrix_size
            )));
        }

        Ok(RandomFactorModel { geometry, lut, matrix })
    }

    pub fn geometry(&self) -> &ModularGeometry {
        &self.geometry
    }

    fn section_of_crystal(&self, crystal: u32) -> Option<usize> {
        let entry = self.lut.get(crystal as usize)?;
        let section = self.geometry.section_of(
            f64::from(entry[0]),
            f64::from(entry[1]),
            f64::from(entry[2]),
        )?;
        (section < self.geometry.matrix_size).then_some(section)
    }

    /// Factor for the LOR of `record`, whichever crystal comes first.
    pub fn factor_for(&self, record: &Record) -> Option<f32> {
        let (low, high) = record.ordered_crystals();
        let row = self.section_of_crystal(low)?;
        let column = self.section_of_crystal(high)?;
        self.matrix.get(row * self.geometry.matrix_size + column).copied()
    }
}

/// Add random-correction factors to a pair of CASToR header/data files.
///
/// Fails with [`CastorError::AlreadyCorrected`] if the input already
/// carries random-correction data.
pub fn add_random_factors(
    cdh_path: impl AsRef<Path>,
    model: &RandomFactorModel,
    output_cdh: impl AsRef<Path>,
    output_cdf: impl AsRef<Path>,
    options: &UpdateOptions,
) -> Result<StreamSummary> {
    let mut missing = 0u64;
    let summary = update_castor_datafile_with(
        cdh_path,
        output_cdh,
        output_cdf,
        options,
        |header| append_field(header, CdhKey::RANDOM_CORRECTION_FLAG, "1"),
        |mut record| {
            let factor = model.factor_for(&record).unwrap_or_else(|| {
                missing += 1;
                DEFAULT_RANDOM_FACTOR
            });
            record.set_correction(CorrectionFlag::Random, factor);
            RowAction::Keep(record)
        },
    )?;
    if missing > 0 {
        warn!(
            missing,
            "crystal pairs outside the geometry LUT or random matrix received factor {}",
            DEFAULT_RANDOM_FACTOR
        );
    }
    Ok(summary)
}
