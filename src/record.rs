use serde::Serialize;

use crate::schema::{CdfField, CorrectionFlag};

/// A scalar read from or written to a record field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    UnsignedInteger(u32),
    Float(f32),
}

/// One list-mode event: a coincidence between two crystals.
///
/// Correction factors are `None` when the record was decoded under a layout
/// without them. A transform that enables a correction in the header must
/// fill the matching value for every record it keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Record {
    pub timestamp: u32,
    pub attenuation: Option<f32>,
    pub scatter: Option<f32>,
    pub random: Option<f32>,
    pub normalization: Option<f32>,
    pub tof: Option<f32>,
    pub crystal_id_1: u32,
    pub crystal_id_2: u32,
}

impl Record {
    /// A record carrying only the mandatory fields.
    pub fn new(timestamp: u32, crystal_id_1: u32, crystal_id_2: u32) -> Self {
        Record {
            timestamp,
            crystal_id_1,
            crystal_id_2,
            ..Default::default()
        }
    }

    pub fn correction(&self, flag: CorrectionFlag) -> Option<f32> {
        match flag {
            CorrectionFlag::Attenuation => self.attenuation,
            CorrectionFlag::Scatter => self.scatter,
            CorrectionFlag::Random => self.random,
            CorrectionFlag::Normalization => self.normalization,
            CorrectionFlag::Tof => self.tof,
        }
    }

    fn correction_slot(&mut self, flag: CorrectionFlag) -> &mut Option<f32> {
        match flag {
            CorrectionFlag::Attenuation => &mut self.attenuation,
            CorrectionFlag::Scatter => &mut self.scatter,
            CorrectionFlag::Random => &mut self.random,
            CorrectionFlag::Normalization => &mut self.normalization,
            CorrectionFlag::Tof => &mut self.tof,
        }
    }

    pub fn set_correction(&mut self, flag: CorrectionFlag, value: f32) {
        *self.correction_slot(flag) = Some(value);
    }

    /// Value stored for `field`, `None` if the record does not define it.
    pub fn get(&self, field: CdfField) -> Option<FieldValue> {
        match field {
            CdfField::Timestamp => Some(FieldValue::UnsignedInteger(self.timestamp)),
            CdfField::CrystalId1 => Some(FieldValue::UnsignedInteger(self.crystal_id_1)),
            CdfField::CrystalId2 => Some(FieldValue::UnsignedInteger(self.crystal_id_2)),
            other => other
                .correction()
                .and_then(|flag| self.correction(flag))
                .map(FieldValue::Float),
        }
    }

    /// Crystal IDs ordered as `(min, max)`.
    pub fn ordered_crystals(&self) -> (u32, u32) {
        if self.crystal_id_1 <= self.crystal_id_2 {
            (self.crystal_id_1, self.crystal_id_2)
        } else {
            (self.crystal_id_2, self.crystal_id_1)
        }
    }
}
