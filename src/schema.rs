//! Record layout of CASToR list-mode data files.
//!
//! (Simplified) PET list-mode record, in file order:
//!
//! | Symbol | Description                         | Type  | Mandatory |
//! |--------|-------------------------------------|-------|-----------|
//! | t      | Time in ms                          | u32   | yes       |
//! | a      | Attenuation correction factor       | f32   | no        |
//! | s      | Un-normalized scatter intensity     | f32   | no        |
//! | r      | Un-normalized random intensity      | f32   | no        |
//! | n      | Normalization factor                | f32   | no        |
//! | TOF    | Difference in arrival time c1 / c2  | f32   | no        |
//! | c1     | Crystal ID 1                        | u32   | yes       |
//! | c2     | Crystal ID 2                        | u32   | yes       |
//!
//! Optional fields are present iff the matching header flag is enabled.

use serde::Serialize;

use crate::error::Result;
use crate::header::codec::correction_flag;
use crate::header::keys::CdhKey;

/// Optional per-record corrections, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CorrectionFlag {
    Attenuation,
    Scatter,
    Random,
    Normalization,
    Tof,
}

impl CorrectionFlag {
    /// Every flag, in the order their fields appear in a record.
    pub const ALL: [CorrectionFlag; 5] = [
        CorrectionFlag::Attenuation,
        CorrectionFlag::Scatter,
        CorrectionFlag::Random,
        CorrectionFlag::Normalization,
        CorrectionFlag::Tof,
    ];

    pub fn header_key(self) -> &'static str {
        match self {
            CorrectionFlag::Attenuation => CdhKey::ATTENUATION_CORRECTION_FLAG,
            CorrectionFlag::Scatter => CdhKey::SCATTER_CORRECTION_FLAG,
            CorrectionFlag::Random => CdhKey::RANDOM_CORRECTION_FLAG,
            CorrectionFlag::Normalization => CdhKey::NORMALIZATION_CORRECTION_FLAG,
            CorrectionFlag::Tof => CdhKey::TOF_INFORMATION_FLAG,
        }
    }

    pub fn field(self) -> CdfField {
        match self {
            CorrectionFlag::Attenuation => CdfField::Attenuation,
            CorrectionFlag::Scatter => CdfField::Scatter,
            CorrectionFlag::Random => CdfField::Random,
            CorrectionFlag::Normalization => CdfField::Normalization,
            CorrectionFlag::Tof => CdfField::Tof,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Enabled/disabled state of every [`CorrectionFlag`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectionFlags {
    enabled: [bool; 5],
}

impl CorrectionFlags {
    /// All corrections disabled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Read every flag from the content of a CASToR data header.
    pub fn from_header(header: &str) -> Result<Self> {
        let mut flags = Self::none();
        for flag in CorrectionFlag::ALL {
            flags.set(flag, correction_flag(header, flag.header_key())?);
        }
        Ok(flags)
    }

    pub fn with(mut self, flag: CorrectionFlag) -> Self {
        self.set(flag, true);
        self
    }

    pub fn set(&mut self, flag: CorrectionFlag, enabled: bool) {
        self.enabled[flag.index()] = enabled;
    }

    pub fn is_enabled(&self, flag: CorrectionFlag) -> bool {
        self.enabled[flag.index()]
    }

    /// Enabled flags, in declaration order.
    pub fn enabled(&self) -> impl Iterator<Item = CorrectionFlag> + '_ {
        CorrectionFlag::ALL.into_iter().filter(|flag| self.is_enabled(*flag))
    }
}

/// Scalar encodings used in list-mode records. All are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScalarType {
    /// `uint32_t`
    U32,
    /// `FLTNBDATA`, single precision
    F32,
}

impl ScalarType {
    pub fn byte_width(self) -> usize {
        match self {
            ScalarType::U32 | ScalarType::F32 => 4,
        }
    }
}

/// A field of a list-mode record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CdfField {
    Timestamp,
    Attenuation,
    Scatter,
    Random,
    Normalization,
    Tof,
    CrystalId1,
    CrystalId2,
}

impl CdfField {
    /// Short column name as used in the CASToR documentation.
    pub fn name(self) -> &'static str {
        match self {
            CdfField::Timestamp => "t",
            CdfField::Attenuation => "a",
            CdfField::Scatter => "s",
            CdfField::Random => "r",
            CdfField::Normalization => "n",
            CdfField::Tof => "TOF",
            CdfField::CrystalId1 => "c1",
            CdfField::CrystalId2 => "c2",
        }
    }

    pub fn scalar_type(self) -> ScalarType {
        match self {
            CdfField::Timestamp | CdfField::CrystalId1 | CdfField::CrystalId2 => ScalarType::U32,
            _ => ScalarType::F32,
        }
    }

    /// The correction flag this field depends on, `None` for mandatory fields.
    pub fn correction(self) -> Option<CorrectionFlag> {
        match self {
            CdfField::Attenuation => Some(CorrectionFlag::Attenuation),
            CdfField::Scatter => Some(CorrectionFlag::Scatter),
            CdfField::Random => Some(CorrectionFlag::Random),
            CdfField::Normalization => Some(CorrectionFlag::Normalization),
            CdfField::Tof => Some(CorrectionFlag::Tof),
            CdfField::Timestamp | CdfField::CrystalId1 | CdfField::CrystalId2 => None,
        }
    }
}

/// Position of one field inside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldLayout {
    pub field: CdfField,
    pub scalar: ScalarType,
    /// Byte offset from the start of the record
    pub offset: usize,
}

/// Ordered, fixed-width layout of a list-mode record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSchema {
    flags: [bool; 5],
    fields: Vec<FieldLayout>,
    record_size: usize,
}

impl RecordSchema {
    /// Build the record layout for a set of correction flags.
    ///
    /// The timestamp comes first, then one `f32` per enabled correction in
    /// declaration order, then both crystal IDs.
    pub fn resolve(flags: &CorrectionFlags) -> Self {
        let order = std::iter::once(CdfField::Timestamp)
            .chain(flags.enabled().map(CorrectionFlag::field))
            .chain([CdfField::CrystalId1, CdfField::CrystalId2]);

        let mut fields = Vec::with_capacity(8);
        let mut offset = 0;
        for field in order {
            let scalar = field.scalar_type();
            fields.push(FieldLayout { field, scalar, offset });
            offset += scalar.byte_width();
        }

        Self {
            flags: flags.enabled,
            fields,
            record_size: offset,
        }
    }

    /// Resolve the layout declared by a CASToR data header.
    pub fn from_header(header: &str) -> Result<Self> {
        Ok(Self::resolve(&CorrectionFlags::from_header(header)?))
    }

    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    pub fn flags(&self) -> CorrectionFlags {
        CorrectionFlags { enabled: self.flags }
    }

    /// Size of one record in bytes.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn layout_of(&self, field: CdfField) -> Option<&FieldLayout> {
        self.fields.iter().find(|layout| layout.field == field)
    }

    pub fn contains(&self, field: CdfField) -> bool {
        self.layout_of(field).is_some()
    }
}
