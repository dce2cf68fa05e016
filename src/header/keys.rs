//! Keys of the CASToR data header (`.Cdh`) consumed or written by this crate.

/// Header keys are plain string constants, matched literally and
/// case-sensitively against each header line.
pub struct CdhKey;

impl CdhKey {
    pub const DATA_FILENAME: &'static str = "Data filename";
    pub const NUMBER_OF_EVENTS: &'static str = "Number of events";
    pub const DATA_MODE: &'static str = "Data mode";
    pub const MAX_LINES_PER_EVENT: &'static str = "Maximum number of lines per event";
    pub const ATTENUATION_CORRECTION_FLAG: &'static str = "Attenuation correction flag";
    pub const SCATTER_CORRECTION_FLAG: &'static str = "Scatter correction flag";
    pub const RANDOM_CORRECTION_FLAG: &'static str = "Random correction flag";
    pub const NORMALIZATION_CORRECTION_FLAG: &'static str = "Normalization correction flag";
    pub const TOF_INFORMATION_FLAG: &'static str = "TOF information flag";
}

/// Value of `Data mode` for list-mode acquisitions.
pub const LIST_MODE: &str = "list-mode";
