pub mod error;
pub mod header;
pub mod schema;
pub mod record;
pub mod writer;
pub mod stream;
pub mod update;
pub mod info;
pub mod logging;

pub mod parsing {
    pub mod decoder;
    pub mod cdf_file;

    pub use cdf_file::CdfFile;
    pub use decoder::decode_record;
}

pub mod tools {
    pub mod truncate;
    pub mod normalization;
    pub mod random;
    pub mod replicate;
}

pub use error::{CastorError, Result};
pub use record::Record;
pub use schema::{CorrectionFlag, CorrectionFlags, RecordSchema};
pub use stream::RowAction;
pub use update::{update_castor_datafile, update_castor_datafile_with};
