//! Update a CASToR header/data file pair.
//!
//! [`update_castor_datafile`] is the single entry point the tools in
//! [`crate::tools`] build on. It works through two callbacks: one rewriting
//! the header text, and one deciding what happens to each record. The input
//! pair is never modified; a new header and a new data file are written.

use std::fs;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::error::{CastorError, Result};
use crate::header::codec::{
    acquisition_mode_is_list_mode, data_filename, max_lines_per_event, read_field, replace_field,
};
use crate::header::keys::CdhKey;
use crate::parsing::CdfFile;
use crate::record::Record;
use crate::schema::RecordSchema;
use crate::stream::{RecordSource, RowAction, StreamSummary, transform_stream};
use crate::writer::CdfWriter;

/// Header callback leaving the text untouched.
pub fn identity_header(header: &str) -> Result<String> {
    Ok(header.to_string())
}

/// Row callback keeping every record as is.
pub fn identity_row(record: Record) -> RowAction {
    RowAction::Keep(record)
}

/// Knobs shared by every update.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Advanced by one for every record read. Hidden by default.
    pub progress: ProgressBar,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        UpdateOptions {
            progress: ProgressBar::hidden(),
        }
    }
}

/// Reject headers this crate cannot process.
///
/// Only list-mode data with at most one line per event is supported.
pub fn validate_header(header: &str) -> Result<()> {
    if !acquisition_mode_is_list_mode(header)? {
        let mode = read_field(header, CdhKey::DATA_MODE)?.unwrap_or_default();
        return Err(CastorError::UnsupportedDataMode(mode.to_string()));
    }
    let lines = max_lines_per_event(header)?;
    if lines > 1 {
        return Err(CastorError::UnsupportedLinesPerEvent(lines));
    }
    Ok(())
}

/// Path of the data file referenced by a header.
///
/// `Data filename` is taken relative to the directory holding the header;
/// absolute paths are used as is.
pub fn resolve_data_path(header: &str, cdh_path: &Path) -> Result<PathBuf> {
    let filename = data_filename(header)?;
    let dir = cdh_path.parent().unwrap_or_else(|| Path::new(""));
    Ok(dir.join(filename))
}

/// Base name written into the new header's `Data filename`.
pub fn output_filename(output_cdf: &Path) -> Result<String> {
    output_cdf
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CastorError::IOError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} has no file name", output_cdf.display()),
            ))
        })
}

/// A validated header together with its memory-mapped data file.
#[derive(Debug)]
pub struct DatafilePair {
    pub cdh_path: PathBuf,
    pub header: String,
    pub cdf_path: PathBuf,
    pub cdf: CdfFile,
}

impl DatafilePair {
    /// Read and validate a header, then open the data file it points to.
    ///
    /// Every check runs before anything is written anywhere.
    pub fn open(cdh_path: impl AsRef<Path>) -> Result<Self> {
        let cdh_path = cdh_path.as_ref();
        let header = fs::read_to_string(cdh_path).map_err(|e| CastorError::from_io(e, cdh_path))?;

        validate_header(&header)?;
        let schema = RecordSchema::from_header(&header)?;
        debug!(
            fields = ?schema.fields(),
            record_size = schema.record_size(),
            "resolved record layout"
        );
        let cdf_path = resolve_data_path(&header, cdh_path)?;

        info!("Successfully read {}.", cdh_path.display());

        let cdf = CdfFile::open(&cdf_path, schema)?;
        Ok(DatafilePair {
            cdh_path: cdh_path.to_path_buf(),
            header,
            cdf_path,
            cdf,
        })
    }

    pub fn schema(&self) -> &RecordSchema {
        self.cdf.schema()
    }

    /// Prepare the pair for writing to `output_cdf`.
    ///
    /// When `output_cdf` is the input data file itself, its records are read
    /// into memory first: creating the output truncates the file under the
    /// mapping.
    pub fn release_for_output(mut self, output_cdf: &Path) -> Result<Self> {
        if is_same_file(&self.cdf_path, output_cdf)? && self.cdf.is_mapped() {
            debug!("{} is overwritten in place, reading it into memory", self.cdf_path.display());
            self.cdf = self.cdf.into_owned()?;
        }
        Ok(self)
    }
}

/// Whether `output` names the existing file `input`. An output that does
/// not exist yet never does.
pub fn is_same_file(input: &Path, output: &Path) -> Result<bool> {
    if !output.exists() {
        return Ok(false);
    }
    let input = fs::canonicalize(input).map_err(|e| CastorError::from_io(e, input))?;
    let output = fs::canonicalize(output).map_err(|e| CastorError::from_io(e, output))?;
    Ok(input == output)
}

/// Point `header` at `cdf_filename`, then apply the caller's header callback.
pub fn rewrite_header<H>(header: &str, cdf_filename: &str, header_transform: H) -> Result<String>
where
    H: FnOnce(&str) -> Result<String>,
{
    let with_cdf = replace_field(header, CdhKey::DATA_FILENAME, cdf_filename);
    header_transform(&with_cdf)
}

pub fn write_new_header(output_cdh: &Path, content: &str) -> Result<()> {
    fs::write(output_cdh, content).map_err(|e| CastorError::from_io(e, output_cdh))?;
    info!("Successfully wrote {}.", output_cdh.display());
    Ok(())
}

/// Stream `source` through `row_transform` into a new data file laid out
/// according to `schema`.
pub fn write_new_datafile<S, F>(
    output_cdf: &Path,
    source: &S,
    schema: RecordSchema,
    progress: ProgressBar,
    row_transform: F,
) -> Result<StreamSummary>
where
    S: RecordSource + ?Sized,
    F: FnMut(Record) -> RowAction,
{
    let mut writer = CdfWriter::create(output_cdf, schema)?;
    let summary = transform_stream(source, &mut writer, progress, row_transform)?;
    writer.finalize()?;
    Ok(summary)
}

/// Update a pair of CASToR header/data files, hiding progress.
///
/// See [`update_castor_datafile_with`].
pub fn update_castor_datafile<H, F>(
    cdh_path: impl AsRef<Path>,
    output_cdh: impl AsRef<Path>,
    output_cdf: impl AsRef<Path>,
    header_transform: H,
    row_transform: F,
) -> Result<StreamSummary>
where
    H: FnOnce(&str) -> Result<String>,
    F: FnMut(Record) -> RowAction,
{
    update_castor_datafile_with(
        cdh_path,
        output_cdh,
        output_cdf,
        &UpdateOptions::default(),
        header_transform,
        row_transform,
    )
}

/// Update a pair of CASToR header/data files.
///
/// # Arguments
/// * `cdh_path` - The input CASToR header.
/// * `output_cdh` - Header to write. Its `Data filename` becomes the base
///   name of `output_cdf`, then `header_transform` is applied.
/// * `output_cdf` - Data file to write. Its record layout follows the flags
///   of the rewritten header.
/// * `row_transform` - Decides for each input record, in order, whether it
///   is written, omitted, or whether writing stops.
///
/// # Returns
/// The counters of the record pass. Validation failures and callback errors
/// are reported before any output file is created. No cleanup is performed
/// if writing fails midway.
pub fn update_castor_datafile_with<H, F>(
    cdh_path: impl AsRef<Path>,
    output_cdh: impl AsRef<Path>,
    output_cdf: impl AsRef<Path>,
    options: &UpdateOptions,
    header_transform: H,
    row_transform: F,
) -> Result<StreamSummary>
where
    H: FnOnce(&str) -> Result<String>,
    F: FnMut(Record) -> RowAction,
{
    let (output_cdh, output_cdf) = (output_cdh.as_ref(), output_cdf.as_ref());
    let pair = DatafilePair::open(cdh_path)?;

    let new_header = rewrite_header(&pair.header, &output_filename(output_cdf)?, header_transform)?;
    let pair = pair.release_for_output(output_cdf)?;
    let output_schema = RecordSchema::from_header(&new_header)?;

    write_new_header(output_cdh, &new_header)?;
    let summary = write_new_datafile(
        output_cdf,
        &pair.cdf,
        output_schema,
        options.progress.clone(),
        row_transform,
    )?;
    info!(
        read = summary.records_read,
        written = summary.records_written,
        "Updated {}.",
        pair.cdh_path.display()
    );
    Ok(summary)
}
