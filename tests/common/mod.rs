#![allow(dead_code)]

use std::path::{Path, PathBuf};

use castor_rs::error::CastorError;
use castor_rs::record::Record;
use castor_rs::schema::RecordSchema;
use castor_rs::writer::CdfWriter;

pub const BASE_HEADER: &str = "Number of events: {events}
Data mode: list-mode
Data type: PET
Start time (s): 0
Duration (s): 100000
Scanner name: Modular
Calibration factor: 1
Isotope: unknown";

/// Header text pointing at `cdf_name`, followed by `extra` lines.
pub fn header(cdf_name: &str, events: usize, extra: &str) -> String {
    let mut text = format!(
        "Data filename: {cdf_name}\n{}",
        BASE_HEADER.replace("{events}", &events.to_string())
    );
    if !extra.is_empty() {
        text.push('\n');
        text.push_str(extra);
    }
    text
}

pub fn sequential_records(count: u32) -> Vec<Record> {
    (1..=count).map(|i| Record::new(i, i, i)).collect()
}

/// Write a header/data pair named `test.Cdh`/`test.Cdf` into `dir`.
pub fn write_pair(
    dir: &Path,
    extra_header: &str,
    records: &[Record],
) -> Result<PathBuf, CastorError> {
    let cdh = dir.join("test.Cdh");
    let cdf = dir.join("test.Cdf");
    let text = header("test.Cdf", records.len(), extra_header);
    std::fs::write(&cdh, &text)?;

    let schema = RecordSchema::from_header(&text)?;
    let mut writer = CdfWriter::create(&cdf, schema)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.finalize()?;
    Ok(cdh)
}
