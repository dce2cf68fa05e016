//! Keep only the first events of a datafile.
//!
//! Useful to check that a long operation terminates correctly on a small
//! sample before running it on the full acquisition.

use std::path::Path;

use crate::error::Result;
use crate::header::codec::replace_field;
use crate::header::keys::CdhKey;
use crate::stream::{RowAction, StreamSummary};
use crate::update::{UpdateOptions, update_castor_datafile_with};

/// Truncate a CASToR datafile, keeping the first `number_of_events` records.
///
/// `Number of events` is rewritten in the new header when present.
pub fn truncate(
    cdh_path: impl AsRef<Path>,
    number_of_events: u64,
    output_cdh: impl AsRef<Path>,
    output_cdf: impl AsRef<Path>,
    options: &UpdateOptions,
) -> Result<StreamSummary> {
    let mut seen = 0u64;
    update_castor_datafile_with(
        cdh_path,
        output_cdh,
        output_cdf,
        options,
        |header| {
            Ok(replace_field(
                header,
                CdhKey::NUMBER_OF_EVENTS,
                &number_of_events.to_string(),
            ))
        },
        |record| {
            seen += 1;
            if seen > number_of_events {
                RowAction::Stop
            } else {
                RowAction::Keep(record)
            }
        },
    )
}
