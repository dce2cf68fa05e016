//! Replicate a datafile by sampling its records with repetition
//! (bootstrap resampling).

use std::path::Path;

use rand::distributions::{Distribution, Uniform};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::record::Record;
use crate::stream::{RecordSource, StreamSummary};
use crate::update::{
    DatafilePair, UpdateOptions, identity_header, identity_row, output_filename, rewrite_header,
    write_new_datafile, write_new_header,
};

/// A view of another source through a list of drawn indices.
pub struct Resampled<'a, S: ?Sized> {
    source: &'a S,
    indices: Vec<u64>,
}

impl<'a, S: RecordSource + ?Sized> Resampled<'a, S> {
    /// Draw as many records as `source` holds, uniformly with replacement.
    pub fn bootstrap<R: Rng + ?Sized>(source: &'a S, rng: &mut R) -> Self {
        let count = source.record_count();
        let indices = if count == 0 {
            Vec::new()
        } else {
            let between = Uniform::new(0, count);
            (0..count).map(|_| between.sample(rng)).collect()
        };
        Resampled { source, indices }
    }

    pub fn indices(&self) -> &[u64] {
        &self.indices
    }
}

impl<S: RecordSource + ?Sized> RecordSource for Resampled<'_, S> {
    fn record_count(&self) -> u64 {
        self.indices.len() as u64
    }

    fn read_record(&self, index: u64) -> Result<Record> {
        self.source.read_record(self.indices[index as usize])
    }
}

/// Replicate a pair of CASToR header/data files.
///
/// The new data file holds as many records as the input, each drawn
/// uniformly with replacement. Passing a `seed` makes the draw reproducible.
pub fn replicate(
    cdh_path: impl AsRef<Path>,
    output_cdh: impl AsRef<Path>,
    output_cdf: impl AsRef<Path>,
    seed: Option<u64>,
    options: &UpdateOptions,
) -> Result<StreamSummary> {
    let (output_cdh, output_cdf) = (output_cdh.as_ref(), output_cdf.as_ref());
    let pair = DatafilePair::open(cdh_path)?.release_for_output(output_cdf)?;

    let mut rng = match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    let resampled = Resampled::bootstrap(&pair.cdf, &mut rng);

    let new_header = rewrite_header(&pair.header, &output_filename(output_cdf)?, identity_header)?;
    write_new_header(output_cdh, &new_header)?;
    write_new_datafile(
        output_cdf,
        &resampled,
        pair.schema().clone(),
        options.progress.clone(),
        identity_row,
    )
}
