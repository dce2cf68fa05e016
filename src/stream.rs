//! Read → transform → write pipeline over a list-mode record stream.
//!
//! The pipeline is a small state machine driven one transition at a time by
//! [`StreamTransformer::step`]. The row callback decides, for every record,
//! whether it is kept (possibly modified), omitted, or whether the whole
//! stream stops. Stopping is checked between records only; records already
//! written stay in the sink.

use std::io::Write;

use indicatif::ProgressBar;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::parsing::CdfFile;
use crate::record::Record;
use crate::writer::CdfWriter;

/// Outcome of the row callback for one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RowAction {
    /// Write this record to the output.
    Keep(Record),
    /// Drop this record and continue with the next one.
    Omit,
    /// Drop this record and every record after it.
    Stop,
}

impl From<Record> for RowAction {
    fn from(record: Record) -> Self {
        RowAction::Keep(record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamState {
    Reading,
    Transforming,
    Writing,
    /// The callback asked to stop.
    Stopped,
    /// Every record of the source was consumed.
    Draining,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(self, StreamState::Stopped | StreamState::Draining)
    }
}

/// Random-access provider of decoded records.
pub trait RecordSource {
    fn record_count(&self) -> u64;

    fn read_record(&self, index: u64) -> Result<Record>;
}

/// Ordered consumer of records.
pub trait RecordSink {
    fn write_record(&mut self, record: &Record) -> Result<()>;
}

impl RecordSource for CdfFile {
    fn record_count(&self) -> u64 {
        CdfFile::record_count(self)
    }

    fn read_record(&self, index: u64) -> Result<Record> {
        self.record(index)
    }
}

impl RecordSource for [Record] {
    fn record_count(&self) -> u64 {
        self.len() as u64
    }

    fn read_record(&self, index: u64) -> Result<Record> {
        Ok(self[index as usize])
    }
}

impl RecordSource for Vec<Record> {
    fn record_count(&self) -> u64 {
        self.as_slice().record_count()
    }

    fn read_record(&self, index: u64) -> Result<Record> {
        self.as_slice().read_record(index)
    }
}

impl<W: Write> RecordSink for CdfWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        CdfWriter::write_record(self, record)
    }
}

impl RecordSink for Vec<Record> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        self.push(*record);
        Ok(())
    }
}

/// Counters collected over one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    pub records_total: u64,
    pub records_read: u64,
    pub records_written: u64,
    pub records_omitted: u64,
    pub final_state: StreamState,
}

pub struct StreamTransformer<'a, S: ?Sized, K: ?Sized, F> {
    source: &'a S,
    sink: &'a mut K,
    row_transform: F,
    progress: ProgressBar,
    state: StreamState,
    index: u64,
    total: u64,
    pending: Option<Record>,
    records_read: u64,
    records_written: u64,
    records_omitted: u64,
}

impl<'a, S, K, F> StreamTransformer<'a, S, K, F>
where
    S: RecordSource + ?Sized,
    K: RecordSink + ?Sized,
    F: FnMut(Record) -> RowAction,
{
    /// Prepare a pass over every record of `source`, writing into `sink`.
    ///
    /// The progress bar length is set to the source's record count.
    pub fn new(source: &'a S, sink: &'a mut K, progress: ProgressBar, row_transform: F) -> Self {
        let total = source.record_count();
        progress.set_length(total);
        StreamTransformer {
            source,
            sink,
            row_transform,
            progress,
            state: StreamState::Reading,
            index: 0,
            total,
            pending: None,
            records_read: 0,
            records_written: 0,
            records_omitted: 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Index of the record being processed.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Perform a single state transition and return the new state.
    ///
    /// Terminal states are sticky.
    pub fn step(&mut self) -> Result<StreamState> {
        self.state = match self.state {
            StreamState::Reading if self.index >= self.total => StreamState::Draining,
            StreamState::Reading => {
                self.pending = Some(self.source.read_record(self.index)?);
                self.records_read += 1;
                self.progress.inc(1);
                StreamState::Transforming
            }
            StreamState::Transforming => match self.pending.take() {
                Some(record) => match (self.row_transform)(record) {
                    RowAction::Keep(record) => {
                        self.pending = Some(record);
                        StreamState::Writing
                    }
                    RowAction::Omit => {
                        self.records_omitted += 1;
                        self.index += 1;
                        StreamState::Reading
                    }
                    RowAction::Stop => StreamState::Stopped,
                },
                None => StreamState::Reading,
            },
            StreamState::Writing => {
                if let Some(record) = self.pending.take() {
                    self.sink.write_record(&record)?;
                    self.records_written += 1;
                }
                self.index += 1;
                StreamState::Reading
            }
            terminal => terminal,
        };
        Ok(self.state)
    }

    /// Drive the pipeline until the stream is exhausted or stopped.
    pub fn run(mut self) -> Result<StreamSummary> {
        while !self.state.is_terminal() {
            self.step()?;
        }
        self.progress.finish();
        let summary = self.summary();
        debug!(?summary, "record stream finished");
        Ok(summary)
    }

    pub fn summary(&self) -> StreamSummary {
        StreamSummary {
            records_total: self.total,
            records_read: self.records_read,
            records_written: self.records_written,
            records_omitted: self.records_omitted,
            final_state: self.state,
        }
    }
}

/// Run `row_transform` over every record of `source`, writing kept records to
/// `sink` in source order.
pub fn transform_stream<S, K, F>(
    source: &S,
    sink: &mut K,
    progress: ProgressBar,
    row_transform: F,
) -> Result<StreamSummary>
where
    S: RecordSource + ?Sized,
    K: RecordSink + ?Sized,
    F: FnMut(Record) -> RowAction,
{
    StreamTransformer::new(source, sink, progress, row_transform).run()
}
