use castor_rs::error::CastorError;
use castor_rs::record::Record;
use castor_rs::stream::{RowAction, StreamState, StreamTransformer, transform_stream};
use indicatif::ProgressBar;
use proptest::prelude::*;

fn records(count: u32) -> Vec<Record> {
    (0..count).map(|i| Record::new(i, i, i + 1)).collect()
}

#[test]
fn omit_skips_and_continues() -> Result<(), CastorError> {
    let source = records(6);
    let mut sink = Vec::new();
    let summary = transform_stream(&source, &mut sink, ProgressBar::hidden(), |record| {
        if record.timestamp % 2 == 0 {
            RowAction::Omit
        } else {
            RowAction::Keep(record)
        }
    })?;
    assert_eq!(sink.iter().map(|r| r.timestamp).collect::<Vec<_>>(), [1, 3, 5]);
    assert_eq!(summary.records_read, 6);
    assert_eq!(summary.records_omitted, 3);
    assert_eq!(summary.records_written, 3);
    assert_eq!(summary.final_state, StreamState::Draining);
    Ok(())
}

#[test]
fn stop_discards_the_remaining_records() -> Result<(), CastorError> {
    let source = records(10);
    let mut sink = Vec::new();
    let summary = transform_stream(&source, &mut sink, ProgressBar::hidden(), |record| {
        if record.timestamp == 4 {
            RowAction::Stop
        } else {
            record.into()
        }
    })?;
    assert_eq!(sink, records(4));
    assert_eq!(summary.records_read, 5);
    assert_eq!(summary.final_state, StreamState::Stopped);
    Ok(())
}

#[test]
fn empty_source_drains_immediately() -> Result<(), CastorError> {
    let source: Vec<Record> = Vec::new();
    let mut sink = Vec::new();
    let mut calls = 0;
    let summary = transform_stream(&source, &mut sink, ProgressBar::hidden(), |record| {
        calls += 1;
        RowAction::Keep(record)
    })?;
    assert_eq!(calls, 0);
    assert!(sink.is_empty());
    assert_eq!(summary.final_state, StreamState::Draining);
    Ok(())
}

#[test]
fn step_walks_through_states() -> Result<(), CastorError> {
    let source = records(1);
    let mut sink = Vec::new();
    let progress = ProgressBar::hidden();
    let mut transformer =
        StreamTransformer::new(&source, &mut sink, progress.clone(), RowAction::Keep);

    assert_eq!(progress.length(), Some(1));
    assert_eq!(transformer.state(), StreamState::Reading);
    assert_eq!(transformer.step()?, StreamState::Transforming);
    assert_eq!(progress.position(), 1);
    assert_eq!(transformer.step()?, StreamState::Writing);
    assert_eq!(transformer.step()?, StreamState::Reading);
    assert_eq!(transformer.index(), 1);
    assert_eq!(transformer.step()?, StreamState::Draining);
    assert_eq!(transformer.step()?, StreamState::Draining);

    let summary = transformer.summary();
    assert_eq!(summary.records_written, 1);
    drop(transformer);
    assert_eq!(sink, records(1));
    Ok(())
}

proptest! {
    #[test]
    fn stop_after_n_keeps_exactly_n(total in 0u32..200, n in 0u32..250) {
        let source = records(total);
        let mut sink = Vec::new();
        let mut seen = 0u32;
        let summary = transform_stream(&source, &mut sink, ProgressBar::hidden(), |record| {
            seen += 1;
            if seen > n { RowAction::Stop } else { RowAction::Keep(record) }
        }).unwrap();
        let expected = total.min(n);
        prop_assert_eq!(sink.len() as u32, expected);
        prop_assert_eq!(&sink[..], &source[..expected as usize]);
        prop_assert_eq!(summary.records_written, u64::from(expected));
    }
}
