use nom::bytes::complete::{tag, take_till1};
use nom::character::complete::{char, space0};
use nom::combinator::eof;
use nom::{IResult, Parser};

use crate::error::{CastorError, Result};
use crate::header::keys::{CdhKey, LIST_MODE};

/// Matches a header line starting with `key`, tolerating leading blanks.
fn key_prefix<'a>(line: &'a str, key: &str) -> IResult<&'a str, ()> {
    (space0, tag(key)).map(|_| ()).parse(line)
}

/// Matches a complete `key: value` line whose value is a single token.
fn key_value<'a>(line: &'a str, key: &str) -> IResult<&'a str, &'a str> {
    (
        space0,
        tag(key),
        space0,
        char(':'),
        space0,
        take_till1(|c: char| c.is_whitespace()),
        space0,
        eof,
    )
        .map(|(_, _, _, _, _, value, _, _)| value)
        .parse(line)
}

/// Line terminator used by `header`, defaulting to `\n`.
fn line_ending(header: &str) -> &'static str {
    if header.contains("\r\n") { "\r\n" } else { "\n" }
}

fn parse_integer(key: &str, value: &str) -> Result<i64> {
    value.parse::<i64>().map_err(|_| CastorError::MalformedField {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Read a field from the content of a CASToR data header.
///
/// Returns `Ok(None)` when no line carries `key`, the value when exactly one
/// does, and [`CastorError::DuplicateField`] when the key is ambiguous.
pub fn read_field<'a>(header: &'a str, key: &str) -> Result<Option<&'a str>> {
    let matches: Vec<&'a str> = header
        .lines()
        .filter_map(|line| key_value(line, key).ok().map(|(_, value)| value))
        .collect();

    match matches.as_slice() {
        [] => Ok(None),
        [value] => Ok(Some(*value)),
        _ => Err(CastorError::DuplicateField {
            key: key.to_string(),
            count: matches.len(),
        }),
    }
}

/// Replace every line starting with `key` by `key: new_value`.
///
/// Line terminators are kept as they were. If no line holds `key` the header
/// is returned unchanged.
pub fn replace_field(header: &str, key: &str, new_value: &str) -> String {
    let mut out = String::with_capacity(header.len());
    for segment in header.split_inclusive('\n') {
        let body = segment.trim_end_matches(['\r', '\n']);
        if key_prefix(body, key).is_ok() {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(new_value);
            out.push_str(&segment[body.len()..]);
        } else {
            out.push_str(segment);
        }
    }
    out
}

/// Append `key: value` to the header, switching a correction flag on.
///
/// Fails with [`CastorError::AlreadyCorrected`] if the flag is already
/// enabled. A flag present but disabled is rewritten in place instead of
/// being duplicated.
pub fn append_field(header: &str, key: &str, value: &str) -> Result<String> {
    match read_field(header, key)? {
        Some(current) if parse_integer(key, current)? != 0 => {
            Err(CastorError::AlreadyCorrected(key.to_string()))
        }
        Some(_) => Ok(replace_field(header, key, value)),
        None => {
            let mut out = String::with_capacity(header.len() + key.len() + value.len() + 4);
            out.push_str(header);
            if !header.is_empty() && !header.ends_with('\n') {
                out.push_str(line_ending(header));
            }
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            Ok(out)
        }
    }
}

/// Check whether the header describes list-mode data.
///
/// `Data mode` is mandatory. Any value other than `list-mode` yields `false`.
pub fn acquisition_mode_is_list_mode(header: &str) -> Result<bool> {
    match read_field(header, CdhKey::DATA_MODE)? {
        Some(mode) => Ok(mode == LIST_MODE),
        None => Err(CastorError::MissingMandatoryField(CdhKey::DATA_MODE.to_string())),
    }
}

/// Maximum number of lines per event, `1` when absent.
pub fn max_lines_per_event(header: &str) -> Result<i64> {
    match read_field(header, CdhKey::MAX_LINES_PER_EVENT)? {
        Some(value) => parse_integer(CdhKey::MAX_LINES_PER_EVENT, value),
        None => Ok(1),
    }
}

/// Whether the correction flag stored under `key` is enabled.
///
/// Absent means disabled; any non-zero integer means enabled.
pub fn correction_flag(header: &str, key: &str) -> Result<bool> {
    match read_field(header, key)? {
        Some(value) => Ok(parse_integer(key, value)? != 0),
        None => Ok(false),
    }
}

/// The `Data filename` field, which every datafile pair must carry.
pub fn data_filename(header: &str) -> Result<&str> {
    read_field(header, CdhKey::DATA_FILENAME)?
        .ok_or_else(|| CastorError::MissingMandatoryField(CdhKey::DATA_FILENAME.to_string()))
}

/// The declared `Number of events`, if any.
pub fn number_of_events(header: &str) -> Result<Option<u64>> {
    match read_field(header, CdhKey::NUMBER_OF_EVENTS)? {
        Some(value) => value.parse::<u64>().map(Some).map_err(|_| CastorError::MalformedField {
            key: CdhKey::NUMBER_OF_EVENTS.to_string(),
            value: value.to_string(),
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_CDH: &str = "Data filename: sensitivity_lm_Modular_df.Cdf
Number of events: 3609862611
Data mode: list-mode
Data type: PET
Start time (s): 0
Duration (s): 100000
Scanner name: Modular
Calibration factor: 1
Isotope: unknown";

    #[test]
    fn read_existing_and_missing_fields() -> Result<()> {
        assert_eq!(read_field(DEFAULT_CDH, "Calibration factor")?, Some("1"));
        assert_eq!(read_field(DEFAULT_CDH, "Start time (s)")?, Some("0"));
        assert_eq!(read_field(DEFAULT_CDH, "Non-existing")?, None);
        assert_eq!(read_field("", "Non-existing")?, None);
        Ok(())
    }

    #[test]
    fn read_trims_surrounding_whitespace() -> Result<()> {
        let header = format!("{DEFAULT_CDH}\n    Test  :     abc     ");
        assert_eq!(read_field(&header, "Test")?, Some("abc"));
        Ok(())
    }

    #[test]
    fn read_ignores_multi_token_values() -> Result<()> {
        assert_eq!(read_field("Isotope: F 18", "Isotope")?, None);
        assert_eq!(read_field("Isotope:", "Isotope")?, None);
        Ok(())
    }

    #[test]
    fn read_duplicate_field_fails() {
        let header = format!("{DEFAULT_CDH}\nCalibration factor: 2");
        match read_field(&header, "Calibration factor") {
            Err(CastorError::DuplicateField { key, count }) => {
                assert_eq!(key, "Calibration factor");
                assert_eq!(count, 2);
            }
            other => panic!("unexpected {:?}", other),
        }

        let header = format!("{DEFAULT_CDH}\nCalibration factor: 1");
        assert!(matches!(
            read_field(&header, "Calibration factor"),
            Err(CastorError::DuplicateField { count: 2, .. })
        ));
    }

    #[test]
    fn replace_keeps_other_lines() {
        let replaced = replace_field(DEFAULT_CDH, CdhKey::DATA_FILENAME, "test.Cdf");
        assert_eq!(
            replaced,
            DEFAULT_CDH.replace("sensitivity_lm_Modular_df.Cdf", "test.Cdf")
        );
        assert_eq!(replace_field(DEFAULT_CDH, "Non-existent", "new value"), DEFAULT_CDH);
    }

    #[test]
    fn replace_preserves_crlf() {
        let header = "Data filename: a.Cdf\r\nData mode: list-mode\r\n";
        assert_eq!(
            replace_field(header, CdhKey::DATA_FILENAME, "b.Cdf"),
            "Data filename: b.Cdf\r\nData mode: list-mode\r\n"
        );
    }

    #[test]
    fn append_adds_missing_flag() -> Result<()> {
        let out = append_field(DEFAULT_CDH, CdhKey::NORMALIZATION_CORRECTION_FLAG, "1")?;
        assert_eq!(out, format!("{DEFAULT_CDH}\nNormalization correction flag: 1"));

        let with_newline = format!("{DEFAULT_CDH}\n");
        let out = append_field(&with_newline, CdhKey::NORMALIZATION_CORRECTION_FLAG, "1")?;
        assert_eq!(out, format!("{DEFAULT_CDH}\nNormalization correction flag: 1"));
        Ok(())
    }

    #[test]
    fn append_rejects_enabled_flag() {
        let header = format!("{DEFAULT_CDH}\nNormalization correction flag: 1");
        assert!(matches!(
            append_field(&header, CdhKey::NORMALIZATION_CORRECTION_FLAG, "1"),
            Err(CastorError::AlreadyCorrected(_))
        ));
    }

    #[test]
    fn append_rewrites_disabled_flag() -> Result<()> {
        let header = format!("{DEFAULT_CDH}\nNormalization correction flag: 0");
        let out = append_field(&header, CdhKey::NORMALIZATION_CORRECTION_FLAG, "1")?;
        assert!(correction_flag(&out, CdhKey::NORMALIZATION_CORRECTION_FLAG)?);
        assert_eq!(out.matches(CdhKey::NORMALIZATION_CORRECTION_FLAG).count(), 1);
        Ok(())
    }

    #[test]
    fn list_mode_detection() -> Result<()> {
        assert!(acquisition_mode_is_list_mode(DEFAULT_CDH)?);
        assert!(!acquisition_mode_is_list_mode("Data mode: histogram")?);
        assert!(matches!(
            acquisition_mode_is_list_mode("Data type: PET"),
            Err(CastorError::MissingMandatoryField(_))
        ));
        Ok(())
    }

    #[test]
    fn flag_values() -> Result<()> {
        let key = CdhKey::NORMALIZATION_CORRECTION_FLAG;
        assert!(!correction_flag(DEFAULT_CDH, key)?);
        assert!(correction_flag(&format!("{DEFAULT_CDH}\n{key}: 1"), key)?);
        assert!(!correction_flag(&format!("{DEFAULT_CDH}\n{key}: 0"), key)?);
        assert!(correction_flag(&format!("{DEFAULT_CDH}\n{key}: 2"), key)?);
        assert!(matches!(
            correction_flag(&format!("{DEFAULT_CDH}\n{key}: hello"), key),
            Err(CastorError::MalformedField { .. })
        ));
        Ok(())
    }

    #[test]
    fn lines_per_event() -> Result<()> {
        assert_eq!(max_lines_per_event(DEFAULT_CDH)?, 1);
        let header = format!("{DEFAULT_CDH}\nMaximum number of lines per event: 2");
        assert_eq!(max_lines_per_event(&header)?, 2);
        let header = format!("{DEFAULT_CDH}\nMaximum number of lines per event: toto");
        assert!(matches!(
            max_lines_per_event(&header),
            Err(CastorError::MalformedField { .. })
        ));
        Ok(())
    }
}
