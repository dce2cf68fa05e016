//! CASToR data header handling.
//!
//! The header is kept as raw text: every operation is a pure
//! `&str -> String` transformation so that lines this crate does not know
//! about survive untouched.

pub mod keys;
pub mod codec;

pub use codec::{
    acquisition_mode_is_list_mode, append_field, correction_flag, max_lines_per_event,
    read_field, replace_field,
};
pub use keys::CdhKey;
