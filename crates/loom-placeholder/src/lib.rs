//! Detects `s_<field>[*N]` placeholders in a JSON value tree and resolves
//! them against a data row, including the `gender` enumerated translation
//! and the `*N` arithmetic multiplier (spec §4.6).

mod processor;

pub use processor::{replace_placeholders_in_value, PlaceholderProcessor};
