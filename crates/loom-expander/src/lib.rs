//! Expands a template `ActionPlan` into one concrete plan per dataset row,
//! discarding any row whose placeholders don't fully resolve.

mod errors;
mod expander;

pub use errors::ExpanderError;
pub use expander::{expand, write_expansion, ExpansionOutcome, ExpansionStats};
