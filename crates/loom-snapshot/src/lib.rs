//! Loads a page and extracts an abbreviated DOM tree with injected stable
//! ids, an accessibility listing, and a control inventory (spec §4.1).

mod errors;
mod script;
mod service;

pub use errors::SnapshotError;
pub use script::{render_walker_script, A11Y_SCRIPT, WALKER_SCRIPT_TEMPLATE};
pub use service::SnapshotService;
