//! Shared data model for the compile/execute pipeline.
//!
//! These types are plain structured records (the "narrow capability" pattern
//! used across the workspace): no behavior lives here beyond small
//! invariant-preserving constructors, so every other crate can depend on this
//! one without pulling in browser, LLM, or filesystem concerns.

pub mod dataset;
pub mod dom;
pub mod placeholder;
pub mod plan;
pub mod profile;
pub mod request;
pub mod run;

pub use dataset::{Dataset, DatasetCategory, Row};
pub use dom::{Control, DomNode, Snapshot, SnapshotOpts, SnapshotStats};
pub use placeholder::{PlaceholderMatch, ReplacementError, ReplacementStats};
pub use plan::{ActionPlan, ActionStep, AssertKind, PlanMeta, StepType};
pub use profile::{AnnotatedPage, MergeResult, PageEntry, SiteAlias, SiteInfo, SiteProfile};
pub use request::{TestRequest, TestStep};
pub use run::{BatchResult, RunResult, StepResult};
