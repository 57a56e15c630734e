//! Shared plumbing for the `compile` and `run` binaries: Markdown parsing,
//! logging/env bootstrap, and the concrete Chromium driver factory.

pub mod chromium_factory;
pub mod markdown;
pub mod runtime;
