use std::sync::Arc;

use async_trait::async_trait;
use loom_browser::{BrowserDriver, BrowserError};

/// Launches a fresh, isolated browser context per case (spec §5: "the
/// browser context is owned by exactly one executor at a time; never
/// shared"). Implemented outside this crate so `loom-batch` stays
/// engine-agnostic.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn BrowserDriver>, BrowserError>;
}
