use std::sync::Arc;

use async_trait::async_trait;
use loom_browser::{BrowserDriver, BrowserError};

/// Launches a headed browser context for one calibration session. Kept as a
/// trait so this crate never depends on a concrete CDP engine.
#[async_trait]
pub trait HeadedLauncher: Send + Sync {
    async fn launch(&self, viewport: (u32, u32)) -> Result<Arc<dyn BrowserDriver>, BrowserError>;
}
