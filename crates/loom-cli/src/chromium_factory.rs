use std::sync::Arc;

use async_trait::async_trait;
use loom_browser::{BrowserDriver, BrowserError, ChromiumDriver};

pub struct ChromiumFactory {
    pub headless: bool,
}

#[async_trait]
impl loom_batch::DriverFactory for ChromiumFactory {
    async fn launch(&self) -> Result<Arc<dyn BrowserDriver>, BrowserError> {
        let driver = ChromiumDriver::launch(self.headless).await?;
        Ok(Arc::new(driver))
    }
}
