use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::BrowserError;

/// Narrow browser-automation capability the executor and snapshot service
/// drive a page through. The concrete engine (CDP, WebDriver, ...) is an
/// external collaborator; everything above this trait is engine-agnostic.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    async fn fill(&self, selector: &str, value: &str, timeout: Duration)
        -> Result<(), BrowserError>;

    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    async fn text_content(&self, selector: &str, timeout: Duration)
        -> Result<String, BrowserError>;

    async fn count(&self, selector: &str) -> Result<usize, BrowserError>;

    async fn is_visible(&self, selector: &str, timeout: Duration) -> Result<bool, BrowserError>;

    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError>;

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    async fn title(&self) -> Result<String, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}
