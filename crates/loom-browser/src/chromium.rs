use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::driver::BrowserDriver;
use crate::errors::BrowserError;

/// `BrowserDriver` backed by a single Chromium tab reached over the DevTools
/// protocol via `chromiumoxide`.
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
}

impl ChromiumDriver {
    pub async fn launch(headless: bool) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder();
        if !headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    warn!(error = %err, "chromium handler event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        Ok(Self { browser, page })
    }

    async fn with_timeout<T>(
        timeout: Duration,
        fut: impl std::future::Future<Output = Result<T, chromiumoxide::error::CdpError>>,
    ) -> Result<T, BrowserError> {
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(BrowserError::Transport(e.to_string())),
            Err(_) => Err(BrowserError::Transport(format!(
                "operation timed out after {timeout:?}"
            ))),
        }
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        debug!(url, "navigate");
        Self::with_timeout(timeout, async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok(())
        })
        .await
        .map_err(|e| BrowserError::Navigate {
            url: url.to_string(),
            source: e.to_string(),
        })
    }

    async fn fill(
        &self,
        selector: &str,
        value: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        if !self.is_visible(selector, timeout).await? {
            return Err(BrowserError::ElementNotFound(selector.to_string()));
        }
        let element = Self::with_timeout(timeout, self.page.find_element(selector))
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::Transport(e.to_string()))?;
        element
            .type_str(value)
            .await
            .map_err(|e| BrowserError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        let element = Self::with_timeout(timeout, self.page.find_element(selector))
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn text_content(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<String, BrowserError> {
        let element = Self::with_timeout(timeout, self.page.find_element(selector))
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        let text = element
            .inner_text()
            .await
            .map_err(|e| BrowserError::Transport(e.to_string()))?
            .unwrap_or_default();
        Ok(text)
    }

    async fn count(&self, selector: &str) -> Result<usize, BrowserError> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| BrowserError::Transport(e.to_string()))?;
        Ok(elements.len())
    }

    async fn is_visible(&self, selector: &str, timeout: Duration) -> Result<bool, BrowserError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({selector:?}); if (!el) return false; \
             const r = el.getBoundingClientRect(); const style = getComputedStyle(el); \
             return r.width > 0 && r.height > 0 && style.visibility !== 'hidden' && style.display !== 'none'; }})()"
        );

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let value = self.evaluate(&script).await?;
            if value.as_bool().unwrap_or(false) {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Evaluate(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| BrowserError::Evaluate(e.to_string()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| BrowserError::Screenshot(e.to_string()))
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self
            .page
            .url()
            .await
            .map_err(|e| BrowserError::Transport(e.to_string()))?
            .unwrap_or_default())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(|e| BrowserError::Transport(e.to_string()))?
            .unwrap_or_default())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.page
            .close()
            .await
            .map_err(|e| BrowserError::Transport(e.to_string()))?;
        Ok(())
    }
}
