use thiserror::Error;

/// Error kinds surfaced by the browser capability (spec §7, "Browser" layer).
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} timed out or failed: {source}")]
    Navigate { url: String, source: String },

    #[error("element not found for selector `{0}`")]
    ElementNotFound(String),

    #[error("script evaluation failed: {0}")]
    Evaluate(String),

    #[error("screenshot capture failed: {0}")]
    Screenshot(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl BrowserError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BrowserError::ElementNotFound(_) | BrowserError::Transport(_)
        )
    }
}
