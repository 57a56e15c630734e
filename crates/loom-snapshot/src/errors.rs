use thiserror::Error;

/// Error kinds surfaced by the snapshot service (spec §4.1).
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("FETCH_TIMEOUT: navigating to {url} exceeded {timeout_ms}ms")]
    FetchTimeout { url: String, timeout_ms: u64 },

    #[error("FETCH_ERROR: {0}")]
    FetchError(String),

    #[error("failed to persist snapshot: {0}")]
    Persist(String),

    #[error("failed to parse walker output: {0}")]
    Parse(String),
}

impl SnapshotError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SnapshotError::FetchTimeout { .. })
    }
}
