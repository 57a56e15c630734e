use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("at capacity: {0} sessions already open")]
    MaxSessionsReached(usize),

    #[error("no session with id {0}")]
    NotFound(String),

    #[error("browser error: {0}")]
    Browser(#[from] loom_browser::BrowserError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] loom_snapshot::SnapshotError),

    #[error("dom capture failed: {0}")]
    Capture(String),
}
