use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("cases directory not found: {0}")]
    CasesDirNotFound(String),

    #[error("failed to read or write batch artifacts: {0}")]
    Io(String),
}
