use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpanderError {
    #[error("dataset category not found: {0}")]
    CategoryNotFound(String),

    #[error("failed to write expansion artifacts: {0}")]
    Io(String),
}
