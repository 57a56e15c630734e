use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to set up run artifacts: {0}")]
    Io(String),
}
