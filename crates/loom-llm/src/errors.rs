use thiserror::Error;

/// Error kinds surfaced by the LLM capability (spec §7, "LLM" layer).
#[derive(Debug, Error, Clone)]
pub enum LlmError {
    #[error("LLM transport error: {0}")]
    Transport(String),

    #[error("LLM returned an empty response")]
    Empty,

    #[error("LLM response contained no text content")]
    NoTextContent,

    #[error("LLM client misconfigured: {0}")]
    Configuration(String),
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Transport(_))
    }
}
