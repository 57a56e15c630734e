use thiserror::Error;

/// Error kinds surfaced by the plan compiler (spec §4.5).
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] loom_llm::LlmError),

    #[error("COMPILE_EXHAUSTED: no valid DSL after {attempts} attempts: {last_error}")]
    Exhausted { attempts: usize, last_error: String },

    #[error("request has no base URL and the LLM did not provide one")]
    MissingBaseUrl,

    #[error("failed to write plan artifacts: {0}")]
    Io(String),
}
