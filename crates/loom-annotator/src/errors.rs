use thiserror::Error;

/// Error kinds surfaced by the profile annotator (spec §4.3).
#[derive(Debug, Error)]
pub enum AnnotatorError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] loom_llm::LlmError),

    #[error("ANNOTATION_UNPARSEABLE: {0}")]
    Unparseable(String),

    #[error("LLM response is missing `page`")]
    MissingPage,

    #[error("LLM response is missing `page.id`")]
    MissingPageId,
}
