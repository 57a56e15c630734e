use thiserror::Error;

/// Error kinds surfaced by the Site Profile Store (spec §4.2).
#[derive(Debug, Error)]
pub enum ProfileStoreError {
    #[error("INVALID_PROFILE: {0}")]
    InvalidProfile(String),

    #[error("failed to read profile at {path}: {source}")]
    Read { path: String, source: String },

    #[error("failed to write profile at {path}: {source}")]
    Write { path: String, source: String },
}
