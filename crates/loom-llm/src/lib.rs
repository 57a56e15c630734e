//! A narrow `LLMClient` capability: chat-completion in, text out.
//!
//! The provider itself is an external collaborator (see spec §1); this crate
//! only defines the trait and one concrete implementation against an
//! OpenAI-compatible Chat Completions endpoint, the shape every provider the
//! annotator and compiler talk to in practice exposes.

mod client;
mod errors;

pub use client::{ChatMessage, LlmClient, OpenAiClient, OpenAiClientConfig};
pub use errors::LlmError;
