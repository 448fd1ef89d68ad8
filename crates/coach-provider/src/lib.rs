//! Hosted completion providers.

pub mod classify;
pub mod openai;

pub use classify::classify_upstream;
pub use openai::OpenAiProvider;
