//! Text generation backends for Stride.
//!
//! All generators implement the `stride_core::TextGenerator` trait.
//! [`FallbackGenerator`] chains several of them with per-entry timeouts.

pub mod fallback;
pub mod openai_compat;

pub use fallback::FallbackGenerator;
pub use openai_compat::OpenAiCompatGenerator;
