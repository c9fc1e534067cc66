//! # llog-inference
//!
//! LLM metadata generation backend for llog.
//!
//! This crate provides:
//! - OpenAI-compatible chat completions client
//! - [`MetadataBackend`] implementation that prompts a model with a
//!   document sample and parses the returned JSON into [`AutoMetadata`]
//!
//! # Example
//!
//! ```rust,no_run
//! use llog_inference::OpenAIBackend;
//! use llog_core::MetadataBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OpenAIBackend::from_env().unwrap();
//!     let metadata = backend
//!         .generate_metadata("Linear Algebra Notes", "Vectors have direction...")
//!         .await
//!         .unwrap();
//!     println!("{:?}", metadata.themes);
//! }
//! ```

pub mod backend;
pub mod types;

// Re-export core types for convenience
pub use llog_core::*;

pub use backend::{
    OpenAIBackend, OpenAIConfig, DEFAULT_GEN_MODEL, DEFAULT_MAX_TOKENS, DEFAULT_OPENAI_URL,
};
