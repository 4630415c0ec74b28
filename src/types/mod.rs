//! Core types for the music generator.
//!
//! - [`GenerationRequest`] / [`GenerationParams`]: what to generate
//! - [`AudioTensor`] / [`GenerationResult`]: what comes back
//! - [`ModelConfig`]: MusicGen architecture parameters

mod audio;
mod config;
mod request;

pub use audio::{AudioTensor, GenerationResult};
pub use config::ModelConfig;
pub use request::{
    validate_duration, validate_prompt, GenerationParams, GenerationRequest,
    DEFAULT_DURATION_SEC, MAX_DURATION_SEC, MAX_PROMPT_CHARS, MIN_DURATION_SEC,
};
