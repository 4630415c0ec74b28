//! music-generator: text-to-music generation around a pretrained MusicGen model.
//!
//! The library loads a model, forwards prompts to it and writes the audio it
//! returns as WAV files.
//!
//! # Modules
//!
//! - [`generator`]: load / configure / generate / save lifecycle (MusicGenerator)
//! - [`models`]: model capability traits and the ONNX MusicGen backend
//! - [`audio`]: WAV storage and playable handles
//! - [`demos`]: named demonstration routines with per-item reports
//! - [`session`]: interactive prompt session with an explicit state machine
//! - [`types`]: requests, results, audio buffers and model config
//! - [`config`]: runtime configuration (GeneratorConfig)
//! - [`error`]: error types and codes (GeneratorError, ErrorCode)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::path::Path;
//! use music_generator::{GeneratorConfig, MusicGenerator};
//!
//! let config = GeneratorConfig::from_env();
//! let mut generator = MusicGenerator::new(&config);
//! generator.load()?;
//! generator.configure(Some(8))?;
//!
//! let result = generator.generate("classic rock song")?;
//! generator.save(&result, Path::new("basic_example.wav"), None)?;
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod demos;
pub mod error;
pub mod generator;
pub mod models;
pub mod session;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use config::{GeneratorConfig, OverwritePolicy};
pub use error::{ErrorCode, GeneratorError, Result};
pub use generator::{FileGeneration, GeneratorPhase, MusicGenerator, SavedClip};
pub use session::{InteractiveSession, SessionState};
pub use types::{AudioTensor, GenerationParams, GenerationRequest, GenerationResult, ModelConfig};
