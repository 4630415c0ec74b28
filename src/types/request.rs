//! Generation request and parameter types.
//!
//! A [`GenerationRequest`] is built once per `generate` call and validated on
//! construction, so any request that exists is safe to hand to a model.

use serde::{Deserialize, Serialize};

use crate::error::{GeneratorError, Result};

/// Shortest duration the generator accepts, in seconds.
pub const MIN_DURATION_SEC: u32 = 1;

/// Longest duration the generator accepts, in seconds.
pub const MAX_DURATION_SEC: u32 = 120;

/// Duration used when nothing else is configured.
pub const DEFAULT_DURATION_SEC: u32 = 8;

/// Maximum prompt length in characters.
pub const MAX_PROMPT_CHARS: usize = 1000;

/// Checks that a duration lies within the supported range.
pub fn validate_duration(duration_sec: u32) -> Result<u32> {
    if (MIN_DURATION_SEC..=MAX_DURATION_SEC).contains(&duration_sec) {
        Ok(duration_sec)
    } else {
        Err(GeneratorError::invalid_duration(duration_sec))
    }
}

/// Checks a prompt and returns it trimmed.
pub fn validate_prompt(prompt: &str) -> Result<&str> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(GeneratorError::empty_prompt());
    }
    let len = trimmed.chars().count();
    if len > MAX_PROMPT_CHARS {
        return Err(GeneratorError::prompt_too_long(len));
    }
    Ok(trimmed)
}

/// A single, immutable request for generated audio.
///
/// Deserialization goes through [`GenerationRequest::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGenerationRequest")]
pub struct GenerationRequest {
    prompt: String,
    duration_sec: u32,
}

#[derive(Deserialize)]
struct RawGenerationRequest {
    prompt: String,
    duration_sec: u32,
}

impl TryFrom<RawGenerationRequest> for GenerationRequest {
    type Error = GeneratorError;

    fn try_from(raw: RawGenerationRequest) -> Result<Self> {
        GenerationRequest::new(&raw.prompt, raw.duration_sec)
    }
}

impl GenerationRequest {
    /// Creates a validated request.
    ///
    /// The prompt is trimmed; blank prompts and out-of-range durations are
    /// rejected.
    pub fn new(prompt: &str, duration_sec: u32) -> Result<Self> {
        let prompt = validate_prompt(prompt)?;
        let duration_sec = validate_duration(duration_sec)?;
        Ok(Self {
            prompt: prompt.to_string(),
            duration_sec,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn duration_sec(&self) -> u32 {
        self.duration_sec
    }
}

/// Parameters forwarded to the model capability by `configure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Target audio length in seconds.
    pub duration_sec: u32,

    /// Sampling seed. `None` draws a fresh seed from the OS.
    pub seed: Option<u64>,

    /// Classifier-free guidance scale.
    pub guidance_scale: f32,

    /// Number of most likely tokens considered at each sampling step.
    pub top_k: usize,
}

impl GenerationParams {
    /// Returns a copy with a different duration.
    pub fn with_duration(&self, duration_sec: u32) -> Self {
        Self {
            duration_sec,
            ..self.clone()
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            duration_sec: DEFAULT_DURATION_SEC,
            seed: None,
            guidance_scale: 3.0,
            top_k: 250,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn request_trims_prompt() {
        let request = GenerationRequest::new("  classic rock song \n", 8).unwrap();
        assert_eq!(request.prompt(), "classic rock song");
        assert_eq!(request.duration_sec(), 8);
    }

    #[test]
    fn blank_prompt_rejected() {
        for prompt in ["", "   ", "\t\n"] {
            let err = GenerationRequest::new(prompt, 8).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidPrompt);
        }
    }

    #[test]
    fn long_prompt_rejected() {
        let prompt = "a".repeat(MAX_PROMPT_CHARS + 1);
        let err = GenerationRequest::new(&prompt, 8).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPrompt);

        let prompt = "a".repeat(MAX_PROMPT_CHARS);
        assert!(GenerationRequest::new(&prompt, 8).is_ok());
    }

    #[test]
    fn deserialized_request_is_validated() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"prompt":"  jazz  ","duration_sec":4}"#).unwrap();
        assert_eq!(request, GenerationRequest::new("jazz", 4).unwrap());

        let err = serde_json::from_str::<GenerationRequest>(r#"{"prompt":"   ","duration_sec":1}"#)
            .unwrap_err();
        assert!(err.to_string().contains("INVALID_PROMPT"));

        let err = serde_json::from_str::<GenerationRequest>(r#"{"prompt":"jazz","duration_sec":0}"#)
            .unwrap_err();
        assert!(err.to_string().contains("INVALID_DURATION"));
    }

    #[test]
    fn duration_bounds() {
        assert_eq!(validate_duration(0).unwrap_err().code, ErrorCode::InvalidDuration);
        assert_eq!(validate_duration(MIN_DURATION_SEC).unwrap(), MIN_DURATION_SEC);
        assert_eq!(validate_duration(MAX_DURATION_SEC).unwrap(), MAX_DURATION_SEC);
        assert!(validate_duration(MAX_DURATION_SEC + 1).is_err());
    }

    #[test]
    fn params_with_duration_keeps_sampling() {
        let params = GenerationParams {
            seed: Some(7),
            ..GenerationParams::default()
        };
        let longer = params.with_duration(20);
        assert_eq!(longer.duration_sec, 20);
        assert_eq!(longer.seed, Some(7));
        assert_eq!(longer.top_k, 250);
    }
}
