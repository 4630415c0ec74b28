//! ONNX MusicGen model.
//!
//! Chains the text encoder, the decoder and the audio codec into the
//! [`MusicModel`] capability.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{GeneratorError, Result};
use crate::types::{validate_duration, AudioTensor, GenerationParams};

use super::decoder::Sampling;
use super::loader::MusicGenModels;
use super::MusicModel;

/// Rough CPU decoding cost per frame, in seconds.
const SECONDS_PER_FRAME_ESTIMATE: f32 = 0.1;

/// Estimates wall-clock generation time for a frame count.
///
/// Actual time depends on hardware.
pub fn estimate_generation_time(frames: usize) -> f32 {
    frames as f32 * SECONDS_PER_FRAME_ESTIMATE
}

/// MusicGen running on ONNX Runtime.
pub struct OnnxMusicGen {
    models: MusicGenModels,
    params: GenerationParams,
    rng: ChaCha8Rng,
}

impl OnnxMusicGen {
    pub fn new(models: MusicGenModels, params: GenerationParams) -> Self {
        let rng = seeded_rng(params.seed);
        Self { models, params, rng }
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    fn generate_one(&mut self, prompt: &str) -> Result<AudioTensor> {
        let frames = self.models.config.tokens_for_duration(self.params.duration_sec);
        let sampling = Sampling {
            guidance_scale: self.params.guidance_scale,
            top_k: self.params.top_k,
        };

        tracing::info!(
            prompt,
            frames,
            estimate_sec = estimate_generation_time(frames),
            "encoding prompt"
        );
        let encoded = self.models.text_encoder.encode(prompt)?;
        tracing::debug!(tokens = encoded.token_count, "prompt encoded");

        let frame_rate = self.models.config.frame_rate.max(1) as usize;
        let tokens = self.models.decoder.generate_tokens(
            encoded,
            frames,
            sampling,
            &mut self.rng,
            |done, total| {
                if done % frame_rate == 0 || done == total {
                    tracing::debug!(done, total, "decoded frames");
                }
            },
        )?;

        tracing::info!(frames = tokens.len(), "decoding audio");
        let audio = self.models.audio_codec.decode(&tokens)?;
        tracing::info!(
            samples = audio.num_frames(),
            channels = audio.num_channels(),
            seconds = audio.duration_sec(self.models.config.sample_rate),
            "audio generated"
        );
        Ok(audio)
    }
}

impl MusicModel for OnnxMusicGen {
    fn sample_rate(&self) -> u32 {
        self.models.config.sample_rate
    }

    fn version(&self) -> &str {
        &self.models.version
    }

    fn set_params(&mut self, params: GenerationParams) -> Result<()> {
        validate_duration(params.duration_sec)?;
        if params.top_k == 0 {
            return Err(GeneratorError::generation_failed("top_k must be at least 1"));
        }
        if params.seed.is_some() && params.seed != self.params.seed {
            self.rng = seeded_rng(params.seed);
        }
        self.params = params;
        Ok(())
    }

    fn generate(&mut self, prompts: &[&str]) -> Result<Vec<AudioTensor>> {
        prompts.iter().map(|prompt| self.generate_one(prompt)).collect()
    }
}

fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}
