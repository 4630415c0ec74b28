//! Model capability and the MusicGen ONNX backend.
//!
//! The generator only sees two traits:
//! - [`ModelLoader`]: turns a model name into a loaded model
//! - [`MusicModel`]: generates audio for a batch of prompts
//!
//! [`OnnxModelLoader`] and [`OnnxMusicGen`] implement them on top of these
//! ONNX wrappers:
//! - [`MusicGenTextEncoder`](text_encoder::MusicGenTextEncoder): prompt encoding
//! - [`MusicGenDecoder`](decoder::MusicGenDecoder): autoregressive token generation
//! - [`MusicGenAudioCodec`](audio_codec::MusicGenAudioCodec): tokens to audio
//! - [`DelayPattern`](delay_pattern::DelayPattern): 4-codebook delay pattern
//! - [`Logits`](logits::Logits): guidance and sampling

pub mod audio_codec;
pub mod decoder;
pub mod delay_pattern;
pub mod downloader;
pub mod loader;
pub mod logits;
pub mod musicgen;
pub mod registry;
pub mod text_encoder;

use crate::error::Result;
use crate::types::{AudioTensor, GenerationParams};

pub use audio_codec::MusicGenAudioCodec;
pub use decoder::MusicGenDecoder;
pub use delay_pattern::DelayPattern;
pub use downloader::ensure_models;
pub use loader::{check_models, load_sessions, MusicGenModels, OnnxModelLoader, REQUIRED_MODEL_FILES};
pub use logits::Logits;
pub use musicgen::OnnxMusicGen;
pub use registry::{PretrainedModel, PRETRAINED_MODELS};
pub use text_encoder::MusicGenTextEncoder;

/// A loaded text-to-music model.
pub trait MusicModel: Send {
    /// Native output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Version string of the loaded weights.
    fn version(&self) -> &str;

    /// Replaces the generation parameters used by later calls.
    fn set_params(&mut self, params: GenerationParams) -> Result<()>;

    /// Generates one audio tensor per prompt, in order.
    fn generate(&mut self, prompts: &[&str]) -> Result<Vec<AudioTensor>>;
}

/// Resolves model names to loaded models.
pub trait ModelLoader {
    fn load(&self, model_name: &str) -> Result<Box<dyn MusicModel>>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted stand-ins for the ONNX backend.

    use std::sync::{Arc, Mutex};

    use super::{ModelLoader, MusicModel};
    use crate::error::{GeneratorError, Result};
    use crate::types::{AudioTensor, GenerationParams};

    /// Everything the fakes observed.
    #[derive(Debug, Default)]
    pub struct Calls {
        pub loads: Vec<String>,
        pub params: Vec<GenerationParams>,
        pub prompts: Vec<String>,
    }

    pub type SharedCalls = Arc<Mutex<Calls>>;

    /// Model producing a short sine per prompt.
    pub struct FakeModel {
        sample_rate: u32,
        channels: usize,
        params: GenerationParams,
        fail_on: Vec<usize>,
        empty_output: bool,
        calls: SharedCalls,
    }

    impl MusicModel for FakeModel {
        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn version(&self) -> &str {
            "fake-v1"
        }

        fn set_params(&mut self, params: GenerationParams) -> Result<()> {
            self.calls.lock().unwrap().params.push(params.clone());
            self.params = params;
            Ok(())
        }

        fn generate(&mut self, prompts: &[&str]) -> Result<Vec<AudioTensor>> {
            let mut calls = self.calls.lock().unwrap();
            let mut out = Vec::with_capacity(prompts.len());
            for prompt in prompts {
                calls.prompts.push(prompt.to_string());
                let call = calls.prompts.len();
                if self.fail_on.contains(&call) {
                    return Err(GeneratorError::generation_failed(format!(
                        "scripted failure on call {}",
                        call
                    )));
                }
                if self.empty_output {
                    continue;
                }

                let frames = (self.params.duration_sec * self.sample_rate) as usize;
                let freq = 110.0 * call as f32;
                let channel: Vec<f32> = (0..frames)
                    .map(|i| {
                        let t = i as f32 / self.sample_rate as f32;
                        0.5 * (2.0 * std::f32::consts::PI * freq * t).sin()
                    })
                    .collect();
                out.push(AudioTensor::new(vec![channel; self.channels])?);
            }
            Ok(out)
        }
    }

    /// Loader that knows a fixed set of names and hands out [`FakeModel`]s.
    pub struct FakeLoader {
        pub known: Vec<String>,
        pub sample_rate: u32,
        pub channels: usize,
        pub fail_on: Vec<usize>,
        pub empty_output: bool,
        pub calls: SharedCalls,
    }

    impl Default for FakeLoader {
        fn default() -> Self {
            Self {
                known: vec!["facebook/musicgen-small".to_string()],
                // Small rate keeps tests fast.
                sample_rate: 3200,
                channels: 1,
                fail_on: Vec::new(),
                empty_output: false,
                calls: SharedCalls::default(),
            }
        }
    }

    impl FakeLoader {
        /// Fails the given generate calls, counted from 1 across the model's life.
        pub fn failing_on(calls: &[usize]) -> Self {
            Self {
                fail_on: calls.to_vec(),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> SharedCalls {
            Arc::clone(&self.calls)
        }
    }

    impl ModelLoader for FakeLoader {
        fn load(&self, model_name: &str) -> Result<Box<dyn MusicModel>> {
            self.calls.lock().unwrap().loads.push(model_name.to_string());
            if !self.known.iter().any(|k| k == model_name) {
                return Err(GeneratorError::unknown_model(model_name));
            }
            Ok(Box::new(FakeModel {
                sample_rate: self.sample_rate,
                channels: self.channels,
                params: GenerationParams::default(),
                fail_on: self.fail_on.clone(),
                empty_output: self.empty_output,
                calls: Arc::clone(&self.calls),
            }))
        }
    }
}
