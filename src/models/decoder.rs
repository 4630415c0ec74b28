//! MusicGen decoder with KV cache.
//!
//! Runs the split decoder export: `decoder_model.onnx` for the first step and
//! `decoder_with_past_model.onnx` for every step after it, feeding the
//! present key/values back in as the past.

use std::borrow::Cow;
use std::path::Path;

use half::f16;
use ort::session::{Session, SessionInputValue};
use ort::value::{DynValue, Tensor};
use rand::Rng;

use crate::error::{GeneratorError, Result};
use crate::types::ModelConfig;

use super::delay_pattern::DelayPattern;
use super::loader::build_session;
use super::logits::Logits;
use super::text_encoder::EncodedPrompt;

/// Codebooks predicted per step.
pub const CODEBOOKS: usize = 4;

/// Decoder batch: every codebook twice, conditional then unconditional.
const GUIDED_BATCH: usize = CODEBOOKS * 2;

/// Sampling knobs for one generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub guidance_scale: f32,
    pub top_k: usize,
}

macro_rules! take_output {
    ($outputs:expr, $name:expr) => {{
        let name: &str = &$name;
        $outputs
            .remove(name)
            .ok_or_else(|| GeneratorError::generation_failed(format!("{} not found in decoder output", name)))
    }};
}

/// MusicGen decoder using split architecture with KV cache.
pub struct MusicGenDecoder {
    decoder_model: Session,
    decoder_with_past: Session,
    config: ModelConfig,
}

impl MusicGenDecoder {
    /// Loads `decoder_model.onnx` and `decoder_with_past_model.onnx`.
    pub fn load(model_dir: &Path, config: ModelConfig, threads: Option<u32>) -> Result<Self> {
        Ok(Self {
            decoder_model: build_session(&model_dir.join("decoder_model.onnx"), threads)?,
            decoder_with_past: build_session(&model_dir.join("decoder_with_past_model.onnx"), threads)?,
            config,
        })
    }

    /// Generates `frames` aligned token frames for an encoded prompt.
    ///
    /// The delay pattern hides the first `CODEBOOKS - 1` steps, so
    /// `frames + CODEBOOKS - 1` decoder steps are run, the initial one
    /// included. `on_step` receives `(frames_done, frames)` after every
    /// completed frame.
    pub fn generate_tokens<R, F>(
        &mut self,
        prompt: EncodedPrompt,
        frames: usize,
        sampling: Sampling,
        rng: &mut R,
        mut on_step: F,
    ) -> Result<Vec<[i64; CODEBOOKS]>>
    where
        R: Rng + ?Sized,
        F: FnMut(usize, usize),
    {
        let layers = self.config.num_hidden_layers as usize;
        let pad_token_id = self.config.pad_token_id;

        // Unconditional half of the guidance batch sees zeroed encoder states.
        let encoder_hidden_states = duplicate_with_zeros(&prompt.hidden_states)?;
        let encoder_attention_mask = duplicate_with_zeros_typed::<i64>(&prompt.attention_mask)?;

        let mut pattern = DelayPattern::<CODEBOOKS>::new();
        let mut frames_out = Vec::with_capacity(frames);

        let initial_ids = Tensor::from_array(([GUIDED_BATCH, 1], vec![pad_token_id; GUIDED_BATCH]))
            .map_err(|e| GeneratorError::generation_failed(format!("Failed to create input_ids: {}", e)))?;

        let first_inputs: Vec<(Cow<str>, SessionInputValue)> = vec![
            (Cow::from("encoder_attention_mask"), SessionInputValue::from(encoder_attention_mask.view())),
            (Cow::from("encoder_hidden_states"), SessionInputValue::from(encoder_hidden_states.view())),
            (Cow::from("input_ids"), SessionInputValue::from(initial_ids.view())),
        ];

        let mut outputs = self.decoder_model.run(first_inputs).map_err(|e| {
            GeneratorError::generation_failed(format!("Initial decoder inference failed: {}", e))
        })?;

        let logits = take_output!(outputs, "logits")?;
        pattern.push(sample_step(&logits, sampling, rng)?);

        // Cache layout per layer: decoder key, decoder value, encoder key, encoder value.
        let mut kv_cache: Vec<(String, DynValue)> = Vec::with_capacity(layers * 4);
        for j in 0..layers {
            for part in ["decoder.key", "decoder.value", "encoder.key", "encoder.value"] {
                let value = take_output!(outputs, format!("present.{j}.{part}"))?;
                kv_cache.push((format!("past_key_values.{j}.{part}"), value));
            }
        }
        drop(outputs);

        let max_steps = frames + CODEBOOKS - 1;
        for _ in 0..max_steps {
            let next = pattern.next_input(pad_token_id);
            let ids: Vec<i64> = next.iter().chain(next.iter()).copied().collect();
            let input_ids = Tensor::from_array(([GUIDED_BATCH, 1], ids))
                .map_err(|e| GeneratorError::generation_failed(format!("Failed to create input_ids: {}", e)))?;

            let mut inputs: Vec<(Cow<str>, SessionInputValue)> = vec![
                (Cow::from("input_ids"), SessionInputValue::from(input_ids.view())),
                (Cow::from("encoder_attention_mask"), SessionInputValue::from(encoder_attention_mask.view())),
            ];
            for (name, value) in &kv_cache {
                inputs.push((Cow::from(name.as_str()), SessionInputValue::from(value.view())));
            }

            let mut outputs = self.decoder_with_past.run(inputs).map_err(|e| {
                GeneratorError::generation_failed(format!("Decoder with past inference failed: {}", e))
            })?;

            let logits = take_output!(outputs, "logits")?;
            pattern.push(sample_step(&logits, sampling, rng)?);

            if collect_aligned(&pattern, &mut frames_out, frames, &mut on_step) {
                break;
            }

            // Encoder key/values never change; only the decoder half is refreshed.
            for j in 0..layers {
                kv_cache[j * 4].1 = take_output!(outputs, format!("present.{j}.decoder.key"))?;
                kv_cache[j * 4 + 1].1 = take_output!(outputs, format!("present.{j}.decoder.value"))?;
            }
        }

        tracing::debug!(steps = pattern.len(), frames = frames_out.len(), "decoding finished");
        Ok(frames_out)
    }
}

/// Records the frame completed by the latest step, up to `frames` frames.
/// Returns true once all of them are collected.
fn collect_aligned<F: FnMut(usize, usize)>(
    pattern: &DelayPattern<CODEBOOKS>,
    frames_out: &mut Vec<[i64; CODEBOOKS]>,
    frames: usize,
    on_step: &mut F,
) -> bool {
    if frames_out.len() < frames {
        if let Some(frame) = pattern.last_aligned() {
            frames_out.push(frame);
            on_step(frames_out.len(), frames);
        }
    }
    frames_out.len() >= frames
}

/// Guides and samples one step of logits into one token per codebook.
fn sample_step<R: Rng + ?Sized>(
    logits: &DynValue,
    sampling: Sampling,
    rng: &mut R,
) -> Result<[i64; CODEBOOKS]> {
    let tokens = Logits::from_3d_dyn_value(logits)?
        .apply_free_guidance(sampling.guidance_scale)?
        .sample_top_k(sampling.top_k, rng)?;

    tokens.try_into().map_err(|tokens: Vec<i64>| {
        GeneratorError::generation_failed(format!(
            "Expected {} tokens per step, got {}",
            CODEBOOKS,
            tokens.len()
        ))
    })
}

/// Doubles a tensor along the first axis, filling the new half with zeros.
/// Handles both fp16 and fp32 exports.
fn duplicate_with_zeros(tensor: &DynValue) -> Result<DynValue> {
    if let Ok(result) = duplicate_with_zeros_typed::<f16>(tensor) {
        return Ok(result);
    }
    duplicate_with_zeros_typed::<f32>(tensor)
}

fn duplicate_with_zeros_typed<T>(tensor: &DynValue) -> Result<DynValue>
where
    T: ort::tensor::PrimitiveTensorElementType + Clone + Default + std::fmt::Debug + 'static,
{
    let (shape, data) = tensor.try_extract_tensor::<T>().map_err(|e| {
        GeneratorError::generation_failed(format!("Failed to extract tensor: {}", e))
    })?;

    let mut new_shape: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
    new_shape[0] *= 2;

    let mut combined: Vec<T> = Vec::with_capacity(data.len() * 2);
    combined.extend_from_slice(data);
    combined.resize(data.len() * 2, T::default());

    let result = Tensor::from_array((new_shape, combined)).map_err(|e| {
        GeneratorError::generation_failed(format!("Failed to create duplicated tensor: {}", e))
    })?;

    Ok(result.into_dyn())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays the decoder loop with scripted tokens instead of a session.
    fn replay(frames: usize) -> (Vec<[i64; CODEBOOKS]>, Vec<(usize, usize)>, usize) {
        let mut pattern = DelayPattern::<CODEBOOKS>::new();
        let mut frames_out = Vec::new();
        let mut progress = Vec::new();
        let mut on_step = |done: usize, total: usize| progress.push((done, total));

        let mut runs = 1;
        pattern.push([0; CODEBOOKS]);
        for step in 1..frames + CODEBOOKS - 1 {
            runs += 1;
            pattern.push([step as i64; CODEBOOKS]);
            if collect_aligned(&pattern, &mut frames_out, frames, &mut on_step) {
                break;
            }
        }
        (frames_out, progress, runs)
    }

    #[test]
    fn collects_exactly_the_requested_frames() {
        let (frames_out, progress, runs) = replay(5);
        assert_eq!(frames_out.len(), 5);
        assert_eq!(runs, 5 + CODEBOOKS - 1);
        assert_eq!(progress.len(), 5);
        assert_eq!(progress.last(), Some(&(5, 5)));
        assert!(progress.iter().all(|&(done, total)| done <= total));
    }

    #[test]
    fn frames_read_along_the_diagonal() {
        let (frames_out, _, _) = replay(2);
        assert_eq!(frames_out, vec![[0, 1, 2, 3], [1, 2, 3, 4]]);
    }

    #[test]
    fn stops_collecting_when_full() {
        let mut pattern = DelayPattern::<CODEBOOKS>::new();
        let mut frames_out = Vec::new();
        let mut calls = 0;
        let mut on_step = |_: usize, _: usize| calls += 1;
        for step in 0..10 {
            pattern.push([step; CODEBOOKS]);
            collect_aligned(&pattern, &mut frames_out, 3, &mut on_step);
        }
        assert_eq!(frames_out.len(), 3);
        assert_eq!(calls, 3);
    }
}
