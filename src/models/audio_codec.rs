//! EnCodec decoder: token frames to waveform.

use std::path::Path;

use half::f16;
use ort::session::Session;
use ort::value::{DynValue, Tensor};

use crate::error::{GeneratorError, Result};
use crate::types::AudioTensor;

use super::decoder::CODEBOOKS;
use super::loader::build_session;

/// MusicGen audio codec (EnCodec decoder).
pub struct MusicGenAudioCodec {
    audio_codec: Session,
    channels: u32,
}

impl MusicGenAudioCodec {
    /// Loads `encodec_decode.onnx` from the directory.
    pub fn load(model_dir: &Path, channels: u32, threads: Option<u32>) -> Result<Self> {
        Ok(Self {
            audio_codec: build_session(&model_dir.join("encodec_decode.onnx"), threads)?,
            channels,
        })
    }

    /// Decodes aligned token frames into audio.
    pub fn decode(&mut self, frames: &[[i64; CODEBOOKS]]) -> Result<AudioTensor> {
        if frames.is_empty() {
            return AudioTensor::new(vec![Vec::new(); self.channels as usize]);
        }

        let codes = codebook_major(frames);
        let input = Tensor::from_array(([1usize, 1, CODEBOOKS, frames.len()], codes)).map_err(|e| {
            GeneratorError::generation_failed(format!("Failed to create token tensor: {}", e))
        })?;

        let mut outputs = self
            .audio_codec
            .run(ort::inputs![input])
            .map_err(|e| {
                GeneratorError::generation_failed(format!("Audio codec inference failed: {}", e))
            })?;

        let audio_values: DynValue = outputs.remove("audio_values").ok_or_else(|| {
            GeneratorError::generation_failed("audio_values not found in output")
        })?;

        let (shape, samples): (Vec<i64>, Vec<f32>) =
            if let Ok((shape, data)) = audio_values.try_extract_tensor::<f32>() {
                (shape.to_vec(), data.to_vec())
            } else if let Ok((shape, data)) = audio_values.try_extract_tensor::<f16>() {
                (shape.to_vec(), data.iter().map(|e| f32::from(*e)).collect())
            } else {
                return Err(GeneratorError::generation_failed(
                    "Audio values must be either f16 or f32",
                ));
            };

        split_channels(&shape, samples)
    }
}

/// Reorders `[frame][codebook]` tokens into `[codebook][frame]`.
fn codebook_major(frames: &[[i64; CODEBOOKS]]) -> Vec<i64> {
    let mut codes = Vec::with_capacity(frames.len() * CODEBOOKS);
    for codebook in 0..CODEBOOKS {
        codes.extend(frames.iter().map(|frame| frame[codebook]));
    }
    codes
}

/// Splits a `[batch=1, channels, samples]` buffer into channels.
/// A rank-2 `[1, samples]` output is treated as mono.
fn split_channels(shape: &[i64], samples: Vec<f32>) -> Result<AudioTensor> {
    let channels = match shape {
        [1, channels, _] => *channels as usize,
        [1, _] => 1,
        other => {
            return Err(GeneratorError::generation_failed(format!(
                "Unexpected audio_values shape: {:?}",
                other
            )))
        }
    };
    if channels == 0 {
        return Err(GeneratorError::generation_failed("Codec produced no channels"));
    }
    let per_channel = samples.len() / channels;
    AudioTensor::new(
        samples
            .chunks(per_channel.max(1))
            .take(channels)
            .map(<[f32]>::to_vec)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codebook_major_transposes() {
        let frames = vec![[1i64, 2, 3, 4], [5, 6, 7, 8]];
        assert_eq!(codebook_major(&frames), vec![1, 5, 2, 6, 3, 7, 4, 8]);
    }

    #[test]
    fn split_stereo_output() {
        let audio = split_channels(&[1, 2, 3], vec![1.0, 2.0, 3.0, -1.0, -2.0, -3.0]).unwrap();
        assert_eq!(audio.num_channels(), 2);
        assert_eq!(audio.channel(1).unwrap(), &[-1.0, -2.0, -3.0]);
    }

    #[test]
    fn split_mono_output() {
        let audio = split_channels(&[1, 1, 4], vec![0.0; 4]).unwrap();
        assert_eq!(audio.num_channels(), 1);
        assert_eq!(audio.num_frames(), 4);

        let audio = split_channels(&[1, 4], vec![0.0; 4]).unwrap();
        assert_eq!(audio.num_channels(), 1);
    }

    #[test]
    fn split_rejects_batched_output() {
        assert!(split_channels(&[2, 1, 2], vec![0.0; 4]).is_err());
    }
}
