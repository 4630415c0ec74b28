//! Audio buffers produced by the model and the result handed to callers.

use crate::error::{GeneratorError, Result};

/// Multi-channel float audio, stored channel-major.
///
/// Every channel holds the same number of frames and there is at least one
/// channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTensor {
    channels: Vec<Vec<f32>>,
}

impl AudioTensor {
    /// Creates a tensor from per-channel sample vectors.
    pub fn new(channels: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = channels.first() else {
            return Err(GeneratorError::invalid_audio("audio has no channels"));
        };
        let frames = first.len();
        if let Some(bad) = channels.iter().position(|c| c.len() != frames) {
            return Err(GeneratorError::invalid_audio(format!(
                "channel {} has {} samples, expected {}",
                bad,
                channels[bad].len(),
                frames
            )));
        }
        if channels.len() > u16::MAX as usize {
            return Err(GeneratorError::invalid_audio(format!(
                "too many channels: {}",
                channels.len()
            )));
        }
        Ok(Self { channels })
    }

    /// Creates a single-channel tensor.
    pub fn mono(samples: Vec<f32>) -> Self {
        Self {
            channels: vec![samples],
        }
    }

    /// Splits frame-interleaved samples into channels.
    pub fn from_interleaved(samples: &[f32], num_channels: u16) -> Result<Self> {
        let n = num_channels as usize;
        if n == 0 {
            return Err(GeneratorError::invalid_audio("audio has no channels"));
        }
        if samples.len() % n != 0 {
            return Err(GeneratorError::invalid_audio(format!(
                "{} interleaved samples do not divide into {} channels",
                samples.len(),
                n
            )));
        }
        let frames = samples.len() / n;
        let mut channels = vec![Vec::with_capacity(frames); n];
        for frame in samples.chunks_exact(n) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }
        Ok(Self { channels })
    }

    pub fn num_channels(&self) -> u16 {
        self.channels.len() as u16
    }

    /// Number of samples per channel.
    pub fn num_frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames() == 0
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Returns the samples interleaved frame by frame (L R L R ...).
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.num_frames() * self.channels.len());
        for i in 0..self.num_frames() {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
        out
    }

    /// Length in seconds at the given sample rate.
    pub fn duration_sec(&self, sample_rate: u32) -> f32 {
        crate::audio::samples_to_duration(self.num_frames(), sample_rate)
    }
}

/// Generated audio paired with the sample rate reported by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub audio: AudioTensor,
    pub sample_rate: u32,
}

impl GenerationResult {
    pub fn duration_sec(&self) -> f32 {
        self.audio.duration_sec(self.sample_rate)
    }
}
