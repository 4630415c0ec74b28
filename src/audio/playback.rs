//! Playable audio for HTML front ends.
//!
//! A [`PlayableHandle`] embeds a WAV encoding of the audio so it can be shown
//! as an `<audio>` element without touching the filesystem.

use base64::Engine;

use crate::error::Result;
use crate::types::AudioTensor;

use super::wav::write_wav_to_buffer;

/// In-memory WAV ready for playback.
#[derive(Debug, Clone)]
pub struct PlayableHandle {
    wav: Vec<u8>,
    sample_rate: u32,
    duration_sec: f32,
}

impl PlayableHandle {
    /// Encodes `audio` at `sample_rate`.
    pub fn new(audio: &AudioTensor, sample_rate: u32) -> Result<Self> {
        Ok(Self {
            wav: write_wav_to_buffer(audio, sample_rate)?,
            sample_rate,
            duration_sec: audio.duration_sec(sample_rate),
        })
    }

    pub fn wav_bytes(&self) -> &[u8] {
        &self.wav
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_sec(&self) -> f32 {
        self.duration_sec
    }

    /// Returns a `data:audio/wav;base64,...` URI.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:audio/wav;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.wav)
        )
    }

    /// Returns an HTML5 audio control for the clip.
    pub fn to_html(&self) -> String {
        format!(
            "<audio controls=\"controls\">\n  <source src=\"{}\" type=\"audio/wav\" />\n  Your browser does not support the audio element.\n</audio>",
            self.to_data_uri()
        )
    }
}
