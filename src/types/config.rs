//! ModelConfig type for MusicGen architecture parameters.
//!
//! Holds the values the ONNX backend needs to shape its tensors, read from
//! the model's `config.json` or falling back to musicgen-small.

use serde::{Deserialize, Serialize};

/// Configuration parameters for the MusicGen model architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Token vocabulary size per codebook (2048 for MusicGen).
    pub vocab_size: u32,

    /// Number of decoder transformer layers.
    pub num_hidden_layers: u32,

    /// Number of attention heads in each layer.
    pub num_attention_heads: u32,

    /// Hidden dimension of the text encoder.
    pub d_model: u32,

    /// Key/value dimension per attention head.
    pub d_kv: u32,

    /// Number of output audio channels.
    pub audio_channels: u32,

    /// Output sample rate in Hz.
    pub sample_rate: u32,

    /// Decoder steps per second of audio.
    pub frame_rate: u32,

    /// Number of EnCodec codebooks.
    pub codebooks: u32,

    /// Padding token ID for the decoder.
    pub pad_token_id: i64,
}

impl ModelConfig {
    /// Configuration of the musicgen-small export on HuggingFace.
    pub fn musicgen_small() -> Self {
        Self {
            vocab_size: 2048,
            num_hidden_layers: 24,
            num_attention_heads: 16,
            d_model: 1024,
            d_kv: 64,
            audio_channels: 1,
            sample_rate: 32000,
            frame_rate: 50,
            codebooks: 4,
            pad_token_id: 2048,
        }
    }

    /// Builds a config from a HuggingFace `config.json` value.
    ///
    /// Missing keys keep their musicgen-small defaults. Returns None when the
    /// mandatory `decoder` section is absent.
    pub fn from_hf_json(json: &serde_json::Value) -> Option<Self> {
        let defaults = Self::musicgen_small();
        let decoder = json.get("decoder")?;
        let text_encoder = json.get("text_encoder");
        let audio_encoder = json.get("audio_encoder");

        let u32_at = |section: Option<&serde_json::Value>, key: &str, default: u32| {
            section
                .and_then(|s| s.get(key))
                .and_then(|v| v.as_u64())
                .map(|v| v as u32)
                .unwrap_or(default)
        };

        Some(Self {
            vocab_size: u32_at(Some(decoder), "vocab_size", defaults.vocab_size),
            num_hidden_layers: u32_at(Some(decoder), "num_hidden_layers", defaults.num_hidden_layers),
            num_attention_heads: u32_at(
                Some(decoder),
                "num_attention_heads",
                defaults.num_attention_heads,
            ),
            d_model: u32_at(text_encoder, "d_model", defaults.d_model),
            d_kv: u32_at(text_encoder, "d_kv", defaults.d_kv),
            audio_channels: u32_at(Some(decoder), "audio_channels", defaults.audio_channels),
            sample_rate: u32_at(audio_encoder, "sampling_rate", defaults.sample_rate),
            frame_rate: defaults.frame_rate,
            codebooks: u32_at(Some(decoder), "num_codebooks", defaults.codebooks),
            pad_token_id: decoder
                .get("pad_token_id")
                .and_then(|v| v.as_i64())
                .unwrap_or(defaults.pad_token_id),
        })
    }

    /// Validates the configuration for consistency.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.vocab_size == 0 {
            return Some("vocab_size must be > 0".to_string());
        }

        if self.num_hidden_layers == 0 {
            return Some("num_hidden_layers must be > 0".to_string());
        }

        if self.num_attention_heads == 0 {
            return Some("num_attention_heads must be > 0".to_string());
        }

        if self.sample_rate == 0 || self.frame_rate == 0 {
            return Some("sample_rate and frame_rate must be > 0".to_string());
        }

        if !(1..=2).contains(&self.audio_channels) {
            return Some(format!(
                "audio_channels must be 1 or 2, got {}",
                self.audio_channels
            ));
        }

        // The decoder's delay pattern is fixed at four codebooks.
        if self.codebooks != 4 {
            return Some(format!("codebooks must be 4, got {}", self.codebooks));
        }

        None
    }

    /// Number of decoder steps needed for `duration_sec` seconds of audio.
    pub fn tokens_for_duration(&self, duration_sec: u32) -> usize {
        duration_sec as usize * self.frame_rate as usize
    }

    /// Audio samples per channel produced by one decoder step.
    pub fn samples_per_token(&self) -> usize {
        (self.sample_rate / self.frame_rate) as usize
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::musicgen_small()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn musicgen_small_config() {
        let config = ModelConfig::musicgen_small();
        assert_eq!(config.vocab_size, 2048);
        assert_eq!(config.sample_rate, 32000);
        assert_eq!(config.codebooks, 4);
        assert!(config.validate().is_none());
    }

    #[test]
    fn frame_math() {
        let config = ModelConfig::musicgen_small();
        assert_eq!(config.tokens_for_duration(10), 500);
        assert_eq!(config.samples_per_token(), 640);
    }

    #[test]
    fn config_validation() {
        let mut config = ModelConfig::musicgen_small();
        config.codebooks = 8;
        assert!(config.validate().is_some());

        let mut config = ModelConfig::musicgen_small();
        config.audio_channels = 0;
        assert!(config.validate().is_some());
    }

    #[test]
    fn reads_hf_config() {
        let json = serde_json::json!({
            "decoder": {"num_hidden_layers": 48, "num_attention_heads": 32, "pad_token_id": 2048},
            "text_encoder": {"d_model": 768},
            "audio_encoder": {"sampling_rate": 32000}
        });
        let config = ModelConfig::from_hf_json(&json).unwrap();
        assert_eq!(config.num_hidden_layers, 48);
        assert_eq!(config.num_attention_heads, 32);
        assert_eq!(config.d_model, 768);
        assert_eq!(config.vocab_size, 2048);
    }

    #[test]
    fn hf_config_requires_decoder() {
        let json = serde_json::json!({"text_encoder": {}});
        assert!(ModelConfig::from_hf_json(&json).is_none());
    }
}
