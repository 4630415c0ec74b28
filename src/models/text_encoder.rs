//! Prompt encoder: tokenizer plus T5 text encoder.

use std::path::Path;

use ort::session::Session;
use ort::value::{DynValue, Tensor};
use tokenizers::Tokenizer;

use crate::error::{GeneratorError, Result};

use super::loader::build_session;

/// Encoder output consumed by the decoder.
pub struct EncodedPrompt {
    /// `last_hidden_state`, shape `[1, tokens, d_model]`.
    pub hidden_states: DynValue,
    /// All-ones mask, shape `[1, tokens]`.
    pub attention_mask: DynValue,
    /// Number of prompt tokens.
    pub token_count: usize,
}

/// MusicGen text encoder combining tokenizer and T5 encoder.
pub struct MusicGenTextEncoder {
    tokenizer: Tokenizer,
    text_encoder: Session,
}

impl MusicGenTextEncoder {
    /// Loads `tokenizer.json` and `text_encoder.onnx` from the given directory.
    pub fn load(model_dir: &Path, threads: Option<u32>) -> Result<Self> {
        let mut tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json")).map_err(|e| {
            GeneratorError::model_load_failed(format!("Failed to load tokenizer: {}", e))
        })?;

        tokenizer
            .with_padding(None)
            .with_truncation(None)
            .map_err(|e| {
                GeneratorError::model_load_failed(format!("Failed to configure tokenizer: {}", e))
            })?;

        let text_encoder = build_session(&model_dir.join("text_encoder.onnx"), threads)?;

        Ok(Self {
            tokenizer,
            text_encoder,
        })
    }

    /// Tokenizes a prompt into i64 token IDs.
    fn tokenize(&self, text: &str) -> Result<Vec<i64>> {
        let encoding = self.tokenizer.encode(text, true).map_err(|e| {
            GeneratorError::generation_failed(format!("Tokenization failed: {}", e))
        })?;
        Ok(encoding.get_ids().iter().map(|&id| id as i64).collect())
    }

    /// Encodes text into hidden states and an attention mask.
    pub fn encode(&mut self, text: &str) -> Result<EncodedPrompt> {
        let tokens = self.tokenize(text)?;
        let token_count = tokens.len();
        if token_count == 0 {
            return Err(GeneratorError::generation_failed("Prompt produced no tokens"));
        }

        let input_ids = Tensor::from_array(([1, token_count], tokens)).map_err(|e| {
            GeneratorError::generation_failed(format!("Failed to create input tensor: {}", e))
        })?;
        let attention_mask = ones_mask(token_count)?;

        let mut output = self
            .text_encoder
            .run(ort::inputs![input_ids, attention_mask])
            .map_err(|e| {
                GeneratorError::generation_failed(format!("Text encoder inference failed: {}", e))
            })?;

        let hidden_states = output.remove("last_hidden_state").ok_or_else(|| {
            GeneratorError::generation_failed("last_hidden_state not found in output")
        })?;

        Ok(EncodedPrompt {
            hidden_states,
            attention_mask: ones_mask(token_count)?.into_dyn(),
            token_count,
        })
    }
}

fn ones_mask(len: usize) -> Result<Tensor<i64>> {
    Tensor::from_array(([1, len], vec![1i64; len])).map_err(|e| {
        GeneratorError::generation_failed(format!("Failed to create attention mask: {}", e))
    })
}
