//! Model loader for MusicGen ONNX exports.
//!
//! Resolves a model name to a directory, makes sure the files are there and
//! creates the ONNX Runtime sessions.

use std::path::{Path, PathBuf};

use ort::session::Session;

use crate::config::GeneratorConfig;
use crate::error::{GeneratorError, Result};
use crate::types::{GenerationParams, ModelConfig};

use super::audio_codec::MusicGenAudioCodec;
use super::decoder::MusicGenDecoder;
use super::downloader::ensure_models;
use super::musicgen::OnnxMusicGen;
use super::registry::{self, PretrainedModel};
use super::text_encoder::MusicGenTextEncoder;
use super::{ModelLoader, MusicModel};

/// Files that must exist in a model directory.
pub const REQUIRED_MODEL_FILES: &[&str] = &[
    "tokenizer.json",
    "text_encoder.onnx",
    "decoder_model.onnx",
    "decoder_with_past_model.onnx",
    "encodec_decode.onnx",
];

/// Files that are used when present.
pub const OPTIONAL_MODEL_FILES: &[&str] = &["config.json"];

/// Complete set of loaded MusicGen sessions.
pub struct MusicGenModels {
    /// Text encoder for converting prompts to embeddings.
    pub text_encoder: MusicGenTextEncoder,
    /// Decoder for autoregressive token generation.
    pub decoder: MusicGenDecoder,
    /// Audio codec for converting tokens to audio samples.
    pub audio_codec: MusicGenAudioCodec,
    /// Model configuration.
    pub config: ModelConfig,
    /// Model version string.
    pub version: String,
}

/// Returns the required files missing from `model_dir`.
pub fn missing_model_files(model_dir: &Path) -> Vec<&'static str> {
    REQUIRED_MODEL_FILES
        .iter()
        .copied()
        .filter(|file| !model_dir.join(file).exists())
        .collect()
}

/// Checks if all required model files exist in the directory.
///
/// Returns Ok(()) if all files exist, or an error listing missing files.
pub fn check_models(model_dir: &Path) -> Result<()> {
    let missing = missing_model_files(model_dir);

    if missing.is_empty() {
        Ok(())
    } else {
        Err(GeneratorError::model_not_found(format!(
            "{} (missing: {})",
            model_dir.display(),
            missing.join(", ")
        )))
    }
}

/// Creates an ONNX Runtime session for `path`.
pub(crate) fn build_session(path: &Path, threads: Option<u32>) -> Result<Session> {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut builder = Session::builder()
        .map_err(|e| GeneratorError::model_load_failed(format!("Failed to create session: {}", e)))?;

    if let Some(threads) = threads {
        builder = builder.with_intra_threads(threads as usize).map_err(|e| {
            GeneratorError::model_load_failed(format!("Failed to set thread count: {}", e))
        })?;
    }

    builder
        .commit_from_file(path)
        .map_err(|e| GeneratorError::model_load_failed(format!("Failed to load {}: {}", file, e)))
}

/// Loads all MusicGen sessions from a directory.
///
/// The directory should contain:
/// - `tokenizer.json` - HuggingFace tokenizer
/// - `text_encoder.onnx` - T5 text encoder
/// - `decoder_model.onnx` - First pass decoder
/// - `decoder_with_past_model.onnx` - Decoder with KV cache
/// - `encodec_decode.onnx` - EnCodec audio decoder
///
/// Optionally:
/// - `config.json` - Model configuration (uses defaults if not present)
pub fn load_sessions(model_dir: &Path, threads: Option<u32>) -> Result<MusicGenModels> {
    check_models(model_dir)?;

    let config = load_or_default_config(model_dir)?;
    if let Some(problem) = config.validate() {
        return Err(GeneratorError::model_load_failed(format!(
            "Unsupported model config: {}",
            problem
        )));
    }

    tracing::info!("loading text encoder");
    let text_encoder = MusicGenTextEncoder::load(model_dir, threads)?;

    tracing::info!("loading decoder models");
    let decoder = MusicGenDecoder::load(model_dir, config.clone(), threads)?;

    tracing::info!("loading audio codec");
    let audio_codec = MusicGenAudioCodec::load(model_dir, config.audio_channels, threads)?;

    let version = detect_model_version(model_dir);
    tracing::info!(version = %version, sample_rate = config.sample_rate, "all models loaded");

    Ok(MusicGenModels {
        text_encoder,
        decoder,
        audio_codec,
        config,
        version,
    })
}

/// Loads model configuration from config.json or uses defaults.
fn load_or_default_config(model_dir: &Path) -> Result<ModelConfig> {
    let config_path = model_dir.join("config.json");

    if !config_path.exists() {
        return Ok(ModelConfig::musicgen_small());
    }

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        GeneratorError::model_load_failed(format!("Failed to read config.json: {}", e))
    })?;

    let json: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
        GeneratorError::model_load_failed(format!("Failed to parse config.json: {}", e))
    })?;

    ModelConfig::from_hf_json(&json).ok_or_else(|| {
        GeneratorError::model_load_failed("config.json missing 'decoder' section")
    })
}

/// Detects model version from directory name.
fn detect_model_version(model_dir: &Path) -> String {
    let dir_name = model_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_lowercase();

    let size = if dir_name.contains("medium") {
        "medium"
    } else if dir_name.contains("large") {
        "large"
    } else {
        "small"
    };

    if dir_name.contains("fp32") {
        format!("musicgen-{}-fp32-v1", size)
    } else {
        format!("musicgen-{}-fp16-v1", size)
    }
}

/// Where a model name points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// A directory holding an ONNX export.
    Directory(PathBuf),
    /// A registry entry, cached under the given directory.
    Pretrained(&'static PretrainedModel, PathBuf),
}

impl ModelSource {
    pub fn dir(&self) -> &Path {
        match self {
            ModelSource::Directory(dir) | ModelSource::Pretrained(_, dir) => dir,
        }
    }

    /// Version string reported by the loaded model. Registry entries carry
    /// their own; directories fall back to name detection.
    pub fn version(&self) -> String {
        match self {
            ModelSource::Directory(dir) => detect_model_version(dir),
            ModelSource::Pretrained(model, _) => model.version.to_string(),
        }
    }
}

/// Loads MusicGen ONNX models by registry name or directory path.
#[derive(Debug, Clone)]
pub struct OnnxModelLoader {
    cache_root: PathBuf,
    auto_download: bool,
    threads: Option<u32>,
    params: GenerationParams,
}

impl OnnxModelLoader {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            cache_root: config.effective_model_cache_path(),
            auto_download: config.auto_download,
            threads: config.threads,
            params: config.generation_params(),
        }
    }

    /// Resolves a model name.
    ///
    /// Existing directories win over registry names so a local export can
    /// shadow a pretrained one.
    pub fn resolve(&self, model_name: &str) -> Result<ModelSource> {
        let as_path = Path::new(model_name);
        if as_path.is_dir() {
            return Ok(ModelSource::Directory(as_path.to_path_buf()));
        }

        registry::lookup(model_name)
            .map(|model| ModelSource::Pretrained(model, self.cache_root.join(model.cache_dir)))
            .ok_or_else(|| {
                GeneratorError::unknown_model(format!(
                    "{} (known models: {})",
                    model_name,
                    registry::known_names().join(", ")
                ))
            })
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load(&self, model_name: &str) -> Result<Box<dyn MusicModel>> {
        let source = self.resolve(model_name)?;
        if let ModelSource::Pretrained(model, dir) = &source {
            if self.auto_download {
                ensure_models(dir, model)?;
            }
        }

        tracing::info!(model = model_name, dir = %source.dir().display(), "loading model");
        let mut models = load_sessions(source.dir(), self.threads)?;
        models.version = source.version();
        Ok(Box::new(OnnxMusicGen::new(models, self.params.clone())))
    }
}
