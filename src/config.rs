//! Generator configuration module.
//!
//! Contains the runtime configuration: which model to load, where model files
//! live, sampling knobs for the ONNX backend and the output overwrite policy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::{
    validate_duration, GenerationParams, DEFAULT_DURATION_SEC,
};

/// Default pretrained model.
pub const DEFAULT_MODEL_NAME: &str = "facebook/musicgen-small";

/// What `save` does when the target file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Replace the existing file.
    #[default]
    Always,

    /// Fail with OUTPUT_EXISTS.
    Never,
}

impl OverwritePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverwritePolicy::Always => "always",
            OverwritePolicy::Never => "never",
        }
    }

    /// Parses a policy from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "always" | "overwrite" | "true" | "1" => Some(OverwritePolicy::Always),
            "never" | "keep" | "false" | "0" => Some(OverwritePolicy::Never),
            _ => None,
        }
    }
}

impl std::fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runtime configuration for the generator.
///
/// Usually built with [`GeneratorConfig::from_env`] and then refined by
/// command-line flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Pretrained model name or a directory containing an ONNX export.
    pub model_name: String,

    /// Duration used when `configure` is called without one.
    pub default_duration_sec: u32,

    /// Root directory for downloaded models.
    /// If None, uses the platform-specific default cache location.
    pub model_cache_path: Option<PathBuf>,

    /// Download missing model files on load.
    pub auto_download: bool,

    /// Number of threads for intra-op parallelism in ONNX Runtime.
    /// If None, uses ONNX Runtime's default.
    pub threads: Option<u32>,

    /// Sampling seed. If None, every load draws a random seed.
    pub seed: Option<u64>,

    /// Classifier-free guidance scale.
    pub guidance_scale: f32,

    /// Top-k sampling cutoff.
    pub top_k: usize,

    /// Behaviour when an output file already exists.
    pub overwrite: OverwritePolicy,
}

impl GeneratorConfig {
    /// Creates a new GeneratorConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a GeneratorConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `MUSICGEN_MODEL` - Pretrained model name or local directory
    /// - `MUSICGEN_DURATION` - Default duration in seconds
    /// - `MUSICGEN_MODEL_PATH` - Root directory for downloaded models
    /// - `MUSICGEN_AUTO_DOWNLOAD` - `0`/`false` disables downloads
    /// - `MUSICGEN_THREADS` - Number of threads for CPU execution
    /// - `MUSICGEN_SEED` - Sampling seed
    /// - `MUSICGEN_GUIDANCE` - Guidance scale (1.0-20.0)
    /// - `MUSICGEN_TOP_K` - Top-k cutoff
    /// - `MUSICGEN_OVERWRITE` - `always` or `never`
    ///
    /// Falls back to defaults for unset or invalid variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("MUSICGEN_MODEL") {
            if !name.trim().is_empty() {
                config.model_name = name.trim().to_string();
            }
        }

        if let Some(duration) = lookup("MUSICGEN_DURATION").and_then(|s| s.parse::<u32>().ok()) {
            if validate_duration(duration).is_ok() {
                config.default_duration_sec = duration;
            }
        }

        if let Some(path) = lookup("MUSICGEN_MODEL_PATH") {
            config.model_cache_path = Some(PathBuf::from(path));
        }

        if let Some(flag) = lookup("MUSICGEN_AUTO_DOWNLOAD") {
            config.auto_download = !matches!(flag.to_lowercase().as_str(), "0" | "false" | "no" | "off");
        }

        if let Some(threads) = lookup("MUSICGEN_THREADS").and_then(|s| s.parse::<u32>().ok()) {
            if threads > 0 {
                config.threads = Some(threads);
            }
        }

        if let Some(seed) = lookup("MUSICGEN_SEED").and_then(|s| s.parse::<u64>().ok()) {
            config.seed = Some(seed);
        }

        if let Some(guidance) = lookup("MUSICGEN_GUIDANCE").and_then(|s| s.parse::<f32>().ok()) {
            if (1.0..=20.0).contains(&guidance) {
                config.guidance_scale = guidance;
            }
        }

        if let Some(top_k) = lookup("MUSICGEN_TOP_K").and_then(|s| s.parse::<usize>().ok()) {
            if top_k > 0 {
                config.top_k = top_k;
            }
        }

        if let Some(policy) = lookup("MUSICGEN_OVERWRITE").and_then(|s| OverwritePolicy::parse(&s)) {
            config.overwrite = policy;
        }

        config
    }

    /// Returns the effective model cache path, using platform defaults if not specified.
    pub fn effective_model_cache_path(&self) -> PathBuf {
        if let Some(ref path) = self.model_cache_path {
            path.clone()
        } else {
            default_model_cache_path()
        }
    }

    /// Sampling parameters for the model, at the default duration.
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            duration_sec: self.default_duration_sec,
            seed: self.seed,
            guidance_scale: self.guidance_scale,
            top_k: self.top_k,
        }
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.model_name.trim().is_empty() {
            return Some("model_name must not be empty".to_string());
        }

        if validate_duration(self.default_duration_sec).is_err() {
            return Some(format!(
                "default_duration_sec out of range: {}",
                self.default_duration_sec
            ));
        }

        if let Some(threads) = self.threads {
            if threads == 0 {
                return Some("threads must be > 0".to_string());
            }
            if threads > 256 {
                return Some(format!("threads too high: {} (max 256)", threads));
            }
        }

        if !(1.0..=20.0).contains(&self.guidance_scale) {
            return Some(format!(
                "guidance_scale must be between 1 and 20, got {}",
                self.guidance_scale
            ));
        }

        if self.top_k == 0 {
            return Some("top_k must be > 0".to_string());
        }

        None
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            default_duration_sec: DEFAULT_DURATION_SEC,
            model_cache_path: None,
            auto_download: true,
            threads: None,
            seed: None,
            guidance_scale: params.guidance_scale,
            top_k: params.top_k,
            overwrite: OverwritePolicy::default(),
        }
    }
}

/// Returns the platform-specific default model storage path.
///
/// - macOS: ~/Library/Caches/music-generator/models
/// - Linux: ~/.cache/music-generator/models
/// - Windows: C:\Users\<user>\AppData\Local\music-generator\cache\models
fn default_model_cache_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "music-generator") {
        proj_dirs.cache_dir().join("models")
    } else {
        PathBuf::from("./models")
    }
}
