//! Error types for the music generator.
//!
//! Every failure surfaced by the generator, the model backend and the drivers
//! carries an [`ErrorCode`] so callers can branch on the kind of failure while
//! still getting a readable message with a recovery hint.

use std::fmt;

/// Error codes identifying the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// An operation that needs a loaded model ran before `load`.
    NotLoaded,

    /// The model name is neither a known pretrained model nor a local directory.
    UnknownModel,

    /// Model files are missing from the resolved model directory.
    ModelNotFound,

    /// Model files exist but could not be loaded.
    /// Trigger: corrupt file, wrong format, or OOM during session creation.
    ModelLoadFailed,

    /// Fetching model files from the remote repository failed.
    ModelDownloadFailed,

    /// The model capability failed while generating.
    GenerationFailed,

    /// A generation is already running on this session.
    GenerationInProgress,

    /// Requested duration is outside the supported range.
    InvalidDuration,

    /// Prompt is blank or too long.
    InvalidPrompt,

    /// Audio buffer has an inconsistent shape.
    InvalidAudio,

    /// Reading or writing an audio file failed.
    AudioIo,

    /// Output file already exists and overwriting is disabled.
    OutputExists,

    /// Configuration from the environment or command line is invalid.
    InvalidConfig,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotLoaded => "NOT_LOADED",
            ErrorCode::UnknownModel => "UNKNOWN_MODEL",
            ErrorCode::ModelNotFound => "MODEL_NOT_FOUND",
            ErrorCode::ModelLoadFailed => "MODEL_LOAD_FAILED",
            ErrorCode::ModelDownloadFailed => "MODEL_DOWNLOAD_FAILED",
            ErrorCode::GenerationFailed => "GENERATION_FAILED",
            ErrorCode::GenerationInProgress => "GENERATION_IN_PROGRESS",
            ErrorCode::InvalidDuration => "INVALID_DURATION",
            ErrorCode::InvalidPrompt => "INVALID_PROMPT",
            ErrorCode::InvalidAudio => "INVALID_AUDIO",
            ErrorCode::AudioIo => "AUDIO_IO",
            ErrorCode::OutputExists => "OUTPUT_EXISTS",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::NotLoaded => "Model not loaded",
            ErrorCode::UnknownModel => "Model name is not a known pretrained model or local directory",
            ErrorCode::ModelNotFound => "Model files not found at expected path",
            ErrorCode::ModelLoadFailed => "Failed to load model into memory",
            ErrorCode::ModelDownloadFailed => "Failed to download model from remote source",
            ErrorCode::GenerationFailed => "Model failed during generation",
            ErrorCode::GenerationInProgress => "A generation is already running",
            ErrorCode::InvalidDuration => "Duration must be between 1 and 120 seconds",
            ErrorCode::InvalidPrompt => "Prompt must be non-blank and at most 1000 characters",
            ErrorCode::InvalidAudio => "Audio channels must be non-empty and equally long",
            ErrorCode::AudioIo => "Failed to read or write audio file",
            ErrorCode::OutputExists => "Output file already exists",
            ErrorCode::InvalidConfig => "Configuration is invalid",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::NotLoaded => "Call load() before configure() or generate()",
            ErrorCode::UnknownModel => {
                "Use a known model such as 'facebook/musicgen-small', \
                 or pass a directory containing the ONNX export"
            }
            ErrorCode::ModelNotFound => {
                "Enable MUSICGEN_AUTO_DOWNLOAD to fetch models automatically, \
                 or download them from https://huggingface.co/gabotechs/music_gen"
            }
            ErrorCode::ModelLoadFailed => {
                "Check available memory (4GB+ recommended), verify model files are not corrupted, \
                 or delete the model cache and re-download"
            }
            ErrorCode::ModelDownloadFailed => {
                "Check internet connection and disk space (500MB+ required), \
                 or try again later if HuggingFace is unavailable"
            }
            ErrorCode::GenerationFailed => {
                "Try a shorter duration, or set MUSICGEN_THREADS to reduce memory pressure"
            }
            ErrorCode::GenerationInProgress => "Wait for the current generation to finish",
            ErrorCode::InvalidDuration => "Specify a duration between 1 and 120 seconds (e.g., --duration 8)",
            ErrorCode::InvalidPrompt => {
                "Provide a descriptive prompt between 1 and 1000 characters \
                 (e.g., 'upbeat rock song with guitar solo')"
            }
            ErrorCode::InvalidAudio => "Make sure every channel holds the same number of samples",
            ErrorCode::AudioIo => "Check that the output directory exists and is writable",
            ErrorCode::OutputExists => {
                "Choose another output path, or set MUSICGEN_OVERWRITE=always"
            }
            ErrorCode::InvalidConfig => "Check the MUSICGEN_* environment variables and flags",
        }
    }

    /// Returns true for the codes raised while loading a model.
    pub fn is_model_load(&self) -> bool {
        matches!(
            self,
            ErrorCode::UnknownModel
                | ErrorCode::ModelNotFound
                | ErrorCode::ModelLoadFailed
                | ErrorCode::ModelDownloadFailed
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for generator operations.
#[derive(Debug)]
pub struct GeneratorError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GeneratorError {
    /// Creates a new GeneratorError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new GeneratorError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn not_loaded() -> Self {
        Self::new(
            ErrorCode::NotLoaded,
            "Model not loaded. Call load() first",
        )
    }

    pub fn unknown_model(name: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UnknownModel,
            format!("Unknown model: {}", name.into()),
        )
    }

    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelNotFound,
            format!("Model files not found at: {}", path.into()),
        )
    }

    pub fn model_load_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelLoadFailed,
            format!("Failed to load model: {}", reason.into()),
        )
    }

    pub fn model_download_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelDownloadFailed,
            format!("Failed to download model: {}", reason.into()),
        )
    }

    pub fn generation_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GenerationFailed,
            format!("Generation failed: {}", reason.into()),
        )
    }

    pub fn generation_in_progress() -> Self {
        Self::new(
            ErrorCode::GenerationInProgress,
            "A generation is already running on this session",
        )
    }

    pub fn invalid_duration(duration: u32) -> Self {
        Self::new(
            ErrorCode::InvalidDuration,
            format!(
                "Invalid duration: {} seconds (must be between 1 and 120)",
                duration
            ),
        )
    }

    /// Creates an INVALID_PROMPT error for blank prompts.
    pub fn empty_prompt() -> Self {
        Self::new(ErrorCode::InvalidPrompt, "Prompt cannot be empty")
    }

    /// Creates an INVALID_PROMPT error for prompts that are too long.
    pub fn prompt_too_long(len: usize) -> Self {
        Self::new(
            ErrorCode::InvalidPrompt,
            format!("Prompt too long: {} characters (maximum 1000)", len),
        )
    }

    pub fn invalid_audio(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAudio, reason.into())
    }

    /// Wraps a hound error raised while reading or writing `path`.
    pub fn audio_io(path: &std::path::Path, source: hound::Error) -> Self {
        Self::with_source(
            ErrorCode::AudioIo,
            format!("Audio I/O failed for {}: {}", path.display(), source),
            source,
        )
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidConfig,
            format!("Invalid configuration: {}", reason.into()),
        )
    }

    pub fn output_exists(path: &std::path::Path) -> Self {
        Self::new(
            ErrorCode::OutputExists,
            format!("Refusing to overwrite {}", path.display()),
        )
    }
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for GeneratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using GeneratorError.
pub type Result<T> = std::result::Result<T, GeneratorError>;
