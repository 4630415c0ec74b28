//! Generation lifecycle: load, configure, generate, save.
//!
//! [`MusicGenerator`] owns at most one loaded model. `configure` and
//! `generate` fail with `NOT_LOADED` until `load` has succeeded.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::audio::{write_wav, PlayableHandle};
use crate::config::{GeneratorConfig, OverwritePolicy};
use crate::error::{ErrorCode, GeneratorError, Result};
use crate::models::{ModelLoader, MusicModel, OnnxModelLoader};
use crate::types::{
    validate_duration, validate_prompt, GenerationParams, GenerationRequest, GenerationResult,
};

/// Observable lifecycle of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorPhase {
    /// No model loaded.
    Unloaded,
    /// Model loaded, parameters left at the model's defaults.
    Loaded,
    /// Model loaded and `configure` applied.
    Configured,
}

struct LoadedModel {
    handle: Box<dyn MusicModel>,
    sample_rate: u32,
    configured_duration: Option<u32>,
}

/// A file written by [`MusicGenerator::save`].
#[derive(Debug, Clone, PartialEq)]
pub struct SavedClip {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
    pub duration_sec: f32,
}

/// Outcome of [`MusicGenerator::generate_to_file`].
#[derive(Debug, Clone, PartialEq)]
pub struct FileGeneration {
    pub clip: SavedClip,
    /// Time spent in the model, excluding load and save.
    pub elapsed: Duration,
}

/// Text-to-music generator around a loadable model.
pub struct MusicGenerator {
    model_name: String,
    duration_sec: u32,
    params: GenerationParams,
    overwrite: OverwritePolicy,
    loader: Box<dyn ModelLoader>,
    model: Option<LoadedModel>,
}

impl std::fmt::Debug for MusicGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MusicGenerator")
            .field("model_name", &self.model_name)
            .field("duration_sec", &self.duration_sec)
            .field("phase", &self.phase())
            .finish()
    }
}

impl MusicGenerator {
    /// Creates a generator backed by the ONNX loader.
    pub fn new(config: &GeneratorConfig) -> Self {
        Self::with_loader(config, Box::new(OnnxModelLoader::new(config)))
    }

    /// Creates a generator with a custom model loader.
    pub fn with_loader(config: &GeneratorConfig, loader: Box<dyn ModelLoader>) -> Self {
        Self {
            model_name: config.model_name.clone(),
            duration_sec: config.default_duration_sec,
            params: config.generation_params(),
            overwrite: config.overwrite,
            loader,
            model: None,
        }
    }

    pub fn with_overwrite_policy(mut self, overwrite: OverwritePolicy) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn phase(&self) -> GeneratorPhase {
        match &self.model {
            None => GeneratorPhase::Unloaded,
            Some(m) if m.configured_duration.is_some() => GeneratorPhase::Configured,
            Some(_) => GeneratorPhase::Loaded,
        }
    }

    /// Native sample rate of the loaded model.
    pub fn sample_rate(&self) -> Option<u32> {
        self.model.as_ref().map(|m| m.sample_rate)
    }

    pub fn configured_duration(&self) -> Option<u32> {
        self.model.as_ref().and_then(|m| m.configured_duration)
    }

    /// Loads the model. Replaces any model loaded before.
    ///
    /// May block for a long time while files are downloaded and sessions
    /// are built.
    pub fn load(&mut self) -> Result<()> {
        tracing::info!(model = %self.model_name, "loading model");
        let handle = self.loader.load(&self.model_name)?;
        let sample_rate = handle.sample_rate();
        if sample_rate == 0 {
            return Err(GeneratorError::model_load_failed(
                "model reported a sample rate of 0",
            ));
        }
        tracing::info!(version = handle.version(), sample_rate, "model ready");

        self.model = Some(LoadedModel {
            handle,
            sample_rate,
            configured_duration: None,
        });
        Ok(())
    }

    /// Sets the generation duration. `None` uses the instance default.
    pub fn configure(&mut self, duration_sec: Option<u32>) -> Result<()> {
        let model = self.model.as_mut().ok_or_else(GeneratorError::not_loaded)?;
        let duration = validate_duration(duration_sec.unwrap_or(self.duration_sec))?;

        model.handle.set_params(self.params.with_duration(duration))?;
        model.configured_duration = Some(duration);
        tracing::debug!(duration, "generation parameters set");
        Ok(())
    }

    /// Generates audio for one prompt with the configured parameters.
    pub fn generate(&mut self, prompt: &str) -> Result<GenerationResult> {
        let model = self.model.as_mut().ok_or_else(GeneratorError::not_loaded)?;
        let prompt = validate_prompt(prompt)?;
        run_model(model, prompt)
    }

    /// Generates audio for a request, applying its duration first when it
    /// differs from the configured one.
    pub fn generate_request(&mut self, request: &GenerationRequest) -> Result<GenerationResult> {
        if self.model.is_none() {
            return Err(GeneratorError::not_loaded());
        }
        let prompt = validate_prompt(request.prompt())?;
        if self.configured_duration() != Some(request.duration_sec()) {
            self.configure(Some(request.duration_sec()))?;
        }
        let model = self.model.as_mut().ok_or_else(GeneratorError::not_loaded)?;
        run_model(model, prompt)
    }

    /// Generates one prompt into one WAV file.
    ///
    /// The prompt is checked before anything is loaded. Loads and configures
    /// the model when needed and creates the output's parent directory.
    pub fn generate_to_file(&mut self, prompt: &str, path: &Path) -> Result<FileGeneration> {
        let prompt = validate_prompt(prompt)?;
        if self.model.is_none() {
            self.load()?;
        }
        if self.configured_duration().is_none() {
            self.configure(None)?;
        }

        let start = Instant::now();
        let result = self.generate(prompt)?;
        let elapsed = start.elapsed();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                GeneratorError::with_source(
                    ErrorCode::AudioIo,
                    format!("Failed to create output directory {}", parent.display()),
                    e,
                )
            })?;
        }
        let clip = self.save(&result, path, None)?;
        Ok(FileGeneration { clip, elapsed })
    }

    /// Writes a result to a WAV file.
    ///
    /// `sample_rate` overrides the rate written to the header; samples are
    /// not resampled.
    pub fn save(
        &self,
        result: &GenerationResult,
        path: &Path,
        sample_rate: Option<u32>,
    ) -> Result<SavedClip> {
        let rate = sample_rate.unwrap_or(result.sample_rate);
        if rate == 0 {
            return Err(GeneratorError::invalid_audio("sample rate must be positive"));
        }
        if self.overwrite == OverwritePolicy::Never && path.exists() {
            return Err(GeneratorError::output_exists(path));
        }

        write_wav(&result.audio, path, rate)?;

        let clip = SavedClip {
            path: path.to_path_buf(),
            sample_rate: rate,
            channels: result.audio.num_channels(),
            frames: result.audio.num_frames(),
            duration_sec: result.audio.duration_sec(rate),
        };
        tracing::debug!(path = %path.display(), seconds = clip.duration_sec, "saved");
        Ok(clip)
    }

    /// Wraps a result for in-page playback.
    pub fn play(&self, result: &GenerationResult, sample_rate: Option<u32>) -> Result<PlayableHandle> {
        let rate = sample_rate.unwrap_or(result.sample_rate);
        if rate == 0 {
            return Err(GeneratorError::invalid_audio("sample rate must be positive"));
        }
        PlayableHandle::new(&result.audio, rate)
    }
}

fn run_model(model: &mut LoadedModel, prompt: &str) -> Result<GenerationResult> {
    let outputs = model.handle.generate(&[prompt]).map_err(|e| {
        if e.code == ErrorCode::GenerationFailed {
            e
        } else {
            GeneratorError::with_source(ErrorCode::GenerationFailed, e.message.clone(), e)
        }
    })?;

    let audio = outputs
        .into_iter()
        .next()
        .ok_or_else(|| GeneratorError::generation_failed("model returned no audio"))?;

    Ok(GenerationResult {
        audio,
        sample_rate: model.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::read_wav;
    use crate::models::testing::FakeLoader;
    use tempfile::tempdir;

    fn generator(loader: FakeLoader) -> MusicGenerator {
        MusicGenerator::with_loader(&GeneratorConfig::default(), Box::new(loader))
    }

    fn loaded(loader: FakeLoader) -> MusicGenerator {
        let mut gen = generator(loader);
        gen.load().unwrap();
        gen
    }

    #[test]
    fn starts_unloaded() {
        let gen = generator(FakeLoader::default());
        assert_eq!(gen.phase(), GeneratorPhase::Unloaded);
        assert_eq!(gen.sample_rate(), None);
        assert_eq!(gen.model_name(), "facebook/musicgen-small");
    }

    #[test]
    fn generate_before_load_is_not_loaded() {
        let loader = FakeLoader::default();
        let calls = loader.calls();
        let mut gen = generator(loader);
        for prompt in ["classic rock song", "", "   "] {
            let err = gen.generate(prompt).unwrap_err();
            assert_eq!(err.code, ErrorCode::NotLoaded);
        }
        assert!(calls.lock().unwrap().prompts.is_empty());
    }

    #[test]
    fn configure_before_load_is_not_loaded() {
        let mut gen = generator(FakeLoader::default());
        assert_eq!(gen.configure(Some(8)).unwrap_err().code, ErrorCode::NotLoaded);
        assert_eq!(gen.configure(None).unwrap_err().code, ErrorCode::NotLoaded);
    }

    #[test]
    fn unknown_model_is_model_load_error() {
        let config = GeneratorConfig {
            model_name: "facebook/musicgen-huge".to_string(),
            ..GeneratorConfig::default()
        };
        let mut gen = MusicGenerator::with_loader(&config, Box::new(FakeLoader::default()));
        let err = gen.load().unwrap_err();
        assert!(err.code.is_model_load());
        assert_eq!(gen.phase(), GeneratorPhase::Unloaded);
    }

    #[test]
    fn load_configure_generate() {
        let loader = FakeLoader::default();
        let calls = loader.calls();
        let mut gen = loaded(loader);
        assert_eq!(gen.phase(), GeneratorPhase::Loaded);

        gen.configure(Some(2)).unwrap();
        assert_eq!(gen.phase(), GeneratorPhase::Configured);
        assert_eq!(gen.configured_duration(), Some(2));

        let result = gen.generate("classic rock song").unwrap();
        assert_eq!(result.sample_rate, gen.sample_rate().unwrap());
        assert_eq!(result.audio.num_frames(), 2 * 3200);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.loads, vec!["facebook/musicgen-small"]);
        assert_eq!(calls.params.last().unwrap().duration_sec, 2);
        assert_eq!(calls.prompts, vec!["classic rock song"]);
    }

    #[test]
    fn configure_without_duration_uses_default() {
        let mut gen = loaded(FakeLoader::default());
        gen.configure(None).unwrap();
        assert_eq!(gen.configured_duration(), Some(8));
    }

    #[test]
    fn configure_rejects_bad_duration() {
        let mut gen = loaded(FakeLoader::default());
        assert_eq!(gen.configure(Some(0)).unwrap_err().code, ErrorCode::InvalidDuration);
        assert_eq!(gen.configure(Some(121)).unwrap_err().code, ErrorCode::InvalidDuration);
        assert_eq!(gen.phase(), GeneratorPhase::Loaded);
    }

    #[test]
    fn blank_prompt_never_reaches_model() {
        let loader = FakeLoader::default();
        let calls = loader.calls();
        let mut gen = loaded(loader);
        gen.configure(Some(1)).unwrap();

        let err = gen.generate("  ").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPrompt);
        assert!(calls.lock().unwrap().prompts.is_empty());
    }

    #[test]
    fn model_failure_is_generation_failed() {
        let mut gen = loaded(FakeLoader::failing_on(&[1]));
        gen.configure(Some(1)).unwrap();
        let err = gen.generate("jazz").unwrap_err();
        assert_eq!(err.code, ErrorCode::GenerationFailed);

        // The generator stays usable.
        assert!(gen.generate("jazz").is_ok());
    }

    #[test]
    fn empty_model_output_is_generation_failed() {
        let loader = FakeLoader {
            empty_output: true,
            ..FakeLoader::default()
        };
        let mut gen = loaded(loader);
        let err = gen.generate("jazz").unwrap_err();
        assert_eq!(err.code, ErrorCode::GenerationFailed);
    }

    #[test]
    fn generate_request_applies_duration() {
        let loader = FakeLoader::default();
        let calls = loader.calls();
        let mut gen = loaded(loader);
        gen.configure(Some(1)).unwrap();

        let request = GenerationRequest::new("blues", 3).unwrap();
        let result = gen.generate_request(&request).unwrap();
        assert_eq!(result.audio.num_frames(), 3 * 3200);
        assert_eq!(gen.configured_duration(), Some(3));

        gen.generate_request(&request).unwrap();
        assert_eq!(calls.lock().unwrap().params.len(), 2);
    }

    #[test]
    fn deserialized_blank_request_never_reaches_model() {
        let loader = FakeLoader::default();
        let calls = loader.calls();
        let _gen = loaded(loader);

        let err = serde_json::from_str::<GenerationRequest>(r#"{"prompt":"   ","duration_sec":1}"#)
            .unwrap_err();
        assert!(err.to_string().contains("INVALID_PROMPT"));
        assert!(calls.lock().unwrap().prompts.is_empty());
    }

    #[test]
    fn generate_to_file_checks_prompt_before_load() {
        let dir = tempdir().unwrap();
        let loader = FakeLoader::default();
        let calls = loader.calls();
        let mut gen = generator(loader);

        let err = gen.generate_to_file("   ", &dir.path().join("out.wav")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPrompt);
        assert_eq!(gen.phase(), GeneratorPhase::Unloaded);
        let calls = calls.lock().unwrap();
        assert!(calls.loads.is_empty());
        assert!(calls.prompts.is_empty());
    }

    #[test]
    fn generate_to_file_loads_and_writes() {
        let dir = tempdir().unwrap();
        let loader = FakeLoader::default();
        let calls = loader.calls();
        let config = GeneratorConfig {
            default_duration_sec: 2,
            ..GeneratorConfig::default()
        };
        let mut gen = MusicGenerator::with_loader(&config, Box::new(loader));

        let path = dir.path().join("nested").join("generated_music.wav");
        let run = gen.generate_to_file(" classic rock song ", &path).unwrap();
        assert_eq!(run.clip.path, path);
        assert_eq!(run.clip.frames, 2 * 3200);
        assert_eq!(gen.phase(), GeneratorPhase::Configured);

        let (audio, _) = read_wav(&path).unwrap();
        assert_eq!(audio.num_frames(), 2 * 3200);

        gen.generate_to_file("jazz", &path).unwrap();
        let calls = calls.lock().unwrap();
        assert_eq!(calls.loads.len(), 1);
        assert_eq!(calls.prompts, vec!["classic rock song", "jazz"]);
    }

    #[test]
    fn save_round_trip_is_bit_identical() {
        let dir = tempdir().unwrap();
        let loader = FakeLoader {
            channels: 2,
            ..FakeLoader::default()
        };
        let mut gen = loaded(loader);
        gen.configure(Some(1)).unwrap();
        let result = gen.generate("reggae").unwrap();

        let path = dir.path().join("clip.wav");
        let clip = gen.save(&result, &path, None).unwrap();
        assert_eq!(clip.channels, 2);
        assert_eq!(clip.sample_rate, result.sample_rate);

        let (audio, rate) = read_wav(&path).unwrap();
        assert_eq!(rate, result.sample_rate);
        assert_eq!(audio, result.audio);
    }

    #[test]
    fn save_with_rate_override() {
        let dir = tempdir().unwrap();
        let mut gen = loaded(FakeLoader::default());
        gen.configure(Some(1)).unwrap();
        let result = gen.generate("country").unwrap();

        let path = dir.path().join("clip.wav");
        let clip = gen.save(&result, &path, Some(6400)).unwrap();
        assert_eq!(clip.sample_rate, 6400);
        assert!((clip.duration_sec - 0.5).abs() < 1e-6);
        assert_eq!(read_wav(&path).unwrap().1, 6400);
    }

    #[test]
    fn save_to_unwritable_path_is_audio_io() {
        let dir = tempdir().unwrap();
        let mut gen = loaded(FakeLoader::default());
        gen.configure(Some(1)).unwrap();
        let result = gen.generate("rock").unwrap();

        let path = dir.path().join("missing").join("clip.wav");
        assert_eq!(gen.save(&result, &path, None).unwrap_err().code, ErrorCode::AudioIo);
    }

    #[test]
    fn overwrite_policy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let mut gen = loaded(FakeLoader::default());
        gen.configure(Some(1)).unwrap();
        let result = gen.generate("rock").unwrap();

        gen.save(&result, &path, None).unwrap();
        gen.save(&result, &path, None).unwrap();

        let gen = gen.with_overwrite_policy(OverwritePolicy::Never);
        let err = gen.save(&result, &path, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::OutputExists);
    }

    #[test]
    fn play_wraps_result() {
        let mut gen = loaded(FakeLoader::default());
        gen.configure(Some(1)).unwrap();
        let result = gen.generate("classical").unwrap();

        let handle = gen.play(&result, None).unwrap();
        assert_eq!(handle.sample_rate(), result.sample_rate);
        assert!(handle.to_html().contains("data:audio/wav;base64,"));
        assert_eq!(gen.phase(), GeneratorPhase::Configured);
    }

    #[test]
    fn basic_scenario_is_eight_seconds() {
        let dir = tempdir().unwrap();
        let loader = FakeLoader {
            sample_rate: 32000,
            ..FakeLoader::default()
        };
        let mut gen = generator(loader);
        gen.load().unwrap();
        gen.configure(Some(8)).unwrap();
        let result = gen.generate("classic rock song").unwrap();

        let path = dir.path().join("basic_example.wav");
        gen.save(&result, &path, None).unwrap();

        let (audio, rate) = read_wav(&path).unwrap();
        let one_frame = 640.0 / rate as f32;
        assert!((audio.duration_sec(rate) - 8.0).abs() <= one_frame);
    }
}
