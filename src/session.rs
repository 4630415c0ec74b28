//! Interactive prompt session.
//!
//! Owns one [`MusicGenerator`] and guards it with [`SessionState`], so a
//! prompt is only accepted when the model is ready and idle.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::audio::PlayableHandle;
use crate::error::{GeneratorError, Result};
use crate::generator::{MusicGenerator, SavedClip};
use crate::types::{validate_duration, validate_prompt};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Model not loaded.
    Idle,
    /// `initialize` is loading the model.
    Loading,
    /// Model loaded and configured; prompts are accepted.
    Ready,
    /// A prompt is being generated.
    Generating,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Loading => "loading",
            SessionState::Ready => "ready",
            SessionState::Generating => "generating",
        }
    }

    /// True when a prompt would be accepted.
    pub fn accepts_prompts(&self) -> bool {
        matches!(self, SessionState::Ready)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What one accepted prompt produced.
#[derive(Debug, Clone)]
pub struct SessionOutput {
    /// 1-based count of successful generations in this session.
    pub count: u32,
    pub prompt: String,
    pub clip: SavedClip,
    pub player: PlayableHandle,
}

/// File name for the `count`-th generation at `at`.
pub fn output_file_name(count: u32, at: &DateTime<Local>) -> String {
    format!("generated_music_{}_{}.wav", count, at.format("%Y%m%d_%H%M%S"))
}

/// Prompt-at-a-time session over a single generator.
#[derive(Debug)]
pub struct InteractiveSession {
    generator: MusicGenerator,
    state: SessionState,
    output_dir: PathBuf,
    duration_sec: Option<u32>,
    count: u32,
}

impl InteractiveSession {
    /// Creates an idle session writing files into `output_dir`.
    pub fn new(generator: MusicGenerator, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            generator,
            state: SessionState::Idle,
            output_dir: output_dir.into(),
            duration_sec: None,
            count: 0,
        }
    }

    /// Sets the duration applied by `initialize`. `None` uses the generator default.
    pub fn with_duration(mut self, duration_sec: Option<u32>) -> Self {
        self.duration_sec = duration_sec;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn generation_count(&self) -> u32 {
        self.count
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn generator(&self) -> &MusicGenerator {
        &self.generator
    }

    /// Loads and configures the model.
    ///
    /// On failure the session returns to `Idle` and can be initialized again.
    pub fn initialize(&mut self) -> Result<()> {
        match self.state {
            SessionState::Ready => return Ok(()),
            SessionState::Generating => return Err(GeneratorError::generation_in_progress()),
            SessionState::Idle | SessionState::Loading => {}
        }
        if let Some(duration) = self.duration_sec {
            validate_duration(duration)?;
        }

        self.state = SessionState::Loading;
        let loaded = self
            .generator
            .load()
            .and_then(|_| self.generator.configure(self.duration_sec));

        match loaded {
            Ok(()) => {
                self.state = SessionState::Ready;
                tracing::info!(model = self.generator.model_name(), "session ready");
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Idle;
                Err(e)
            }
        }
    }

    /// Generates, saves and wraps one prompt.
    ///
    /// Blank prompts are rejected before the generator is touched.
    pub fn submit(&mut self, prompt: &str) -> Result<SessionOutput> {
        let prompt = validate_prompt(prompt)?.to_string();
        match self.state {
            SessionState::Ready => {}
            SessionState::Generating => return Err(GeneratorError::generation_in_progress()),
            SessionState::Idle | SessionState::Loading => return Err(GeneratorError::not_loaded()),
        }

        self.state = SessionState::Generating;
        let output = self.run(&prompt);
        self.state = SessionState::Ready;
        output
    }

    fn run(&mut self, prompt: &str) -> Result<SessionOutput> {
        let result = self.generator.generate(prompt)?;

        let count = self.count + 1;
        let path = self.output_dir.join(output_file_name(count, &Local::now()));
        let clip = self.generator.save(&result, &path, None)?;
        let player = self.generator.play(&result, None)?;

        self.count = count;
        Ok(SessionOutput {
            count,
            prompt: prompt.to_string(),
            clip,
            player,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::error::ErrorCode;
    use crate::generator::GeneratorPhase;
    use crate::models::testing::FakeLoader;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn session(loader: FakeLoader, dir: &Path) -> InteractiveSession {
        let generator = MusicGenerator::with_loader(&GeneratorConfig::default(), Box::new(loader));
        InteractiveSession::new(generator, dir).with_duration(Some(1))
    }

    #[test]
    fn file_name_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(output_file_name(3, &at), "generated_music_3_20240309_140507.wav");
    }

    #[test]
    fn submit_before_initialize_is_not_loaded() {
        let dir = tempdir().unwrap();
        let mut session = session(FakeLoader::default(), dir.path());
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.submit("jazz").unwrap_err().code, ErrorCode::NotLoaded);
    }

    #[test]
    fn blank_prompt_rejected_before_generator() {
        let dir = tempdir().unwrap();
        let loader = FakeLoader::default();
        let calls = loader.calls();
        let mut session = session(loader, dir.path());
        session.initialize().unwrap();

        let err = session.submit("   ").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPrompt);
        assert!(calls.lock().unwrap().prompts.is_empty());
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn bad_duration_fails_before_load() {
        let dir = tempdir().unwrap();
        let loader = FakeLoader::default();
        let calls = loader.calls();
        let mut session = session(loader, dir.path()).with_duration(Some(0));

        let err = session.initialize().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDuration);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.generator().phase(), GeneratorPhase::Unloaded);
        assert!(calls.lock().unwrap().loads.is_empty());
    }

    #[test]
    fn failed_initialize_returns_to_idle() {
        let dir = tempdir().unwrap();
        let loader = FakeLoader {
            known: Vec::new(),
            ..FakeLoader::default()
        };
        let mut session = session(loader, dir.path());
        let err = session.initialize().unwrap_err();
        assert!(err.code.is_model_load());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn submit_saves_numbered_files() {
        let dir = tempdir().unwrap();
        let mut session = session(FakeLoader::default(), dir.path());
        session.initialize().unwrap();
        assert_eq!(session.state(), SessionState::Ready);

        let first = session.submit("lofi beat").unwrap();
        let second = session.submit("ambient pad").unwrap();
        assert_eq!(first.count, 1);
        assert_eq!(second.count, 2);
        assert!(first.clip.path.exists());
        assert!(second
            .clip
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("generated_music_2_"));
        assert_eq!(session.generation_count(), 2);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn failed_generation_restores_ready() {
        let dir = tempdir().unwrap();
        let mut session = session(FakeLoader::failing_on(&[1]), dir.path());
        session.initialize().unwrap();

        let err = session.submit("rock").unwrap_err();
        assert_eq!(err.code, ErrorCode::GenerationFailed);
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.generation_count(), 0);

        assert_eq!(session.submit("rock").unwrap().count, 1);
    }

    #[test]
    fn generating_rejects_new_prompts() {
        let dir = tempdir().unwrap();
        let mut session = session(FakeLoader::default(), dir.path());
        session.initialize().unwrap();

        session.state = SessionState::Generating;
        let err = session.submit("rock").unwrap_err();
        assert_eq!(err.code, ErrorCode::GenerationInProgress);
        assert!(!session.state().accepts_prompts());
    }
}
