//! Command-line arguments.
//!
//! Three modes share one parser: demonstration routines (the default), a
//! single `--prompt` generation and an `--interactive` prompt loop.

use std::path::PathBuf;

use clap::Parser;

use crate::config::GeneratorConfig;
use crate::demos::{DemoOptions, Routine};
use crate::error::{GeneratorError, Result};

/// What the binary should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Run a demonstration routine.
    Demo(Routine),
    /// The example name is not recognised.
    UnknownExample(String),
    /// Generate one prompt into one file.
    Single(String),
    /// Read prompts from stdin until EOF.
    Interactive,
}

impl Mode {
    /// Whether this mode touches the model and therefore needs a valid config.
    pub fn needs_model(&self) -> bool {
        !matches!(self, Mode::UnknownExample(_))
    }
}

/// music-generator: text-to-music generation with MusicGen
#[derive(Parser, Debug)]
#[command(name = "music-generator")]
#[command(about = "Generate music from text prompts with MusicGen")]
#[command(version)]
pub struct Cli {
    /// Example to run: basic, multiple, durations, genres, refinement, batch, all
    pub example: Option<String>,

    /// Text prompt for a single generation
    #[arg(short, long, conflicts_with = "interactive")]
    pub prompt: Option<String>,

    /// Duration in seconds (single and interactive modes)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=120))]
    pub duration: Option<u32>,

    /// Output WAV file for a single generation
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Random seed for reproducible generation
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Pretrained model name or directory with an ONNX export
    #[arg(short, long)]
    pub model: Option<String>,

    /// Root directory for downloaded models
    #[arg(long)]
    pub model_path: Option<PathBuf>,

    /// Fail instead of downloading missing model files
    #[arg(long)]
    pub no_download: bool,

    /// Directory generated files are written into
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Skip the pauses between generations
    #[arg(long)]
    pub no_pause: bool,

    /// Read prompts from stdin, one per line
    #[arg(short, long)]
    pub interactive: bool,

    /// Write an HTML player next to every interactive generation
    #[arg(long, requires = "interactive")]
    pub player_html: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Resolves the run mode. `--interactive` wins over `--prompt`, which
    /// wins over an example name.
    pub fn mode(&self) -> Mode {
        if self.interactive {
            return Mode::Interactive;
        }
        if let Some(prompt) = &self.prompt {
            return Mode::Single(prompt.clone());
        }
        match self.example.as_deref() {
            None => Mode::Demo(Routine::All),
            Some(name) => Routine::parse(name)
                .map(Mode::Demo)
                .unwrap_or_else(|| Mode::UnknownExample(name.to_string())),
        }
    }

    /// Applies command-line overrides on top of an environment config.
    pub fn apply_to(&self, config: &mut GeneratorConfig) {
        if let Some(model) = &self.model {
            config.model_name = model.clone();
        }
        if let Some(path) = &self.model_path {
            config.model_cache_path = Some(path.clone());
        }
        if self.no_download {
            config.auto_download = false;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(duration) = self.duration {
            config.default_duration_sec = duration;
        }
    }

    /// Applies overrides to `base` and validates the result.
    pub fn resolve_config(&self, mut base: GeneratorConfig) -> Result<GeneratorConfig> {
        self.apply_to(&mut base);
        match base.validate() {
            Some(problem) => Err(GeneratorError::invalid_config(problem)),
            None => Ok(base),
        }
    }

    /// Returns the effective output path for a single generation.
    ///
    /// Defaults to `generated_music.wav` in the output directory.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.output_dir.join("generated_music.wav"))
    }

    pub fn demo_options(&self) -> DemoOptions {
        if self.no_pause {
            DemoOptions::without_pauses(&self.output_dir)
        } else {
            DemoOptions {
                output_dir: self.output_dir.clone(),
                ..DemoOptions::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("music-generator").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_arguments_runs_all() {
        assert_eq!(parse(&[]).mode(), Mode::Demo(Routine::All));
    }

    #[test]
    fn example_names() {
        assert_eq!(parse(&["genres"]).mode(), Mode::Demo(Routine::Genres));
        assert_eq!(
            parse(&["techno"]).mode(),
            Mode::UnknownExample("techno".to_string())
        );
    }

    #[test]
    fn unknown_example_needs_no_model() {
        let cli = parse(&["techno", "--model", ""]);
        let mode = cli.mode();
        assert_eq!(mode, Mode::UnknownExample("techno".to_string()));
        assert!(!mode.needs_model());
        assert!(cli.resolve_config(GeneratorConfig::default()).is_err());

        assert!(Mode::Demo(Routine::Basic).needs_model());
        assert!(Mode::Single("jazz".to_string()).needs_model());
        assert!(Mode::Interactive.needs_model());
    }

    #[test]
    fn resolve_config_rejects_blank_model() {
        let err = parse(&["basic", "--model", ""])
            .resolve_config(GeneratorConfig::default())
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidConfig);

        let config = parse(&["basic", "--seed", "3"])
            .resolve_config(GeneratorConfig::default())
            .unwrap();
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn single_prompt_mode() {
        let cli = parse(&["--prompt", "classic rock song", "--duration", "8", "--seed", "42"]);
        assert_eq!(cli.mode(), Mode::Single("classic rock song".to_string()));
        assert_eq!(cli.output_path(), PathBuf::from("./generated_music.wav"));

        let mut config = GeneratorConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.default_duration_sec, 8);
    }

    #[test]
    fn interactive_mode() {
        let cli = parse(&["--interactive", "--player-html"]);
        assert_eq!(cli.mode(), Mode::Interactive);
        assert!(cli.player_html);
    }

    #[test]
    fn player_html_requires_interactive() {
        assert!(Cli::try_parse_from(["music-generator", "--player-html"]).is_err());
    }

    #[test]
    fn duration_range_enforced() {
        assert!(Cli::try_parse_from(["music-generator", "-p", "x", "-d", "0"]).is_err());
        assert!(Cli::try_parse_from(["music-generator", "-p", "x", "-d", "121"]).is_err());
    }

    #[test]
    fn model_overrides() {
        let cli = parse(&["basic", "--model", "/models/small", "--model-path", "/cache", "--no-download"]);
        let mut config = GeneratorConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config.model_name, "/models/small");
        assert_eq!(config.model_cache_path, Some(PathBuf::from("/cache")));
        assert!(!config.auto_download);
    }

    #[test]
    fn demo_pauses() {
        let options = parse(&["batch", "--output-dir", "out"]).demo_options();
        assert_eq!(options.output_dir, PathBuf::from("out"));
        assert_eq!(options.item_pause, Duration::from_secs(1));

        let options = parse(&["batch", "--no-pause"]).demo_options();
        assert!(options.item_pause.is_zero());
        assert!(options.routine_pause.is_zero());
    }
}
