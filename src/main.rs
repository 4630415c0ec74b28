//! music-generator: text-to-music generation with MusicGen.
//!
//! Modes:
//! - Demo mode (default): named example routines
//! - Single mode (`--prompt`): one prompt into one file
//! - Interactive mode (`--interactive`): prompts from stdin

use std::io::{self, BufRead, Write};
use std::path::Path;

use tracing_subscriber::EnvFilter;

use music_generator::cli::{Cli, Mode};
use music_generator::config::GeneratorConfig;
use music_generator::demos::{DemoRunner, Routine, RoutineReport};
use music_generator::error::{ErrorCode, GeneratorError, Result};
use music_generator::generator::{FileGeneration, MusicGenerator};
use music_generator::session::{InteractiveSession, SessionOutput};
use music_generator::types::validate_prompt;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let mode = cli.mode();
    if !mode.needs_model() {
        println!("Available examples: {}", Routine::names());
        return Ok(());
    }
    let config = cli.resolve_config(GeneratorConfig::from_env())?;

    match mode {
        Mode::UnknownExample(_) => Ok(()),
        Mode::Demo(routine) => {
            run_demos(&cli, &config, routine);
            Ok(())
        }
        Mode::Single(prompt) => run_single(&cli, &config, &prompt),
        Mode::Interactive => run_interactive(&cli, &config),
    }
}

/// Runs example routines and prints a summary.
fn run_demos(cli: &Cli, config: &GeneratorConfig, routine: Routine) {
    if routine == Routine::All {
        println!("MUSICGEN AI - EXAMPLE SHOWCASE");
        println!("{}", "=".repeat(50));
    }

    let mut runner = DemoRunner::new(MusicGenerator::new(config), cli.demo_options());
    let reports = runner.run(routine);

    print_summary(&reports);
    if routine == Routine::All {
        println!("\nAll examples completed!");
        println!("Check the generated audio files in {}", cli.output_dir.display());
    }
}

fn print_summary(reports: &[RoutineReport]) {
    println!("\nSummary:");
    for report in reports {
        match &report.failure {
            Some(e) => println!("  {:<11} failed: {}", report.routine, e),
            None => println!(
                "  {:<11} {} saved, {} failed",
                report.routine,
                report.succeeded(),
                report.failed()
            ),
        }
    }
}

/// Generates one prompt into one file.
fn run_single(cli: &Cli, config: &GeneratorConfig, prompt: &str) -> Result<()> {
    let prompt = validate_prompt(prompt)?;
    let output_path = cli.output_path();

    eprintln!("=== music-generator ===");
    eprintln!("Model: {}", config.model_name);
    eprintln!("Prompt: \"{}\"", prompt);
    eprintln!("Duration: {}s", config.default_duration_sec);
    eprintln!("Output: {}", output_path.display());
    if let Some(seed) = config.seed {
        eprintln!("Seed: {}", seed);
    }
    eprintln!();

    let mut generator = MusicGenerator::new(config);
    let FileGeneration { clip, elapsed } = generator.generate_to_file(prompt, &output_path)?;

    let rtf = elapsed.as_secs_f32() / clip.duration_sec.max(f32::EPSILON);
    println!("Audio saved to: {}", clip.path.display());
    println!(
        "{:.2}s of audio at {} Hz ({} channel(s)), generated in {:.2}s (RTF {:.2}x)",
        clip.duration_sec,
        clip.sample_rate,
        clip.channels,
        elapsed.as_secs_f32(),
        rtf
    );
    Ok(())
}

/// Reads prompts from stdin until EOF or `quit`.
fn run_interactive(cli: &Cli, config: &GeneratorConfig) -> Result<()> {
    create_dir(&cli.output_dir)?;

    let generator = MusicGenerator::new(config);
    let mut session = InteractiveSession::new(generator, &cli.output_dir);

    println!("Initializing model...");
    if let Err(e) = session.initialize() {
        println!("Error loading model: {}", e);
        return Err(e);
    }
    println!("Model loaded successfully! Ready to generate music.");
    println!("Enter a music prompt (e.g. \"upbeat rock song with guitar solo\"), or 'quit' to exit.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                break;
            }
        }

        let prompt = line.trim();
        if matches!(prompt, "quit" | "exit") {
            break;
        }
        if prompt.is_empty() {
            println!("Please enter a music description!");
            continue;
        }

        println!("Generating music for: '{}'", prompt);
        match session.submit(prompt) {
            Ok(output) => report_output(&output, cli.player_html),
            Err(e) => println!("Error generating music: {}", e),
        }
    }

    println!("Generated {} track(s).", session.generation_count());
    Ok(())
}

fn report_output(output: &SessionOutput, player_html: bool) {
    println!("Music generated successfully!");
    println!("Saved as: {}", output.clip.path.display());

    if player_html {
        let html_path = output.clip.path.with_extension("html");
        let page = format!(
            "<!DOCTYPE html>\n<html>\n<body>\n<p>{}</p>\n{}\n</body>\n</html>\n",
            escape_html(&output.prompt),
            output.player.to_html()
        );
        match std::fs::write(&html_path, page) {
            Ok(()) => println!("Player: {}", html_path.display()),
            Err(e) => tracing::warn!(path = %html_path.display(), error = %e, "failed to write player"),
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        GeneratorError::with_source(
            ErrorCode::AudioIo,
            format!("Failed to create output directory {}", dir.display()),
            e,
        )
    })
}
