//! Runs routines against one generator and collects per-item outcomes.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::error::{ErrorCode, GeneratorError, Result};
use crate::generator::{GeneratorPhase, MusicGenerator, SavedClip};
use crate::types::GenerationRequest;

use super::plan::{PlannedItem, Routine};

/// Runner settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoOptions {
    /// Root for every relative output path.
    pub output_dir: PathBuf,
    /// Pause after each item of routines that pause between items.
    pub item_pause: Duration,
    /// Pause after each routine when running several.
    pub routine_pause: Duration,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            item_pause: Duration::from_secs(1),
            routine_pause: Duration::from_secs(2),
        }
    }
}

impl DemoOptions {
    /// Options with both pauses disabled.
    pub fn without_pauses(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            item_pause: Duration::ZERO,
            routine_pause: Duration::ZERO,
        }
    }
}

/// Result of one planned item.
#[derive(Debug)]
pub struct ItemOutcome {
    pub item: PlannedItem,
    pub result: Result<SavedClip>,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything one routine did.
#[derive(Debug)]
pub struct RoutineReport {
    pub routine: Routine,
    pub items: Vec<ItemOutcome>,
    /// Failure that stopped the routine before or between items.
    pub failure: Option<GeneratorError>,
}

impl RoutineReport {
    fn new(routine: Routine) -> Self {
        Self {
            routine,
            items: Vec::new(),
            failure: None,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    /// True when nothing failed.
    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.failed() == 0
    }

    pub fn saved_paths(&self) -> Vec<&std::path::Path> {
        self.items
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|clip| clip.path.as_path()))
            .collect()
    }
}

/// Drives routines on a single generator, loading the model once.
#[derive(Debug)]
pub struct DemoRunner {
    generator: MusicGenerator,
    options: DemoOptions,
}

impl DemoRunner {
    pub fn new(generator: MusicGenerator, options: DemoOptions) -> Self {
        Self { generator, options }
    }

    pub fn generator(&self) -> &MusicGenerator {
        &self.generator
    }

    pub fn into_generator(self) -> MusicGenerator {
        self.generator
    }

    /// Runs a routine, or every routine for [`Routine::All`].
    ///
    /// A failing routine does not stop the ones after it.
    pub fn run(&mut self, routine: Routine) -> Vec<RoutineReport> {
        let routines = routine.expand();
        let mut reports = Vec::with_capacity(routines.len());

        for (i, r) in routines.iter().enumerate() {
            reports.push(self.run_routine(*r));
            if routines.len() > 1 {
                println!("\n{}", "-".repeat(50));
                if i + 1 < routines.len() {
                    pause(self.options.routine_pause);
                }
            }
        }
        reports
    }

    /// Runs one routine's items.
    pub fn run_routine(&mut self, routine: Routine) -> RoutineReport {
        println!("\n=== {} ===", routine.title());
        let mut report = RoutineReport::new(routine);

        if let Err(e) = self.prepare(routine) {
            println!("Error running {}: {}", routine, e);
            tracing::warn!(routine = %routine, error = %e, "routine aborted");
            report.failure = Some(e);
            return report;
        }

        let plan = routine.plan();
        let count = plan.len();
        for (i, item) in plan.into_iter().enumerate() {
            println!("\nGenerating {}", item.label);
            let result = self.run_item(&item);
            match &result {
                Ok(clip) => println!("Saved: {}", clip.path.display()),
                Err(e) => {
                    println!("Error: {}", e);
                    tracing::warn!(item = %item.label, error = %e, "item failed");
                }
            }
            report.items.push(ItemOutcome { item, result });

            if routine.pauses_between_items() && i + 1 < count {
                pause(self.options.item_pause);
            }
        }

        tracing::info!(
            routine = %routine,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "routine finished"
        );
        report
    }

    /// Loads the model on first use and creates the output directories.
    fn prepare(&mut self, routine: Routine) -> Result<()> {
        if self.generator.phase() == GeneratorPhase::Unloaded {
            self.generator.load()?;
        }

        let dir = match routine.subdir() {
            Some(sub) => self.options.output_dir.join(sub),
            None => self.options.output_dir.clone(),
        };
        fs::create_dir_all(&dir).map_err(|e| {
            GeneratorError::with_source(
                ErrorCode::AudioIo,
                format!("Failed to create output directory {}", dir.display()),
                e,
            )
        })
    }

    fn run_item(&mut self, item: &PlannedItem) -> Result<SavedClip> {
        let request = GenerationRequest::new(&item.prompt, item.duration_sec)?;
        let result = self.generator.generate_request(&request)?;
        let path = self.options.output_dir.join(&item.relative_path);
        self.generator.save(&result, &path, None)
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
