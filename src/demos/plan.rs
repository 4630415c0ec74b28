//! Named demonstration routines and the files they produce.

use std::fmt;

/// Prompts for the `multiple` routine.
pub const MULTIPLE_PROMPTS: [&str; 5] = [
    "upbeat electronic dance music",
    "slow jazz piano ballad",
    "acoustic guitar folk song",
    "heavy metal with drums",
    "ambient atmospheric soundscape",
];

/// Durations for the `durations` routine, in seconds.
pub const DURATION_STEPS: [u32; 4] = [5, 10, 15, 20];

/// `(genre, prompt)` pairs for the `genres` routine, in generation order.
pub const GENRE_PROMPTS: [(&str, &str); 7] = [
    ("rock", "energetic rock song with electric guitar"),
    ("jazz", "smooth jazz with saxophone and piano"),
    ("classical", "orchestral classical music with strings"),
    ("hip_hop", "hip hop beat with bass and drums"),
    ("country", "country music with acoustic guitar and banjo"),
    ("reggae", "reggae song with guitar and steady rhythm"),
    ("blues", "slow blues with guitar and harmonica"),
];

/// Progressively refined prompts for the `refinement` routine.
pub const REFINEMENT_PROMPTS: [&str; 5] = [
    "rock song",
    "upbeat rock song",
    "upbeat rock song with guitar",
    "upbeat rock song with guitar solo",
    "upbeat rock song with guitar solo and drums",
];

pub const BATCH_PROMPT: &str = "chill lo-fi hip hop beat";
pub const BATCH_VARIATIONS: usize = 3;

/// A named demonstration routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Routine {
    Basic,
    Multiple,
    Durations,
    Genres,
    Refinement,
    Batch,
    /// Every routine above, in order.
    All,
}

impl Routine {
    /// The runnable routines, in the order `all` runs them.
    pub const SEQUENCE: [Routine; 6] = [
        Routine::Basic,
        Routine::Multiple,
        Routine::Durations,
        Routine::Genres,
        Routine::Refinement,
        Routine::Batch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Routine::Basic => "basic",
            Routine::Multiple => "multiple",
            Routine::Durations => "durations",
            Routine::Genres => "genres",
            Routine::Refinement => "refinement",
            Routine::Batch => "batch",
            Routine::All => "all",
        }
    }

    /// Parses a routine name. Exact, lowercase names only.
    pub fn parse(name: &str) -> Option<Self> {
        Self::SEQUENCE
            .into_iter()
            .chain([Routine::All])
            .find(|r| r.as_str() == name)
    }

    /// Comma-separated list of every accepted name.
    pub fn names() -> String {
        Self::SEQUENCE
            .iter()
            .chain([Routine::All].iter())
            .map(Routine::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Routines this one expands to.
    pub fn expand(&self) -> Vec<Routine> {
        match self {
            Routine::All => Self::SEQUENCE.to_vec(),
            other => vec![*other],
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Routine::Basic => "BASIC MUSIC GENERATION EXAMPLE",
            Routine::Multiple => "MULTIPLE PROMPTS EXAMPLE",
            Routine::Durations => "DIFFERENT DURATIONS EXAMPLE",
            Routine::Genres => "GENRE EXPLORATION EXAMPLE",
            Routine::Refinement => "PROMPT REFINEMENT EXAMPLE",
            Routine::Batch => "BATCH GENERATION EXAMPLE",
            Routine::All => "EXAMPLE SHOWCASE",
        }
    }

    /// Subdirectory of the output directory the routine writes into.
    pub fn subdir(&self) -> Option<&'static str> {
        match self {
            Routine::Genres => Some("genre_examples"),
            Routine::Refinement => Some("prompt_refinement"),
            Routine::Batch => Some("batch_generation"),
            _ => None,
        }
    }

    /// Whether the runner pauses after each item.
    pub fn pauses_between_items(&self) -> bool {
        matches!(self, Routine::Multiple)
    }

    /// The items this routine generates. Empty for [`Routine::All`].
    pub fn plan(&self) -> Vec<PlannedItem> {
        match self {
            Routine::Basic => vec![PlannedItem::new(
                "classic rock song",
                "classic rock song",
                8,
                "basic_example.wav",
            )],
            Routine::Multiple => MULTIPLE_PROMPTS
                .iter()
                .enumerate()
                .map(|(i, prompt)| {
                    PlannedItem::new(
                        format!("{}/{}: {}", i + 1, MULTIPLE_PROMPTS.len(), prompt),
                        prompt,
                        10,
                        multiple_file_name(i + 1, prompt),
                    )
                })
                .collect(),
            Routine::Durations => DURATION_STEPS
                .iter()
                .map(|&d| {
                    PlannedItem::new(
                        format!("{}s version", d),
                        "upbeat pop song with vocals",
                        d,
                        format!("pop_song_{}s.wav", d),
                    )
                })
                .collect(),
            Routine::Genres => GENRE_PROMPTS
                .iter()
                .map(|(genre, prompt)| {
                    PlannedItem::new(
                        genre.to_uppercase(),
                        prompt,
                        12,
                        format!("genre_examples/{}_example.wav", genre),
                    )
                })
                .collect(),
            Routine::Refinement => REFINEMENT_PROMPTS
                .iter()
                .enumerate()
                .map(|(i, prompt)| {
                    PlannedItem::new(
                        format!("refinement level {}: {}", i + 1, prompt),
                        prompt,
                        8,
                        format!("prompt_refinement/refinement_{}.wav", i + 1),
                    )
                })
                .collect(),
            Routine::Batch => (1..=BATCH_VARIATIONS)
                .map(|i| {
                    PlannedItem::new(
                        format!("variation {}/{}", i, BATCH_VARIATIONS),
                        BATCH_PROMPT,
                        8,
                        format!("batch_generation/variation_{}.wav", i),
                    )
                })
                .collect(),
            Routine::All => Vec::new(),
        }
    }
}

impl fmt::Display for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One generation a routine will run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    /// Progress label shown to the user.
    pub label: String,
    pub prompt: String,
    pub duration_sec: u32,
    /// Output path relative to the output directory.
    pub relative_path: String,
}

impl PlannedItem {
    fn new(
        label: impl Into<String>,
        prompt: &str,
        duration_sec: u32,
        relative_path: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            prompt: prompt.to_string(),
            duration_sec,
            relative_path: relative_path.into(),
        }
    }
}

/// `example_{index}_{prompt with spaces as underscores}.wav`
pub fn multiple_file_name(index: usize, prompt: &str) -> String {
    format!("example_{}_{}.wav", index, prompt.replace(' ', "_"))
}
