//! Demonstration routines.
//!
//! Each [`Routine`] is a fixed list of prompts with output file names. The
//! [`DemoRunner`] executes them on one generator and returns a
//! [`RoutineReport`] per routine instead of stopping at the first failure.

pub mod plan;
pub mod runner;

pub use plan::{multiple_file_name, PlannedItem, Routine};
pub use runner::{DemoOptions, DemoRunner, ItemOutcome, RoutineReport};
