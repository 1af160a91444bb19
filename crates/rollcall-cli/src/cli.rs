//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Classroom attendance reporting.
///
/// Reconstructs per-room presence from heterogeneous event logs and
/// classifies each rostered student's attendance for a class period.
#[derive(Debug, Parser)]
#[command(name = "rollcall", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute an attendance report for one class period.
    Report {
        /// JSON file holding the raw event payloads (array or single object).
        #[arg(long)]
        events: PathBuf,

        /// Optional JSON roster file: array of {studentId, studentName?}.
        #[arg(long)]
        roster: Option<PathBuf>,

        /// Target date (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,

        /// Class period number (1-5 on the default timetable).
        #[arg(long)]
        period: u8,

        /// Keep only snapshots tagged with this course.
        #[arg(long)]
        course: Option<String>,

        /// Keep only snapshots tagged with this teacher.
        #[arg(long)]
        teacher: Option<String>,

        /// Keep only snapshots for this classroom.
        #[arg(long)]
        room: Option<String>,

        /// Emit the JSON report instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show events after heuristic field normalization.
    Normalize {
        /// JSON file holding the raw event payloads.
        #[arg(long)]
        events: PathBuf,

        /// Emit normalized events as JSON lines instead of a table.
        #[arg(long)]
        json: bool,
    },
}
