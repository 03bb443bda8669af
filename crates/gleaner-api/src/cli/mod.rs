//! CLI command definitions for the `glean` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod check;
pub mod evaluate;
pub mod lessons;
pub mod payload;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

/// Extract durable lessons from agent conversation turns.
#[derive(Parser)]
#[command(name = "glean", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Log errors only. Command results are still printed.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log filter directive for the verbosity flags.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,gleaner=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the extraction pipeline on one host payload and store the lessons.
    Evaluate {
        /// JSON payload `{ "turn": ..., "state": ... }`. Reads stdin when omitted.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show which trigger signals fire for a payload, without calling the model.
    Check {
        /// JSON payload `{ "turn": ..., "state": ... }`. Reads stdin when omitted.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Browse and manage stored lessons.
    Lessons {
        #[command(subcommand)]
        action: LessonsCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum LessonsCommand {
    /// List lessons, newest first.
    #[command(alias = "ls")]
    List {
        /// Only lessons from this room.
        #[arg(long)]
        room: Option<Uuid>,

        /// Maximum number of lessons to show.
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Delete a single lesson by ID.
    #[command(alias = "rm")]
    Delete {
        /// Lesson ID.
        id: Uuid,

        /// Skip confirmation.
        #[arg(long)]
        force: bool,
    },

    /// Delete every lesson from a room.
    Forget {
        /// Room ID.
        room: Uuid,

        /// Skip confirmation.
        #[arg(long)]
        force: bool,
    },
}
