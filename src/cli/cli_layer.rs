// Command-line surface: `serve` runs the HTTP API, `harvest` dumps Canvas
// data to JSON files.

#[path = "harvest.rs"]
pub mod harvest;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Campus assistant: Gemini chat with Google Workspace and Canvas tools.
#[derive(Parser, Debug)]
#[command(name = "campus_assistant")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server (default)
    Serve {
        /// Host to bind to (overrides ASSISTANT_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides ASSISTANT_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Fetch Canvas courses and assignments into JSON files
    Harvest {
        /// Term suffix of current courses, e.g. "WN 2025" (overrides CANVAS_TERM)
        #[arg(long)]
        term: Option<String>,

        /// Directory the JSON files are written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Also collect the full content of this course
        #[arg(long)]
        course: Option<u64>,
    },
}
