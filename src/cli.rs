use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Task file to use; defaults to nbrun.toml, or the built-in tasks if that is missing
    #[arg(short = 'f', long = "file", global = true)]
    pub file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a task after its prerequisites
    Run {
        /// Task to run, runs the default task if not specified
        task: Option<String>,

        /// Show what would be executed without running anything
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// List declared tasks
    List {
        /// Print the task list as JSON
        #[arg(long = "json")]
        json: bool,
    },
}
