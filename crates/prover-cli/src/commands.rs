use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "prover")]
#[command(about = "Keep source files in folders and record what the prover says about them", long_about = None)]
pub struct Cli {
    /// Owner on whose behalf the command runs
    #[arg(long, global = true, env = "PROVER_OWNER")]
    pub owner: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a directory
    Mkdir {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Parent directory id (root when omitted)
        #[arg(long)]
        parent: Option<i64>,
    },
    /// Upload a file from disk
    Upload {
        path: PathBuf,
        #[arg(long)]
        description: Option<String>,
        /// Parent directory id (root when omitted)
        #[arg(long)]
        parent: Option<i64>,
    },
    /// List directories and files under a directory (root when omitted)
    Ls { dir: Option<i64> },
    /// Delete a directory and everything under it
    Rmdir { dir: i64 },
    /// Delete a file (it stays in history)
    Rm { file: i64 },
    /// Permanently remove a file and its verification history
    Purge { file: i64 },
    /// Print a file's content
    Cat { file: i64 },
    /// Run the prover on a file
    Prove { file: i64 },
    /// Show the current findings of a file
    Findings {
        file: i64,
        /// Include superseded findings
        #[arg(long)]
        all: bool,
    },
    /// Show the raw report of the latest run
    Summary { file: i64 },
    /// List every run of a file, newest first
    History { file: i64 },
    /// Print configuration values
    PrintConfig,
    /// Truncate all database tables
    TruncateDb,
}
