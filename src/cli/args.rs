//! Command-line argument parsing for neuroflex-store
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// neuroflex-store - Inspect and maintain the local training record store
#[derive(Parser, Debug)]
#[command(name = "neuroflex-store")]
#[command(version)]
#[command(about = "Inspect, back up and sync locally stored training records", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the data directory from the config
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Verbosity level: default (warnings), -v (info), -vv (debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the storage backend can be written and read
    Probe,

    /// List training records, newest first
    List {
        /// Only records from this module
        #[arg(short, long)]
        module: Option<String>,

        /// Only synced records
        #[arg(long, conflicts_with = "unsynced")]
        synced: bool,

        /// Only records awaiting upload
        #[arg(long)]
        unsynced: bool,

        /// Maximum number of rows to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show record statistics and training totals
    Stats,

    /// Show storage usage of this namespace
    Usage,

    /// Write a backup document
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Merge records from a backup document
    Import {
        /// Backup file produced by `export`
        file: PathBuf,
    },

    /// Remove records older than the given age
    Clean {
        /// Age in days (config default if omitted)
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Delete one record by id
    Delete {
        id: String,
    },

    /// Remove every stored key in this namespace
    Clear {
        /// Skip the confirmation check
        #[arg(long)]
        yes: bool,
    },

    /// Upload unsynced records to the remote service
    Sync {
        /// Remote user id to attribute records to
        #[arg(short, long)]
        user: String,
    },
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// `synced` filter for `list`, if any
    pub fn synced_filter(&self) -> Option<bool> {
        match &self.command {
            Commands::List { synced: true, .. } => Some(true),
            Commands::List { unsynced: true, .. } => Some(false),
            _ => None,
        }
    }
}

impl Verbosity {
    /// Default tracing directive for this level
    pub fn log_level(&self) -> tracing::Level {
        match self {
            Verbosity::Quiet => tracing::Level::ERROR,
            Verbosity::Normal => tracing::Level::WARN,
            Verbosity::Verbose => tracing::Level::INFO,
            Verbosity::VeryVerbose => tracing::Level::DEBUG,
        }
    }
}
