//! Command-line interface definitions

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CONFIG_ENV_VAR;
use commands::history::{DownloadArgs, HistoryCommands, UploadArgs};
use commands::process::{InspectArgs, ProcessArgs};

/// Generate bank dispersion templates from pension-disbursement spreadsheets
#[derive(Parser, Debug)]
#[command(name = "dispersion", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the config file
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a template from a workbook without recording history
    Process(ProcessArgs),

    /// Show how a workbook's sheet and columns are detected
    Inspect(InspectArgs),

    /// Process a workbook, store the template and record it in the history
    Upload(UploadArgs),

    /// Browse processing history
    #[command(subcommand)]
    History(HistoryCommands),

    /// Copy a stored template out by processing id
    Download(DownloadArgs),
}
