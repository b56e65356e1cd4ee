//! Commands backed by the processing history store

mod handler;

use std::path::PathBuf;

use clap::{Args, Subcommand};
use uuid::Uuid;

pub use handler::{handle_download_command, handle_history_command, handle_upload_command};

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Workbook to process (.xlsx or .xls)
    pub input: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List processing records, newest first
    List {
        /// Filter by file name or status
        #[arg(long)]
        search: Option<String>,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single processing record
    Show {
        /// Processing id
        id: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Processing id
    pub id: Uuid,

    /// Destination file or directory
    pub dest: PathBuf,
}
