//! Direct pipeline commands: `process` and `inspect`

mod handler;

use std::path::PathBuf;

use clap::Args;

pub use handler::{handle_inspect_command, handle_process_command};

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Source workbook (.xlsx or .xls)
    pub input: PathBuf,

    /// Output path, defaults to plantilla_<date>.xlsx in the current directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Sheet holding the beneficiary table
    #[arg(long)]
    pub sheet: Option<String>,

    /// 1-based row holding the column headers
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub header_row: Option<u32>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Source workbook (.xlsx or .xls)
    pub input: PathBuf,

    /// Sheet holding the beneficiary table
    #[arg(long)]
    pub sheet: Option<String>,

    /// 1-based row holding the column headers
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub header_row: Option<u32>,
}
