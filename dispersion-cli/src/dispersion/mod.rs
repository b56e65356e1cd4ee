//! Dispersion template generation
//!
//! Turns an employer pension-disbursement workbook into the four-column
//! template (Nombre, Clabe, Monto, Concepto) used for bank upload. The
//! pipeline runs in three stages, one way:
//!
//! workbook -> [`loader`] -> RawTable -> [`columns`] -> ColumnBinding
//!          -> [`records`] -> NormalizedRecord list -> [`writer`] -> template
//!
//! Nothing here holds process-wide state; every input comes in through
//! [`process`]'s arguments.

pub mod columns;
pub mod error;
pub mod loader;
pub mod records;
pub mod types;
pub mod writer;

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use columns::{ColumnBinding, Field};
pub use error::DispersionError;
pub use loader::{LoadPath, LoadedTable};
pub use records::NormalizedRecord;
pub use types::{CellValue, RawTable};
pub use writer::template_file_name;

pub const DEFAULT_SHEET_NAME: &str = "ADMON. PENSION";

/// 0-based, i.e. the 8th physical row
pub const DEFAULT_HEADER_ROW: usize = 7;

/// Where to look for the beneficiary table in the source workbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub sheet_name: String,
    pub header_row: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            header_row: DEFAULT_HEADER_ROW,
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub output_path: PathBuf,
    pub record_count: usize,
    pub total_amount: Decimal,
    pub load_path: LoadPath,
}

/// Load and resolve without writing anything
pub fn resolve(
    input: &Path,
    options: &PipelineOptions,
) -> Result<(LoadedTable, ColumnBinding), DispersionError> {
    let mut loaded = loader::load_table(input, options)?;
    columns::normalize_table_headers(&mut loaded.table);
    let binding = columns::resolve_columns(&loaded.table)?;
    Ok((loaded, binding))
}

/// Generate the template for `input` at `output`.
///
/// Zero accepted rows is a valid result: the template then holds only its
/// header row. On error no output file is left at `output`.
pub fn process(
    input: &Path,
    output: &Path,
    options: &PipelineOptions,
) -> Result<ProcessOutcome, DispersionError> {
    let (loaded, binding) = resolve(input, options)?;

    let rows = records::normalize_rows(&loaded.table, &binding)?;
    writer::write_template(&rows.records, output)?;

    Ok(ProcessOutcome {
        output_path: output.to_path_buf(),
        record_count: rows.records.len(),
        total_amount: rows.total_amount(),
        load_path: loaded.path,
    })
}
