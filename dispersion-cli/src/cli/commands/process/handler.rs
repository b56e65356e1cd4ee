//! Handlers for the `process` and `inspect` commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use colored::*;

use super::{InspectArgs, ProcessArgs};
use crate::config::Config;
use crate::dispersion::{
    self, DispersionError, Field, PipelineOptions, columns, loader, template_file_name,
};

/// Run the pipeline straight from a file path to an output file
pub fn handle_process_command(args: ProcessArgs, config: &Config) -> Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let options = pipeline_options(config, args.sheet, args.header_row);
    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(template_file_name(&Local::now().format("%Y-%m-%d").to_string()))
    });

    let outcome = dispersion::process(&args.input, &output, &options)
        .with_context(|| format!("Failed to process {}", args.input.display()))?;

    if outcome.load_path.is_degraded() {
        println!(
            "{} header row {} not found, read the first sheet from its top row",
            "Warning:".yellow().bold(),
            options.header_row + 1
        );
    }

    println!(
        "{} {} with {} rows",
        "Generated".green().bold(),
        outcome.output_path.display().to_string().cyan(),
        outcome.record_count
    );
    log::info!("Total amount: {}", outcome.total_amount);

    Ok(())
}

/// Show sheet selection, headers and the resolved columns of a workbook
pub fn handle_inspect_command(args: InspectArgs, config: &Config) -> Result<()> {
    let options = pipeline_options(config, args.sheet, args.header_row);

    let mut loaded = loader::load_table(&args.input, &options)
        .with_context(|| format!("Failed to inspect {}", args.input.display()))?;
    columns::normalize_table_headers(&mut loaded.table);

    println!(
        "Sheet: {} (header row {}, via {})",
        loaded.sheet.bright_green().bold(),
        loaded.header_row + 1,
        loaded.path
    );
    println!("Data rows: {}", loaded.table.len());
    println!();
    println!("Headers:");
    for header in loaded.table.headers() {
        println!("  {}", header.dimmed());
    }
    println!();

    match columns::resolve_columns(&loaded.table) {
        Ok(binding) => {
            println!("Columns:");
            for field in Field::ALL {
                println!("  {:<8} {}", field.to_string(), binding.label(field).green());
            }
            Ok(())
        }
        Err(err) => {
            for field in err.missing_fields() {
                println!(
                    "  {:<8} {} (tried {})",
                    field.to_string(),
                    "not found".red().bold(),
                    field.keywords().join(", ")
                );
            }
            Err(anyhow::Error::new(err))
        }
    }
}

fn pipeline_options(
    config: &Config,
    sheet: Option<String>,
    header_row: Option<u32>,
) -> PipelineOptions {
    let mut options = config.pipeline.clone();
    if let Some(sheet) = sheet {
        options.sheet_name = sheet;
    }
    if let Some(row) = header_row {
        options.header_row = row.saturating_sub(1) as usize;
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_options_overrides() {
        let config = Config::default();

        let options = pipeline_options(&config, None, None);
        assert_eq!(options, PipelineOptions::default());

        let options = pipeline_options(&config, Some("PAGOS".into()), Some(1));
        assert_eq!(options.sheet_name, "PAGOS");
        assert_eq!(options.header_row, 0);
    }

    #[test]
    fn test_missing_input_is_reported() {
        let args = ProcessArgs {
            input: PathBuf::from("/definitely/not/here.xlsx"),
            output: None,
            sheet: None,
            header_row: None,
        };

        let err = handle_process_command(args, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_inspect_unmatched_columns_returns_typed_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("otro.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Folio").unwrap();
        workbook.save(&path).unwrap();

        let args = InspectArgs {
            input: path,
            sheet: None,
            header_row: None,
        };
        let err = handle_inspect_command(args, &Config::default()).unwrap_err();

        let err = err.downcast::<DispersionError>().unwrap();
        assert_eq!(err.missing_fields().len(), 3);
    }
}
