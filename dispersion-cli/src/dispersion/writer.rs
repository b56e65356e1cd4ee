//! Write normalized records as a formatted dispersion template

use std::io::Write;
use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatPattern, Workbook, XlsxError};
use tempfile::NamedTempFile;

use super::error::DispersionError;
use super::records::NormalizedRecord;

pub const SHEET_NAME: &str = "Sheet1";

pub const HEADERS: [&str; 4] = ["Nombre", "Clabe", "Monto", "Concepto"];

pub const AMOUNT_FORMAT: &str = "#,##0.00";

/// Column indices of the template
mod cols {
    pub const NAME: u16 = 0;
    pub const ACCOUNT: u16 = 1;
    pub const AMOUNT: u16 = 2;
    pub const CONCEPT: u16 = 3;
    pub const SPACER: u16 = 4;
}

const COLUMN_WIDTHS: [(u16, f64); 5] = [
    (cols::NAME, 35.0),
    (cols::ACCOUNT, 25.0),
    (cols::AMOUNT, 18.0),
    (cols::CONCEPT, 40.0),
    (cols::SPACER, 5.0),
];

/// File name of a generated template, e.g. `plantilla_2025-08-15.xlsx`
pub fn template_file_name(stamp: &str) -> String {
    format!("plantilla_{}.xlsx", stamp)
}

/// Write the template to `path`.
///
/// The workbook goes to a temporary file next to `path` and is renamed over it
/// only once complete. On failure `path` keeps whatever it held before.
pub fn write_template(records: &[NormalizedRecord], path: &Path) -> Result<(), DispersionError> {
    let buffer = build_workbook(records)
        .and_then(|mut workbook| workbook.save_to_buffer())
        .map_err(|e| DispersionError::write(path, e))?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut staged = NamedTempFile::new_in(dir).map_err(|e| DispersionError::write(path, e))?;
    staged
        .write_all(&buffer)
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| DispersionError::write(path, e))?;
    staged
        .persist(path)
        .map_err(|e| DispersionError::write(path, e.error))?;

    log::info!(
        "Template written to {} with {} records",
        path.display(),
        records.len()
    );
    Ok(())
}

fn build_workbook(records: &[NormalizedRecord]) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::White)
        .set_pattern(FormatPattern::Solid)
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center);

    let cell_format = Format::new().set_border(FormatBorder::Thin);

    let amount_format = Format::new()
        .set_border(FormatBorder::Thin)
        .set_num_format(AMOUNT_FORMAT);

    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (idx, record) in records.iter().enumerate() {
        let row = (idx + 1) as u32;
        let amount = f64::try_from(record.amount)
            .map_err(|e| XlsxError::ParameterError(format!("amount {}: {}", record.amount, e)))?;

        sheet.write_string_with_format(row, cols::NAME, &record.name, &cell_format)?;
        sheet.write_string_with_format(row, cols::ACCOUNT, &record.account, &cell_format)?;
        sheet.write_number_with_format(row, cols::AMOUNT, amount, &amount_format)?;
        sheet.write_string_with_format(row, cols::CONCEPT, record.concept, &cell_format)?;
    }

    for (col, width) in COLUMN_WIDTHS {
        sheet.set_column_width(col, width)?;
    }

    Ok(workbook)
}
