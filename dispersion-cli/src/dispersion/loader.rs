//! Read the source workbook into a RawTable
//!
//! Tries, in order:
//! 1. the configured sheet (default "ADMON. PENSION") with the header on the configured row
//! 2. the first sheet with the same header row
//! 3. the first sheet with the header on the top row
//!
//! The last step is a degraded mode; it mostly exists so that malformed input
//! fails in column resolution instead of here.

use std::fmt;
use std::io::{Read, Seek};
use std::path::Path;

use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use serde::Serialize;

use super::PipelineOptions;
use super::error::DispersionError;
use super::types::{CellValue, RawTable};

/// Which load step produced the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadPath {
    NamedSheet,
    FirstSheet,
    FirstSheetTopRow,
}

impl LoadPath {
    /// Whether this table came from the degraded top-row fallback
    pub fn is_degraded(self) -> bool {
        matches!(self, LoadPath::FirstSheetTopRow)
    }
}

impl fmt::Display for LoadPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPath::NamedSheet => write!(f, "named-sheet"),
            LoadPath::FirstSheet => write!(f, "first-sheet"),
            LoadPath::FirstSheetTopRow => write!(f, "first-sheet-top-row"),
        }
    }
}

/// A table together with where it was read from
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: RawTable,
    pub sheet: String,
    pub header_row: usize,
    pub path: LoadPath,
}

/// Open a workbook (.xlsx, .xls, .ods) and read its beneficiary table
pub fn load_table(path: &Path, options: &PipelineOptions) -> Result<LoadedTable, DispersionError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| DispersionError::load(path, e))?;

    let sheet_names = workbook.sheet_names();

    let attempt = if sheet_names.iter().any(|n| n == &options.sheet_name) {
        read_sheet(&mut workbook, &options.sheet_name, options.header_row)
    } else {
        Err(format!("sheet '{}' not found", options.sheet_name))
    };

    match attempt {
        Ok(table) => {
            return Ok(loaded(table, &options.sheet_name, options.header_row, LoadPath::NamedSheet));
        }
        Err(reason) => log::warn!("Falling back to first sheet: {}", reason),
    }

    let first_sheet = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| DispersionError::load(path, "workbook has no sheets"))?;

    match read_sheet(&mut workbook, &first_sheet, options.header_row) {
        Ok(table) => {
            return Ok(loaded(table, &first_sheet, options.header_row, LoadPath::FirstSheet));
        }
        Err(reason) => log::warn!(
            "Falling back to top-row header on sheet '{}': {}",
            first_sheet,
            reason
        ),
    }

    let table = read_sheet(&mut workbook, &first_sheet, 0)
        .map_err(|reason| DispersionError::load(path, reason))?;

    Ok(loaded(table, &first_sheet, 0, LoadPath::FirstSheetTopRow))
}

fn loaded(table: RawTable, sheet: &str, header_row: usize, path: LoadPath) -> LoadedTable {
    log::info!(
        "Read sheet '{}' with header on row {} via {}, {} rows",
        sheet,
        header_row + 1,
        path,
        table.len()
    );

    LoadedTable {
        table,
        sheet: sheet.to_string(),
        header_row,
        path,
    }
}

fn read_sheet<RS>(
    workbook: &mut Sheets<RS>,
    sheet: &str,
    header_row: usize,
) -> Result<RawTable, String>
where
    RS: Read + Seek,
{
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| format!("failed to read sheet '{}': {}", sheet, e))?;

    table_from_rows(physical_rows(&range), header_row)
        .map_err(|reason| format!("sheet '{}': {}", sheet, reason))
}

/// Rows of the range anchored at A1, so row indices are physical sheet rows
fn physical_rows(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let Some((first_row, first_col)) = range.start() else {
        return Vec::new();
    };

    let mut rows = vec![Vec::new(); first_row as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; first_col as usize];
        cells.extend(row.iter().map(CellValue::from));
        rows.push(cells);
    }

    rows
}

/// Split physical rows into a header row and data rows.
///
/// Fails when the header row is missing or blank. Rows above the header are
/// discarded, fully blank rows below it are skipped.
pub(crate) fn table_from_rows(
    mut rows: Vec<Vec<CellValue>>,
    header_row: usize,
) -> Result<RawTable, String> {
    if rows.len() <= header_row {
        return Err(format!(
            "header row {} is beyond the last row ({})",
            header_row + 1,
            rows.len()
        ));
    }

    let data = rows.split_off(header_row + 1);
    let header = rows.swap_remove(header_row);

    if header.iter().all(CellValue::is_blank) {
        return Err(format!("header row {} is empty", header_row + 1));
    }

    let width = data
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);

    let mut headers: Vec<String> = header.iter().map(CellValue::display).collect();
    headers.resize(width, String::new());

    let data = data
        .into_iter()
        .filter(|row| !row.iter().all(CellValue::is_blank))
        .collect();

    Ok(RawTable::new(headers, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::TempDir;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    /// Write a workbook with the given sheets; each sheet is a list of rows of strings
    fn write_workbook(dir: &TempDir, file: &str, sheets: &[(&str, Vec<Vec<&str>>)]) -> std::path::PathBuf {
        let path = dir.path().join(file);
        let mut workbook = Workbook::new();
        for (name, rows) in sheets {
            let sheet = workbook.add_worksheet();
            sheet.set_name(*name).unwrap();
            for (r, row) in rows.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    if !value.is_empty() {
                        sheet.write_string(r as u32, c as u16, *value).unwrap();
                    }
                }
            }
        }
        workbook.save(&path).unwrap();
        path
    }

    fn preamble(rows: usize) -> Vec<Vec<&'static str>> {
        let mut out = vec![vec!["ANEXO A4"]];
        out.resize(rows, vec![]);
        out
    }

    #[test]
    fn test_table_from_rows_skips_preamble_and_blank_rows() {
        let rows = vec![
            vec![text("Reporte")],
            vec![],
            vec![text("Nombre"), text("Clabe")],
            vec![text("ANA"), CellValue::Int(1)],
            vec![CellValue::Empty, text("  ")],
            vec![text("LUIS")],
        ];

        let table = table_from_rows(rows, 2).unwrap();
        assert_eq!(table.headers(), &["Nombre", "Clabe"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, "Clabe"), Some(&CellValue::Empty));
    }

    #[test]
    fn test_table_from_rows_rejects_short_or_blank_header() {
        assert!(table_from_rows(vec![vec![text("x")]], 7).is_err());
        assert!(table_from_rows(vec![vec![], vec![text("x")]], 0).is_err());
    }

    #[test]
    fn test_table_from_rows_widens_to_longest_row() {
        let rows = vec![
            vec![text("Nombre")],
            vec![text("ANA"), CellValue::Number(2.0)],
        ];

        let table = table_from_rows(rows, 0).unwrap();
        assert_eq!(table.headers(), &["Nombre", "Unnamed: 1"]);
    }

    #[test]
    fn test_named_sheet_with_offset_header() {
        let dir = TempDir::new().unwrap();
        let mut rows = preamble(7);
        rows.push(vec!["NOMBRE", "CLABE", "NETO"]);
        rows.push(vec!["ANA", "1", "10"]);
        let path = write_workbook(
            &dir,
            "anexo.xlsx",
            &[("Resumen", vec![vec!["x"]]), ("ADMON. PENSION", rows)],
        );

        let loaded = load_table(&path, &PipelineOptions::default()).unwrap();
        assert_eq!(loaded.path, LoadPath::NamedSheet);
        assert_eq!(loaded.sheet, "ADMON. PENSION");
        assert_eq!(loaded.table.headers(), &["NOMBRE", "CLABE", "NETO"]);
        assert_eq!(loaded.table.len(), 1);
    }

    #[test]
    fn test_first_sheet_fallback_keeps_offset() {
        let dir = TempDir::new().unwrap();
        let mut rows = preamble(7);
        rows.push(vec!["NOMBRE", "CLABE", "NETO"]);
        rows.push(vec!["ANA", "1", "10"]);
        let path = write_workbook(&dir, "anexo.xlsx", &[("Hoja1", rows)]);

        let loaded = load_table(&path, &PipelineOptions::default()).unwrap();
        assert_eq!(loaded.path, LoadPath::FirstSheet);
        assert_eq!(loaded.sheet, "Hoja1");
        assert_eq!(loaded.header_row, 7);
        assert!(!loaded.path.is_degraded());
    }

    #[test]
    fn test_top_row_fallback() {
        let dir = TempDir::new().unwrap();
        let rows = vec![
            vec!["Nombre Completo", "Clabe Interbancaria", "Importe"],
            vec!["ANA", "1", "10"],
        ];
        let path = write_workbook(&dir, "simple.xlsx", &[("Sheet1", rows)]);

        let loaded = load_table(&path, &PipelineOptions::default()).unwrap();
        assert_eq!(loaded.path, LoadPath::FirstSheetTopRow);
        assert!(loaded.path.is_degraded());
        assert_eq!(
            loaded.table.headers(),
            &["Nombre Completo", "Clabe Interbancaria", "Importe"]
        );
    }

    #[test]
    fn test_range_not_starting_at_a1_keeps_physical_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("offset.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("ADMON. PENSION").unwrap();
        sheet.write_string(7, 1, "NOMBRE").unwrap();
        sheet.write_string(7, 2, "CLABE").unwrap();
        sheet.write_string(7, 3, "NETO").unwrap();
        sheet.write_string(8, 1, "ANA").unwrap();
        workbook.save(&path).unwrap();

        let loaded = load_table(&path, &PipelineOptions::default()).unwrap();
        assert_eq!(loaded.path, LoadPath::NamedSheet);
        assert_eq!(loaded.table.headers(), &["Unnamed: 0", "NOMBRE", "CLABE", "NETO"]);
        assert_eq!(loaded.table.cell(0, "NOMBRE"), Some(&text("ANA")));
    }

    #[test]
    fn test_unreadable_file_is_load_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();

        let err = load_table(&path, &PipelineOptions::default()).unwrap_err();
        assert!(matches!(err, DispersionError::Load { .. }));
    }
}
