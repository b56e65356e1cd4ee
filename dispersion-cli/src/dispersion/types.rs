//! Tabular data as read from the source workbook

use std::collections::HashMap;

use calamine::Data;

/// A single cell from the source sheet
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Number(f64),
    Bool(bool),
    /// Dates, durations and error cells, kept in display form only
    Other(String),
}

impl CellValue {
    /// True for empty cells and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell as text, the way a header label or name is shown
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Number(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            CellValue::Bool(b) => b.to_string().to_uppercase(),
            CellValue::Other(s) => s.clone(),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) if s.is_empty() => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Int(i) => CellValue::Int(*i),
            Data::Float(f) => CellValue::Number(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => CellValue::Other(dt.to_string()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Other(s.clone()),
            Data::Error(e) => CellValue::Other(format!("{:?}", e)),
        }
    }
}

/// Rows of a sheet keyed by header label
///
/// Labels are unique: blank headers become `Unnamed: <col>` and repeated
/// labels get a `.<n>` suffix. Every row has exactly one cell per label.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let headers = dedupe_labels(headers);
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();

        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a header label, exact match
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == label)
    }

    /// Cell under `label` in data row `row`
    pub fn cell(&self, row: usize, label: &str) -> Option<&CellValue> {
        let col = self.column_index(label)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Rewrite every header label in place, keeping labels unique
    pub fn map_headers<F>(&mut self, f: F)
    where
        F: Fn(&str) -> String,
    {
        let mapped = self.headers.iter().map(|h| f(h)).collect();
        self.headers = dedupe_labels(mapped);
    }
}

fn dedupe_labels(labels: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(labels.len());

    for (col, label) in labels.into_iter().enumerate() {
        let label = if label.trim().is_empty() {
            format!("Unnamed: {}", col)
        } else {
            label
        };

        let count = seen.entry(label.clone()).or_insert(0);
        if *count == 0 {
            out.push(label);
        } else {
            out.push(format!("{}.{}", label, count));
        }
        *count += 1;
    }

    out
}
