//! Row normalization: raw beneficiary rows into dispersion records

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::columns::{ColumnBinding, Field};
use super::error::DispersionError;
use super::types::{CellValue, RawTable};

/// Payment concept written on every record
pub const CONCEPT: &str = "PENSION POR RENTA VITALICIA";

/// Names of trailer/subtotal rows, compared case-insensitively against the whole name
pub const SUMMARY_LABELS: &[&str] = &["NETO A DEPOSITAR", "COMISION", "SUBTOTAL", "IVA", "TOTAL"];

/// Width of a CLABE account identifier
pub const ACCOUNT_DIGITS: usize = 18;

const AMOUNT_SCALE: u32 = 2;

/// One accepted output row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub name: String,
    /// Exactly 18 digits, zero-padded
    pub account: String,
    /// Rounded to 2 fraction digits
    pub amount: Decimal,
    pub concept: &'static str,
}

/// Why a row was left out of the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingName,
    InvalidAccount,
    MissingAmount,
    SummaryRow,
}

/// Accepted records plus counts of what was dropped
#[derive(Debug, Clone, Default)]
pub struct NormalizedRows {
    pub records: Vec<NormalizedRecord>,
    pub dropped_invalid: usize,
    pub dropped_summary: usize,
}

impl NormalizedRows {
    pub fn total_amount(&self) -> Decimal {
        self.records.iter().map(|r| r.amount).sum()
    }
}

/// Normalize and filter every data row of the table
pub fn normalize_rows(
    table: &RawTable,
    binding: &ColumnBinding,
) -> Result<NormalizedRows, DispersionError> {
    let index = |field: Field| {
        table
            .column_index(binding.label(field))
            .ok_or_else(|| DispersionError::MissingColumns(vec![field]))
    };
    let name_idx = index(Field::Name)?;
    let account_idx = index(Field::Account)?;
    let amount_idx = index(Field::Amount)?;

    let mut result = NormalizedRows::default();

    for row in table.rows() {
        match normalize_row(&row[name_idx], &row[account_idx], &row[amount_idx]) {
            Ok(record) => result.records.push(record),
            Err(DropReason::SummaryRow) => result.dropped_summary += 1,
            Err(_) => result.dropped_invalid += 1,
        }
    }

    log::debug!(
        "Normalized {} rows: {} accepted, {} invalid, {} summary",
        table.len(),
        result.records.len(),
        result.dropped_invalid,
        result.dropped_summary
    );

    Ok(result)
}

/// Build a record from the three resolved cells, or say why the row is dropped.
///
/// Field validity is checked before the summary-label filter.
pub fn normalize_row(
    name: &CellValue,
    account: &CellValue,
    amount: &CellValue,
) -> Result<NormalizedRecord, DropReason> {
    let name = normalize_name(name).ok_or(DropReason::MissingName)?;
    let account = normalize_account(account).ok_or(DropReason::InvalidAccount)?;
    let amount = normalize_amount(amount).ok_or(DropReason::MissingAmount)?;

    if is_summary_label(&name) {
        return Err(DropReason::SummaryRow);
    }

    Ok(NormalizedRecord {
        name,
        account,
        amount,
        concept: CONCEPT,
    })
}

/// The name as found in the sheet; blank cells have no name
pub fn normalize_name(cell: &CellValue) -> Option<String> {
    if cell.is_blank() {
        return None;
    }
    Some(cell.display())
}

/// Coerce an account cell into an 18-digit, zero-padded identifier.
///
/// Digit-only text and integer cells are taken exactly. Floats and other
/// numeric text (scientific notation) are truncated toward zero. Anything
/// negative, non-numeric or wider than 18 digits has no account.
pub fn normalize_account(cell: &CellValue) -> Option<String> {
    let value: u64 = match cell {
        CellValue::Int(i) => u64::try_from(*i).ok()?,
        CellValue::Number(f) => truncate_float(*f)?,
        CellValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok()?
            } else {
                truncate_float(s.parse().ok()?)?
            }
        }
        _ => return None,
    };

    let account = format!("{:0width$}", value, width = ACCOUNT_DIGITS);
    if account.len() == ACCOUNT_DIGITS {
        Some(account)
    } else {
        None
    }
}

fn truncate_float(f: f64) -> Option<u64> {
    if !f.is_finite() || f < 0.0 || f >= 1e18 {
        return None;
    }
    Some(f.trunc() as u64)
}

/// Coerce an amount cell into a decimal rounded to 2 places.
///
/// Floats keep their exact binary value before rounding, so `2.675` (stored as
/// `2.67499...`) rounds to `2.67`.
pub fn normalize_amount(cell: &CellValue) -> Option<Decimal> {
    let value = match cell {
        CellValue::Int(i) => Decimal::from(*i),
        CellValue::Number(f) if f.is_finite() => Decimal::from_f64_retain(*f)?,
        CellValue::Text(s) => {
            let f: f64 = s.trim().parse().ok()?;
            if !f.is_finite() {
                return None;
            }
            Decimal::from_f64_retain(f)?
        }
        _ => return None,
    };

    Some(value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointNearestEven))
}

/// Whether a name is one of the trailer/subtotal labels
pub fn is_summary_label(name: &str) -> bool {
    let upper = name.to_uppercase();
    SUMMARY_LABELS.iter().any(|label| upper == *label)
}
