//! Column resolution over irregular, human-authored headers
//!
//! Headers are normalized (trim, uppercase, accent folding) and then matched
//! against ordered keyword lists. Keyword order is priority: the first keyword
//! that appears in any header wins, and for that keyword the leftmost header
//! wins.

use std::fmt;

use serde::Serialize;

use super::error::DispersionError;
use super::types::RawTable;

pub const NAME_KEYWORDS: &[&str] = &[
    "NOMBRE",
    "NOMBRE COMPLETO",
    "NOMBRECOMPLETO",
    "APELLIDO",
    "EMPLEADO",
];

pub const ACCOUNT_KEYWORDS: &[&str] = &[
    "CLABE",
    "CLABEINTERBANCARIA",
    "CLABE INTERBANCARIA",
    "CUENTA",
    "BANCO",
];

pub const AMOUNT_KEYWORDS: &[&str] = &[
    "NETO",
    "NETO A DEPOSITAR",
    "MONTO",
    "IMPORTE",
    "PENSION",
    "PAGO",
    "CANTIDAD",
];

/// The semantically meaningful source columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Account,
    Amount,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Name, Field::Account, Field::Amount];

    /// Keyword candidates in priority order
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Field::Name => NAME_KEYWORDS,
            Field::Account => ACCOUNT_KEYWORDS,
            Field::Amount => AMOUNT_KEYWORDS,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Name => write!(f, "name"),
            Field::Account => write!(f, "account"),
            Field::Amount => write!(f, "amount"),
        }
    }
}

/// Resolved header labels, all present in the table they were resolved from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnBinding {
    pub name_col: String,
    pub account_col: String,
    pub amount_col: String,
}

impl ColumnBinding {
    pub fn label(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name_col,
            Field::Account => &self.account_col,
            Field::Amount => &self.amount_col,
        }
    }
}

/// Fold a header label into its matching form
pub fn normalize_header(label: &str) -> String {
    label
        .trim()
        .to_uppercase()
        .chars()
        .map(|c| match c {
            'Á' => 'A',
            'É' => 'E',
            'Í' => 'I',
            'Ó' => 'O',
            'Ú' => 'U',
            'Ñ' => 'N',
            other => other,
        })
        .collect()
}

/// Replace every header of the table with its normalized form
pub fn normalize_table_headers(table: &mut RawTable) {
    table.map_headers(normalize_header);
    log::debug!("Normalized headers: {:?}", table.headers());
}

/// First header containing a keyword, trying keywords in order
pub fn find_column<'a>(headers: &'a [String], keywords: &[&str]) -> Option<&'a str> {
    for keyword in keywords {
        for header in headers {
            if header.contains(keyword) {
                return Some(header.as_str());
            }
        }
    }
    None
}

/// Resolve the name, account and amount columns of a header-normalized table
pub fn resolve_columns(table: &RawTable) -> Result<ColumnBinding, DispersionError> {
    let headers = table.headers();

    let name = find_column(headers, Field::Name.keywords());
    let account = find_column(headers, Field::Account.keywords());
    let amount = find_column(headers, Field::Amount.keywords());

    match (name, account, amount) {
        (Some(name), Some(account), Some(amount)) => {
            log::debug!(
                "Resolved columns - name: {}, account: {}, amount: {}",
                name,
                account,
                amount
            );
            Ok(ColumnBinding {
                name_col: name.to_string(),
                account_col: account.to_string(),
                amount_col: amount.to_string(),
            })
        }
        _ => {
            log::error!(
                "Columns found - name: {:?}, account: {:?}, amount: {:?}",
                name,
                account,
                amount
            );
            let missing = Field::ALL
                .into_iter()
                .zip([name, account, amount])
                .filter(|(_, found)| found.is_none())
                .map(|(field, _)| field)
                .collect();
            Err(DispersionError::MissingColumns(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    fn table(labels: &[&str]) -> RawTable {
        let mut table = RawTable::new(headers(labels), vec![]);
        normalize_table_headers(&mut table);
        table
    }

    #[test]
    fn test_normalize_folds_accents_and_case() {
        assert_eq!(normalize_header("  Año de Pensión "), "ANO DE PENSION");
        assert_eq!(normalize_header("Clabe Interbancaria"), "CLABE INTERBANCARIA");
        assert_eq!(normalize_header("número"), "NUMERO");
        assert_eq!(normalize_header("ÉXITO ÍNDICE ÚNICO"), "EXITO INDICE UNICO");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for label in [
            " Nombre Completo ",
            "Pensión Neta",
            "Señor\t",
            "IMPORTE",
            "",
            "straße",
            "Unnamed: 3",
        ] {
            let once = normalize_header(label);
            assert_eq!(normalize_header(&once), once, "label {:?}", label);
        }
    }

    #[test]
    fn test_keyword_priority_beats_column_order() {
        let headers = headers(&["PENSION", "NETO A DEPOSITAR"]);
        assert_eq!(
            find_column(&headers, AMOUNT_KEYWORDS),
            Some("NETO A DEPOSITAR")
        );
    }

    #[test]
    fn test_leftmost_header_wins_for_same_keyword() {
        let headers = headers(&["ID", "NOMBRE DEL BANCO", "NOMBRE"]);
        assert_eq!(find_column(&headers, NAME_KEYWORDS), Some("NOMBRE DEL BANCO"));
    }

    #[test]
    fn test_substring_match() {
        let headers = headers(&["NO.", "NUMERO DE CUENTA CLABE"]);
        assert_eq!(
            find_column(&headers, ACCOUNT_KEYWORDS),
            Some("NUMERO DE CUENTA CLABE")
        );
        assert_eq!(find_column(&headers, AMOUNT_KEYWORDS), None);
    }

    #[test]
    fn test_resolve_typical_headers() {
        let table = table(&["No.", "Nombre Completo", "Clabe Interbancaria", "Importe"]);
        let binding = resolve_columns(&table).unwrap();

        assert_eq!(binding.name_col, "NOMBRE COMPLETO");
        assert_eq!(binding.account_col, "CLABE INTERBANCARIA");
        assert_eq!(binding.amount_col, "IMPORTE");
        assert_eq!(binding.label(Field::Amount), "IMPORTE");
    }

    #[test]
    fn test_resolve_accented_headers() {
        let table = table(&["Empleado", "Cuenta", "Pensión"]);
        let binding = resolve_columns(&table).unwrap();

        assert_eq!(binding.name_col, "EMPLEADO");
        assert_eq!(binding.account_col, "CUENTA");
        assert_eq!(binding.amount_col, "PENSION");
    }

    #[test]
    fn test_resolve_reports_every_missing_field() {
        let table = table(&["Beneficiario", "Clabe", "Fecha"]);
        let err = resolve_columns(&table).unwrap_err();

        assert_eq!(err.missing_fields(), &[Field::Name, Field::Amount]);
    }
}
