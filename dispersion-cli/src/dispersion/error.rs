//! Failures of the dispersion pipeline

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::columns::Field;

/// A fatal pipeline failure. Dropped rows are not errors and never show up here.
#[derive(Error, Debug)]
pub enum DispersionError {
    #[error("Failed to load workbook {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    #[error("Missing columns: {}", join_fields(.0))]
    MissingColumns(Vec<Field>),

    #[error("Failed to write template {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },
}

impl DispersionError {
    pub fn load(path: &Path, reason: impl ToString) -> Self {
        Self::Load {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn write(path: &Path, reason: impl ToString) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// The semantic fields that could not be matched, if that is what failed
    pub fn missing_fields(&self) -> &[Field] {
        match self {
            Self::MissingColumns(fields) => fields,
            _ => &[],
        }
    }
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
