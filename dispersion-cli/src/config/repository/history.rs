//! Repository for processing history records

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "completed" => Ok(ProcessingStatus::Completed),
            "failed" => Ok(ProcessingStatus::Failed),
            other => bail!("Unknown processing status: {}", other),
        }
    }
}

/// One processed upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingRecord {
    pub id: Uuid,
    /// Generated template name, e.g. `plantilla_2025-08-15_10-30-00.xlsx`
    pub filename: String,
    pub original_filename: String,
    /// Set only when a template was stored
    pub processed_filename: Option<String>,
    pub rows_processed: i64,
    pub total_amount: Option<f64>,
    pub status: ProcessingStatus,
    pub error_message: Option<String>,
    /// Size of the uploaded file in bytes
    pub file_size: Option<i64>,
    /// Seconds
    pub processing_time: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessingRecord {
    /// Name of the stored template inside the processed directory
    pub fn stored_file_name(&self) -> Option<String> {
        self.processed_filename
            .as_ref()
            .map(|name| format!("{}_{}", self.id, name))
    }
}

const COLUMNS: &str = "id, filename, original_filename, processed_filename, rows_processed, \
     total_amount, processing_status, error_message, file_size, processing_time, \
     created_at, updated_at";

pub async fn insert_record(pool: &SqlitePool, record: &ProcessingRecord) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO processing_history ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        COLUMNS
    ))
    .bind(record.id.to_string())
    .bind(&record.filename)
    .bind(&record.original_filename)
    .bind(&record.processed_filename)
    .bind(record.rows_processed)
    .bind(record.total_amount)
    .bind(record.status.as_str())
    .bind(&record.error_message)
    .bind(record.file_size)
    .bind(record.processing_time)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await
    .context("Failed to insert processing record")?;

    Ok(())
}

pub async fn get_record(pool: &SqlitePool, id: Uuid) -> Result<Option<ProcessingRecord>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM processing_history WHERE id = ?",
        COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get processing record")?;

    row.as_ref().map(record_from_row).transpose()
}

/// All records, newest first. `search` matches file names and status as a substring.
pub async fn list_records(
    pool: &SqlitePool,
    search: Option<&str>,
) -> Result<Vec<ProcessingRecord>> {
    let rows = match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => {
            let pattern = format!("%{}%", term);
            sqlx::query(&format!(
                "SELECT {} FROM processing_history
                 WHERE filename LIKE ?1 OR original_filename LIKE ?1 OR processing_status LIKE ?1
                 ORDER BY created_at DESC",
                COLUMNS
            ))
            .bind(pattern)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(&format!(
                "SELECT {} FROM processing_history ORDER BY created_at DESC",
                COLUMNS
            ))
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list processing records")?;

    rows.iter().map(record_from_row).collect()
}

fn record_from_row(row: &SqliteRow) -> Result<ProcessingRecord> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("processing_status")?;

    Ok(ProcessingRecord {
        id: Uuid::parse_str(&id).with_context(|| format!("Invalid record id: {}", id))?,
        filename: row.try_get("filename")?,
        original_filename: row.try_get("original_filename")?,
        processed_filename: row.try_get("processed_filename")?,
        rows_processed: row.try_get("rows_processed")?,
        total_amount: row.try_get("total_amount")?,
        status: status.parse()?,
        error_message: row.try_get("error_message")?,
        file_size: row.try_get("file_size")?,
        processing_time: row.try_get("processing_time")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
