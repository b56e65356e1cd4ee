//! Upload processing with stored outputs and history
//!
//! Each upload gets its own id and its own temporary directory, so concurrent
//! uploads never share file names. The temporary directory is removed on every
//! exit path when it goes out of scope.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};
use rust_decimal::prelude::ToPrimitive;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::config::repository::history::{self, ProcessingRecord, ProcessingStatus};
use crate::dispersion::{self, PipelineOptions, ProcessOutcome, template_file_name};

const EXCEL_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// Stamp used in generated template names
const TEMPLATE_STAMP: &str = "%Y-%m-%d_%H-%M-%S";

/// Whether an uploaded file name looks like an Excel workbook
pub fn is_excel_filename(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| EXCEL_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

pub struct ProcessingService {
    pool: SqlitePool,
    processed_dir: PathBuf,
    options: PipelineOptions,
}

impl ProcessingService {
    pub fn new(pool: SqlitePool, processed_dir: PathBuf, options: PipelineOptions) -> Self {
        Self {
            pool,
            processed_dir,
            options,
        }
    }

    /// Process a workbook read from disk, recording it under its file name
    pub async fn process_path(&self, path: &Path) -> Result<ProcessingRecord> {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("Input path has no file name")?;

        self.process_upload(&name, &content).await
    }

    /// Process an uploaded workbook and record the outcome.
    ///
    /// Failures after validation are recorded with status `failed` before the
    /// error is returned.
    pub async fn process_upload(
        &self,
        original_filename: &str,
        content: &[u8],
    ) -> Result<ProcessingRecord> {
        if !is_excel_filename(original_filename) {
            bail!("Only Excel files (.xlsx, .xls) are accepted: {}", original_filename);
        }

        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let filename = template_file_name(&Local::now().format(TEMPLATE_STAMP).to_string());
        let started = Instant::now();

        log::info!(
            "Processing upload {} ({}, {} bytes)",
            id,
            original_filename,
            content.len()
        );

        let result = self
            .run_in_workspace(id, original_filename, content, &filename)
            .await;

        let mut record = ProcessingRecord {
            id,
            filename: filename.clone(),
            original_filename: original_filename.to_string(),
            processed_filename: None,
            rows_processed: 0,
            total_amount: None,
            status: ProcessingStatus::Completed,
            error_message: None,
            file_size: i64::try_from(content.len()).ok(),
            processing_time: Some(started.elapsed().as_secs_f64()),
            created_at,
            updated_at: Utc::now(),
        };

        match result {
            Ok(outcome) => {
                record.processed_filename = Some(filename);
                record.rows_processed = outcome.record_count as i64;
                record.total_amount = outcome.total_amount.to_f64();

                if let Err(e) = history::insert_record(&self.pool, &record).await {
                    // No history row will point at the stored template
                    if let Err(rm_err) = tokio::fs::remove_file(&outcome.output_path).await {
                        log::warn!(
                            "Failed to remove unrecorded template {}: {}",
                            outcome.output_path.display(),
                            rm_err
                        );
                    }
                    return Err(e);
                }
                log::info!(
                    "Upload {} completed: {} rows in {:.2}s",
                    id,
                    record.rows_processed,
                    record.processing_time.unwrap_or_default()
                );
                Ok(record)
            }
            Err(e) => {
                record.status = ProcessingStatus::Failed;
                record.error_message = Some(format!("{:#}", e));

                log::error!("Upload {} failed: {:#}", id, e);
                if let Err(db_err) = history::insert_record(&self.pool, &record).await {
                    log::error!("Failed to record failed upload {}: {:#}", id, db_err);
                }
                Err(e)
            }
        }
    }

    /// Run the pipeline in a scoped temporary directory and store the output
    async fn run_in_workspace(
        &self,
        id: Uuid,
        original_filename: &str,
        content: &[u8],
        filename: &str,
    ) -> Result<ProcessOutcome> {
        let workspace = tempfile::Builder::new()
            .prefix("dispersion-")
            .tempdir()
            .context("Failed to create temporary directory")?;

        let input_path = workspace.path().join(sanitize_file_name(original_filename));
        let output_path = workspace.path().join(filename);

        tokio::fs::write(&input_path, content)
            .await
            .with_context(|| format!("Failed to write upload to {}", input_path.display()))?;

        let options = self.options.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            dispersion::process(&input_path, &output_path, &options)
        })
        .await
        .context("Processing task failed")??;

        tokio::fs::create_dir_all(&self.processed_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create processed directory: {}",
                    self.processed_dir.display()
                )
            })?;

        let stored_path = self.processed_dir.join(format!("{}_{}", id, filename));
        move_file(&outcome.output_path, &stored_path).await?;

        Ok(ProcessOutcome {
            output_path: stored_path,
            ..outcome
        })
    }

    pub async fn get_record(&self, id: Uuid) -> Result<ProcessingRecord> {
        history::get_record(&self.pool, id)
            .await?
            .with_context(|| format!("Processing record not found: {}", id))
    }

    pub async fn list_records(&self, search: Option<&str>) -> Result<Vec<ProcessingRecord>> {
        history::list_records(&self.pool, search).await
    }

    /// Location of the stored template for a processing id
    pub async fn download_path(&self, id: Uuid) -> Result<PathBuf> {
        let record = self.get_record(id).await?;

        let stored = record
            .stored_file_name()
            .with_context(|| format!("No template was generated for {}", id))?;

        let path = self.processed_dir.join(stored);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            bail!("Template file not found on disk: {}", path.display());
        }

        Ok(path)
    }
}

/// Strip any directory components from an uploaded file name
fn sanitize_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "upload.xlsx".to_string())
}

/// Rename, falling back to copy + remove across filesystems
async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }

    tokio::fs::copy(from, to).await.with_context(|| {
        format!("Failed to move {} to {}", from.display(), to.display())
    })?;
    tokio::fs::remove_file(from).await.ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::repository::connect;
    use rust_xlsxwriter::Workbook;
    use tempfile::TempDir;

    fn anexo_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("ADMON. PENSION").unwrap();
        sheet.write_string(0, 0, "ANEXO A4").unwrap();
        for (c, h) in ["Nombre", "Clabe", "Neto"].iter().enumerate() {
            sheet.write_string(7, c as u16, *h).unwrap();
        }
        sheet.write_string(8, 0, "ANA PEREZ").unwrap();
        sheet.write_number(8, 1, 4.5e17).unwrap();
        sheet.write_number(8, 2, 1000.456).unwrap();
        sheet.write_string(9, 0, "TOTAL").unwrap();
        sheet.write_number(9, 1, 1.0).unwrap();
        sheet.write_number(9, 2, 1000.456).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    fn bad_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Folio").unwrap();
        sheet.write_string(0, 1, "Fecha").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    async fn service(dir: &TempDir) -> ProcessingService {
        let pool = connect(&dir.path().join("history.db")).await.unwrap();
        ProcessingService::new(
            pool,
            dir.path().join("processed"),
            PipelineOptions::default(),
        )
    }

    #[test]
    fn test_is_excel_filename() {
        assert!(is_excel_filename("ANEXO A4.xlsx"));
        assert!(is_excel_filename("viejo.XLS"));
        assert!(!is_excel_filename("datos.csv"));
        assert!(!is_excel_filename("xlsx"));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/anexo.xlsx"), "anexo.xlsx");
        assert_eq!(sanitize_file_name("anexo.xlsx"), "anexo.xlsx");
        assert_eq!(sanitize_file_name(".."), "upload.xlsx");
    }

    #[tokio::test]
    async fn test_upload_stores_template_and_history() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;

        let record = service
            .process_upload("ANEXO A4 Agosto.xlsx", &anexo_bytes())
            .await
            .unwrap();

        assert_eq!(record.status, ProcessingStatus::Completed);
        assert_eq!(record.rows_processed, 1);
        assert_eq!(record.total_amount, Some(1000.46));
        assert!(record.filename.starts_with("plantilla_"));
        assert!(record.filename.ends_with(".xlsx"));

        let path = service.download_path(record.id).await.unwrap();
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with(&record.id.to_string()));

        let listed = service.list_records(None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, record.id);
    }

    #[tokio::test]
    async fn test_failed_upload_is_recorded() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;

        let err = service.process_upload("malo.xlsx", &bad_bytes()).await.unwrap_err();
        assert!(err.to_string().contains("Missing columns"));

        let listed = service.list_records(Some("failed")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].processed_filename, None);
        assert!(listed[0].error_message.as_deref().unwrap().contains("name"));

        assert!(service.download_path(listed[0].id).await.is_err());
    }

    #[tokio::test]
    async fn test_history_write_failure_removes_stored_template() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        service.pool.close().await;

        assert!(service.process_upload("anexo.xlsx", &anexo_bytes()).await.is_err());

        let stored: Vec<_> = std::fs::read_dir(dir.path().join("processed"))
            .unwrap()
            .collect();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_non_excel_upload_rejected_without_history() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;

        assert!(service.process_upload("datos.csv", b"a,b").await.is_err());
        assert!(service.list_records(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;

        assert!(service.get_record(Uuid::new_v4()).await.is_err());
        assert!(service.download_path(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_process_path_uses_file_name() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        let input = dir.path().join("anexo.xlsx");
        std::fs::write(&input, anexo_bytes()).unwrap();

        let record = service.process_path(&input).await.unwrap();

        assert_eq!(record.original_filename, "anexo.xlsx");
        assert_eq!(record.file_size, Some(std::fs::metadata(&input).unwrap().len() as i64));
    }
}
