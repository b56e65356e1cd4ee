//! Upload, history and download command handlers

use anyhow::{Context, Result};
use colored::*;

use super::{DownloadArgs, HistoryCommands, UploadArgs};
use crate::config::Config;
use crate::config::repository::connect;
use crate::config::repository::history::{ProcessingRecord, ProcessingStatus};
use crate::services::ProcessingService;

async fn open_service(config: &Config) -> Result<ProcessingService> {
    let pool = connect(&config.database_path()).await?;
    Ok(ProcessingService::new(
        pool,
        config.processed_dir(),
        config.pipeline.clone(),
    ))
}

pub async fn handle_upload_command(args: UploadArgs, config: &Config) -> Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let service = open_service(config).await?;
    let record = service.process_path(&args.input).await?;

    println!(
        "{} {} as {}",
        "Processed".green().bold(),
        record.original_filename,
        record.id.to_string().cyan()
    );
    println!(
        "  {} rows, total {:.2}, stored as {}",
        record.rows_processed,
        record.total_amount.unwrap_or_default(),
        record.filename
    );

    Ok(())
}

pub async fn handle_history_command(cmd: HistoryCommands, config: &Config) -> Result<()> {
    let service = open_service(config).await?;

    match cmd {
        HistoryCommands::List { search, json } => {
            let records = service.list_records(search.as_deref()).await?;

            if json {
                let out = serde_json::to_string_pretty(&records)
                    .context("Failed to serialize history")?;
                println!("{}", out);
                return Ok(());
            }

            if records.is_empty() {
                println!("{}", "No processing records found.".dimmed());
                return Ok(());
            }

            for record in &records {
                print_summary_line(record);
            }
            println!();
            println!("{} record(s)", records.len());
        }
        HistoryCommands::Show { id } => {
            let record = service.get_record(id).await?;
            print_details(&record);
        }
    }

    Ok(())
}

pub async fn handle_download_command(args: DownloadArgs, config: &Config) -> Result<()> {
    let service = open_service(config).await?;
    let source = service.download_path(args.id).await?;
    let record = service.get_record(args.id).await?;

    let dest = if args.dest.is_dir() {
        args.dest.join(&record.filename)
    } else {
        args.dest
    };

    tokio::fs::copy(&source, &dest)
        .await
        .with_context(|| format!("Failed to copy template to {}", dest.display()))?;

    println!(
        "{} {}",
        "Saved".green().bold(),
        dest.display().to_string().cyan()
    );
    Ok(())
}

fn status_label(status: ProcessingStatus) -> ColoredString {
    match status {
        ProcessingStatus::Completed => status.as_str().green(),
        ProcessingStatus::Failed => status.as_str().red(),
    }
}

fn print_summary_line(record: &ProcessingRecord) {
    println!(
        "{}  {}  {:<9}  {:>5} rows  {}",
        record.id.to_string().dimmed(),
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
        status_label(record.status),
        record.rows_processed,
        record.original_filename
    );
}

fn print_details(record: &ProcessingRecord) {
    println!("{}", record.original_filename.bold());
    println!("  Id:         {}", record.id);
    println!("  Status:     {}", status_label(record.status));
    println!("  Template:   {}", record.filename);
    println!("  Rows:       {}", record.rows_processed);
    if let Some(total) = record.total_amount {
        println!("  Total:      {:.2}", total);
    }
    if let Some(size) = record.file_size {
        println!("  Input size: {} bytes", size);
    }
    if let Some(secs) = record.processing_time {
        println!("  Took:       {:.2}s", secs);
    }
    println!("  Created:    {}", record.created_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(err) = &record.error_message {
        println!("  Error:      {}", err.red());
    }
}
