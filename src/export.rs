//! Export the analysis history as JSON.
//!
//! Emits the canonical flat layout (`{"analyses": [...]}` with every
//! record carrying its `username`), which `grd import` accepts back, so
//! exports double as backups.

use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use sqlx::Row;
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::models::AnalysisRecord;

#[derive(Serialize)]
struct ExportData {
    exported_at: String,
    analyses: Vec<AnalysisRecord>,
}

/// Export all analysis records as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let pool = db::connect(config).await?;

    let rows = sqlx::query(
        "SELECT username, id, timestamp, file_name, file_size_chars, result \
         FROM analyses ORDER BY username, timestamp, id",
    )
    .fetch_all(&pool)
    .await?;

    let analyses: Vec<AnalysisRecord> = rows
        .iter()
        .map(|row| AnalysisRecord {
            id: row.get("id"),
            username: row.get("username"),
            timestamp: row.get("timestamp"),
            file_name: row.get("file_name"),
            file_size_chars: row.get("file_size_chars"),
            result: row.get("result"),
        })
        .collect();

    let count = analyses.len();

    let data = ExportData {
        exported_at: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        analyses,
    };
    let json = serde_json::to_string_pretty(&data)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            eprintln!("Exported {} analyses to {}", count, path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    pool.close().await;
    Ok(())
}
