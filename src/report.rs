//! Report command: render a stored analysis to a document on disk.
//!
//! The renderers themselves only produce buffers; this command decides
//! the output path (`--out`, or the suggested download name in the
//! current directory).

use anyhow::{bail, Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db;
use crate::render;
use crate::store::HistoryStore;

pub async fn run_report(
    config: &Config,
    username: &str,
    id: Option<i64>,
    format: &str,
    out: Option<&Path>,
    summary: bool,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = HistoryStore::new(pool);
    let generated_at = Local::now().naive_local();
    let prefix = &config.reports.filename_prefix;

    let (buffer, suggested) = if summary {
        let history = store.history(username).await?;
        let buffer = render::docx::render_summary_docx(
            username,
            &history,
            generated_at,
            &config.reports.system_name,
        )?;
        let name = render::suggested_filename(prefix, "history", username, generated_at, "docx");
        (buffer, name)
    } else {
        let id = match id {
            Some(id) => id,
            None => {
                store.pool().close().await;
                bail!("pass an analysis id, or --summary for the whole history");
            }
        };
        let record = store.get_by_id(username, id).await?;
        let record = match record {
            Some(r) => r,
            None => {
                store.pool().close().await;
                bail!("analysis not found: {} #{}", username, id);
            }
        };

        let input = render::ReportInput {
            username: &record.username,
            file_name: &record.file_name,
            result: &record.result,
            timestamp: &record.timestamp,
            generated_at,
            system_name: &config.reports.system_name,
        };

        let (buffer, ext) = match format {
            "docx" => (render::docx::render_docx(&input)?, "docx"),
            "pdf" => (render::pdf::render_pdf(&input)?, "pdf"),
            other => {
                store.pool().close().await;
                bail!("unknown report format: '{}'. Must be docx or pdf.", other);
            }
        };
        let name =
            render::suggested_filename(prefix, &record.file_name, username, generated_at, ext);
        (buffer, name)
    };

    store.pool().close().await;

    let path: PathBuf = out.map(Path::to_path_buf).unwrap_or_else(|| suggested.into());
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&path, &buffer)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    println!("Wrote {} ({} bytes)", path.display(), buffer.len());
    Ok(())
}
