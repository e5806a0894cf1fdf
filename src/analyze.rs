//! Analyze pipeline orchestration.
//!
//! Coordinates the full flow for one uploaded document: read bytes →
//! extract text → generate the critique → persist the record. `--dry-run`
//! stops after extraction, which is useful for checking that a document
//! yields text before spending an API call on it.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::analyzer;
use crate::config::Config;
use crate::db;
use crate::extract;
use crate::store::HistoryStore;

pub async fn run_analyze(
    config: &Config,
    file: &Path,
    username: &str,
    dry_run: bool,
) -> Result<()> {
    let content_type = match extract::content_type_for_path(file) {
        Some(ct) => ct,
        None => bail!(
            "unsupported file type: {} (expected .pdf or .docx)",
            file.display()
        ),
    };

    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let text = extract::extract_text(&bytes, content_type)?;

    if text.trim().is_empty() {
        bail!("no text could be extracted from {}", file.display());
    }

    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    println!("file:      {}", file_name);
    println!("extracted: {} chars", text.chars().count());

    if dry_run {
        println!("dry run — skipping critique and save");
        return Ok(());
    }

    let critique = analyzer::generate_critique(&config.analyzer, &text).await?;

    let pool = db::connect(config).await?;
    let store = HistoryStore::new(pool);
    let record = store.save(username, &file_name, &critique).await?;
    store.pool().close().await;

    println!("saved:     analysis #{} for '{}'", record.id, username);
    println!();
    println!("{}", record.result);

    Ok(())
}
