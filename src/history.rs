//! History commands: list, show, and delete stored analyses.
//!
//! Used by `grd history`, `grd show`, and `grd delete`.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::db;
use crate::store::HistoryStore;

pub async fn run_history(config: &Config, username: &str, limit: Option<usize>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = HistoryStore::new(pool);

    let mut history = store.history(username).await?;
    let total = history.len();
    if let Some(lim) = limit {
        history.truncate(lim);
    }

    if history.is_empty() {
        println!("No analyses for '{}'.", username);
        store.pool().close().await;
        return Ok(());
    }

    println!("Analyses for '{}' ({} total):", username, total);
    println!();
    println!("  {:>4}  {:<19}  {:<36}  {:>12}", "ID", "TIMESTAMP", "FILE", "SIZE (CHARS)");
    println!("  {}", "-".repeat(78));
    for record in &history {
        let ts: String = record.timestamp.chars().take(19).collect();
        println!(
            "  {:>4}  {:<19}  {:<36}  {:>12}",
            record.id, ts, record.file_name, record.file_size_chars
        );
    }

    store.pool().close().await;
    Ok(())
}

pub async fn run_show(config: &Config, username: &str, id: i64) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = HistoryStore::new(pool);

    let record = store.get_by_id(username, id).await?;
    store.pool().close().await;

    let record = match record {
        Some(r) => r,
        None => bail!("analysis not found: {} #{}", username, id),
    };

    println!("--- Analysis ---");
    println!("user:      {}", record.username);
    println!("id:        {}", record.id);
    println!("file:      {}", record.file_name);
    println!("timestamp: {}", record.timestamp);
    println!("size:      {} chars", record.file_size_chars);
    println!();
    println!("--- Result ---");
    println!("{}", record.result);

    Ok(())
}

pub async fn run_delete(
    config: &Config,
    username: &str,
    id: Option<i64>,
    all: bool,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = HistoryStore::new(pool);

    match (id, all) {
        (Some(_), true) => {
            store.pool().close().await;
            bail!("pass either an id or --all, not both");
        }
        (Some(id), false) => {
            let removed = store.delete(username, id).await?;
            if removed {
                println!("Deleted analysis #{} for '{}'.", id, username);
            } else {
                println!("No analysis #{} for '{}' — nothing to delete.", id, username);
            }
        }
        (None, true) => {
            store.delete_all(username).await?;
            println!("Deleted all analyses for '{}'.", username);
        }
        (None, false) => {
            store.pool().close().await;
            bail!("pass an id to delete, or --all to clear the whole history");
        }
    }

    store.pool().close().await;
    Ok(())
}
