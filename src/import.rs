//! One-time import of legacy JSON history files.
//!
//! The retired dashboard left two incompatible layouts behind for the same
//! file name: a mapping from username to that user's record list, and a
//! flat `{"analyses": [...]}` list where each record carries its own
//! `username`. Both are accepted here, normalized, and loaded into the
//! database. The flat list is also what `grd export` emits, so an export
//! can be re-imported.
//!
//! Records are inserted oldest-first per user with freshly assigned ids;
//! legacy ids are not trusted to be unique after the old delete behavior.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::store::HistoryStore;

#[derive(Debug, Deserialize)]
struct LegacyRecord {
    #[serde(default)]
    username: Option<String>,
    timestamp: String,
    file_name: String,
    #[serde(default)]
    file_size_chars: i64,
    result: String,
}

/// A normalized record ready for insertion.
#[derive(Debug)]
pub struct ImportedRecord {
    pub username: String,
    pub timestamp: String,
    pub file_name: String,
    pub file_size_chars: i64,
    pub result: String,
}

/// Parse either legacy layout into normalized records. Entries that fail
/// to deserialize are skipped and counted, not fatal.
pub fn parse_legacy(value: &serde_json::Value) -> Result<(Vec<ImportedRecord>, usize)> {
    let object = match value.as_object() {
        Some(o) => o,
        None => bail!("unrecognized history layout: top level is not an object"),
    };

    let mut records = Vec::new();
    let mut skipped = 0usize;

    if let Some(list) = object.get("analyses").and_then(|a| a.as_array()) {
        // Flat layout: each record names its user.
        for entry in list {
            match serde_json::from_value::<LegacyRecord>(entry.clone()) {
                Ok(r) => match r.username {
                    Some(username) if !username.trim().is_empty() => {
                        records.push(ImportedRecord {
                            username,
                            timestamp: r.timestamp,
                            file_name: r.file_name,
                            file_size_chars: r.file_size_chars,
                            result: r.result,
                        });
                    }
                    _ => skipped += 1,
                },
                Err(_) => skipped += 1,
            }
        }
    } else {
        // Mapping layout: username → record list.
        for (username, entries) in object {
            let entries = match entries.as_array() {
                Some(e) => e,
                None => bail!(
                    "unrecognized history layout: value for '{}' is not a list",
                    username
                ),
            };
            for entry in entries {
                match serde_json::from_value::<LegacyRecord>(entry.clone()) {
                    Ok(r) => records.push(ImportedRecord {
                        username: username.clone(),
                        timestamp: r.timestamp,
                        file_name: r.file_name,
                        file_size_chars: r.file_size_chars,
                        result: r.result,
                    }),
                    Err(_) => skipped += 1,
                }
            }
        }
    }

    // Oldest first, so assigned ids follow the original creation order.
    records.sort_by(|a, b| {
        a.username
            .cmp(&b.username)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });

    Ok((records, skipped))
}

pub async fn run_import(config: &Config, file: &Path, dry_run: bool) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).with_context(|| "Failed to parse history file as JSON")?;

    let (records, skipped) = parse_legacy(&value)?;

    let mut per_user: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &records {
        *per_user.entry(record.username.as_str()).or_default() += 1;
    }

    println!("Import from {}", file.display());
    println!();
    println!("  {:<24} {:>8}", "USER", "RECORDS");
    println!("  {}", "-".repeat(34));
    for (username, count) in &per_user {
        println!("  {:<24} {:>8}", username, count);
    }
    println!();
    println!("  total: {}, skipped: {}", records.len(), skipped);

    if dry_run {
        println!("  dry run — nothing written");
        return Ok(());
    }

    let pool = db::connect(config).await?;
    let store = HistoryStore::new(pool);
    for record in &records {
        store
            .insert_imported(
                &record.username,
                &record.timestamp,
                &record.file_name,
                record.file_size_chars,
                &record.result,
            )
            .await?;
    }
    store.pool().close().await;

    println!("  imported {} records", records.len());
    Ok(())
}
