//! Usage statistics overview.
//!
//! Provides a quick summary of stored analyses: per-user totals, the most
//! recent analysis date, and average critique size, or the system-wide
//! per-user breakdown. Used by `grd stats` to give the same numbers the
//! dashboard shows.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store::HistoryStore;

/// Run the stats command: one user's summary, or the system-wide
/// overview when no username is given.
pub async fn run_stats(config: &Config, username: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = HistoryStore::new(pool);

    match username {
        Some(user) => {
            let stats = store.user_statistics(user).await?;

            println!("Statistics for '{}'", user);
            println!("========================");
            println!();
            println!("  Analyses:       {}", stats.total_analyses);
            println!("  Last analysis:  {}", stats.last_analysis_display());
            println!("  Avg size:       {} chars", stats.avg_file_size);
        }
        None => {
            let stats = store.system_statistics().await?;

            println!("Grader Harness — Usage Stats");
            println!("============================");
            println!();
            println!("  Users:     {}", stats.total_users);
            println!("  Analyses:  {}", stats.total_analyses);

            if !stats.users.is_empty() {
                println!();
                println!("  By user:");
                println!("  {:<24} {:>8}", "USER", "ANALYSES");
                println!("  {}", "-".repeat(34));
                for (user, count) in &stats.users {
                    println!("  {:<24} {:>8}", user, count);
                }
            }
        }
    }

    println!();

    store.pool().close().await;
    Ok(())
}
