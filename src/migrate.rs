use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Apply the schema to an existing pool. Idempotent.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Analysis records. The id is per-user: (username, id) is the key,
    // with ids assigned by the store as highest-existing + 1.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            username TEXT NOT NULL,
            id INTEGER NOT NULL,
            timestamp TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_size_chars INTEGER NOT NULL DEFAULT 0,
            result TEXT NOT NULL,
            PRIMARY KEY (username, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Satisfaction survey responses. Ratings are stored as a JSON object
    // keyed by question.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS surveys (
            id TEXT PRIMARY KEY,
            timestamp TEXT NOT NULL,
            user_type TEXT NOT NULL,
            username TEXT NOT NULL,
            name TEXT NOT NULL,
            responses_json TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_analyses_username ON analyses(username)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_analyses_user_ts ON analyses(username, timestamp DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_surveys_username ON surveys(username)")
        .execute(pool)
        .await?;

    Ok(())
}
