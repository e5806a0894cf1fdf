//! SQLite-backed stores for analysis history and survey responses.
//!
//! [`HistoryStore`] is the system's record store: append-only analysis
//! records keyed by user, with per-user retrieval and derived statistics.
//! Every mutation runs inside a single transaction, so concurrent writers
//! cannot lose each other's appends. Absence (unknown user, unknown id)
//! is expressed as empty results, `None`, or `false`, never as an error;
//! errors are reserved for real storage failures.
//!
//! Statistics are pure views over the live tables: recomputed on every
//! call, never cached or persisted.

use anyhow::{bail, Result};
use chrono::Local;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;

use crate::models::{
    AnalysisRecord, QuestionStats, SurveyResponse, SurveyStatistics, SystemStatistics,
    UserStatistics,
};

/// Local time in ISO-8601 with microseconds. Fixed width, so the stored
/// strings sort lexicographically in time order.
fn now_iso() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn record_from_row(row: &SqliteRow) -> AnalysisRecord {
    AnalysisRecord {
        id: row.get("id"),
        username: row.get("username"),
        timestamp: row.get("timestamp"),
        file_name: row.get("file_name"),
        file_size_chars: row.get("file_size_chars"),
        result: row.get("result"),
    }
}

/// Store of analysis records.
#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Persist a new analysis result for `username`.
    ///
    /// Assigns the next per-user id (highest existing + 1) and the current
    /// local timestamp inside one transaction, and returns the stored
    /// record. `file_size_chars` is the character count of `result`.
    pub async fn save(
        &self,
        username: &str,
        file_name: &str,
        result: &str,
    ) -> Result<AnalysisRecord> {
        if username.trim().is_empty() {
            bail!("username must not be empty");
        }
        self.insert(username, &now_iso(), file_name, result.chars().count() as i64, result)
            .await
    }

    /// Insert a record carrying a timestamp from elsewhere (legacy import).
    /// A fresh per-user id is assigned; legacy ids are not trusted to be
    /// unique.
    pub async fn insert_imported(
        &self,
        username: &str,
        timestamp: &str,
        file_name: &str,
        file_size_chars: i64,
        result: &str,
    ) -> Result<AnalysisRecord> {
        if username.trim().is_empty() {
            bail!("username must not be empty");
        }
        self.insert(username, timestamp, file_name, file_size_chars, result)
            .await
    }

    async fn insert(
        &self,
        username: &str,
        timestamp: &str,
        file_name: &str,
        file_size_chars: i64,
        result: &str,
    ) -> Result<AnalysisRecord> {
        let mut tx = self.pool.begin().await?;

        let id: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM analyses WHERE username = ?")
                .bind(username)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query(
            r#"
            INSERT INTO analyses (username, id, timestamp, file_name, file_size_chars, result)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(id)
        .bind(timestamp)
        .bind(file_name)
        .bind(file_size_chars)
        .bind(result)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AnalysisRecord {
            id,
            username: username.to_string(),
            timestamp: timestamp.to_string(),
            file_name: file_name.to_string(),
            file_size_chars,
            result: result.to_string(),
        })
    }

    /// All records for a user, newest first. Empty for an unknown user.
    pub async fn history(&self, username: &str) -> Result<Vec<AnalysisRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT username, id, timestamp, file_name, file_size_chars, result
            FROM analyses
            WHERE username = ?
            ORDER BY timestamp DESC, id DESC
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    pub async fn get_by_id(&self, username: &str, id: i64) -> Result<Option<AnalysisRecord>> {
        let row = sqlx::query(
            r#"
            SELECT username, id, timestamp, file_name, file_size_chars, result
            FROM analyses
            WHERE username = ? AND id = ?
            "#,
        )
        .bind(username)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(record_from_row))
    }

    /// Remove one record. Returns `true` iff a record was removed; a
    /// second call with the same id returns `false`, not an error.
    pub async fn delete(&self, username: &str, id: i64) -> Result<bool> {
        let done = sqlx::query("DELETE FROM analyses WHERE username = ? AND id = ?")
            .bind(username)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(done.rows_affected() > 0)
    }

    /// Clear a user's entire history. Succeeds even when there was
    /// nothing to remove.
    pub async fn delete_all(&self, username: &str) -> Result<bool> {
        sqlx::query("DELETE FROM analyses WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(true)
    }

    pub async fn user_statistics(&self, username: &str) -> Result<UserStatistics> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total, MAX(timestamp) AS last_ts, AVG(file_size_chars) AS avg_size
            FROM analyses
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.get("total");
        let last_ts: Option<String> = row.get("last_ts");
        let avg_size: Option<f64> = row.get("avg_size");

        Ok(UserStatistics {
            total_analyses: total,
            last_analysis_date: last_ts,
            avg_file_size: avg_size.map(|a| a.trunc() as i64).unwrap_or(0),
        })
    }

    pub async fn system_statistics(&self) -> Result<SystemStatistics> {
        let rows = sqlx::query(
            "SELECT username, COUNT(*) AS n FROM analyses GROUP BY username ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut users = BTreeMap::new();
        let mut total_analyses = 0i64;
        for row in &rows {
            let username: String = row.get("username");
            let n: i64 = row.get("n");
            total_analyses += n;
            users.insert(username, n);
        }

        Ok(SystemStatistics {
            total_users: users.len() as i64,
            total_analyses,
            users,
        })
    }
}

/// Store of satisfaction-survey responses.
#[derive(Clone)]
pub struct SurveyStore {
    pool: SqlitePool,
}

impl SurveyStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record one survey response. Ids are timestamp-derived:
    /// `SURVEY_<YYYYmmdd_HHMMSS>_<n>` where `n` is the running response
    /// count.
    pub async fn add_response(
        &self,
        user_type: &str,
        username: &str,
        name: &str,
        responses: &BTreeMap<String, f64>,
    ) -> Result<SurveyResponse> {
        match user_type {
            "teacher" | "student" => {}
            other => bail!("Unknown user type: '{}'. Must be teacher or student.", other),
        }

        let mut tx = self.pool.begin().await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM surveys")
            .fetch_one(&mut *tx)
            .await?;

        let now = Local::now();
        let id = format!("SURVEY_{}_{}", now.format("%Y%m%d_%H%M%S"), count + 1);
        let timestamp = now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        let responses_json = serde_json::to_string(responses)?;

        sqlx::query(
            r#"
            INSERT INTO surveys (id, timestamp, user_type, username, name, responses_json)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&timestamp)
        .bind(user_type)
        .bind(username)
        .bind(name)
        .bind(&responses_json)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SurveyResponse {
            id,
            timestamp,
            user_type: user_type.to_string(),
            username: username.to_string(),
            name: name.to_string(),
            responses: responses.clone(),
        })
    }

    pub async fn has_responded(&self, username: &str) -> Result<bool> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM surveys WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(n > 0)
    }

    pub async fn all_responses(&self) -> Result<Vec<SurveyResponse>> {
        self.fetch(None).await
    }

    pub async fn responses_by_type(&self, user_type: &str) -> Result<Vec<SurveyResponse>> {
        self.fetch(Some(user_type)).await
    }

    async fn fetch(&self, user_type: Option<&str>) -> Result<Vec<SurveyResponse>> {
        let rows = match user_type {
            Some(t) => {
                sqlx::query(
                    "SELECT id, timestamp, user_type, username, name, responses_json \
                     FROM surveys WHERE user_type = ? ORDER BY timestamp",
                )
                .bind(t)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, timestamp, user_type, username, name, responses_json \
                     FROM surveys ORDER BY timestamp",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut responses = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw: String = row.get("responses_json");
            let parsed: BTreeMap<String, serde_json::Value> =
                serde_json::from_str(&raw).unwrap_or_default();
            let ratings = parsed
                .into_iter()
                .filter_map(|(k, v)| v.as_f64().map(|n| (k, n)))
                .collect();

            responses.push(SurveyResponse {
                id: row.get("id"),
                timestamp: row.get("timestamp"),
                user_type: row.get("user_type"),
                username: row.get("username"),
                name: row.get("name"),
                responses: ratings,
            });
        }

        Ok(responses)
    }

    /// Aggregate statistics, optionally restricted to one user type.
    /// Only positive numeric ratings count toward the means.
    pub async fn statistics(&self, user_type: Option<&str>) -> Result<SurveyStatistics> {
        let responses = self.fetch(user_type).await?;

        let mut question_scores: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for response in &responses {
            for (question, score) in &response.responses {
                if *score > 0.0 {
                    question_scores
                        .entry(question.clone())
                        .or_default()
                        .push(*score);
                }
            }
        }

        let mut categories = BTreeMap::new();
        for (question, scores) in &question_scores {
            let count = scores.len() as i64;
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            categories.insert(
                question.clone(),
                QuestionStats {
                    mean,
                    min,
                    max,
                    count,
                },
            );
        }

        let all_scores: Vec<f64> = question_scores.values().flatten().cloned().collect();
        let overall_mean = if all_scores.is_empty() {
            0.0
        } else {
            all_scores.iter().sum::<f64>() / all_scores.len() as f64
        };

        Ok(SurveyStatistics {
            total_responses: responses.len() as i64,
            categories,
            overall_mean,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> HistoryStore {
        // One connection: each sqlite::memory: connection is its own db.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::apply_schema(&pool).await.unwrap();
        HistoryStore::new(pool)
    }

    async fn test_survey_store() -> SurveyStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::apply_schema(&pool).await.unwrap();
        SurveyStore::new(pool)
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let store = test_store().await;
        let saved = store.save("alice", "f.pdf", "text").await.unwrap();

        let fetched = store.get_by_id("alice", saved.id).await.unwrap().unwrap();
        assert_eq!(fetched.file_name, "f.pdf");
        assert_eq!(fetched.file_size_chars, 4);
        assert_eq!(fetched.result, "text");
        assert_eq!(fetched.timestamp, saved.timestamp);
    }

    #[tokio::test]
    async fn ids_stay_unique_across_saves_and_deletes() {
        let store = test_store().await;
        store.save("alice", "a.pdf", "one").await.unwrap();
        let second = store.save("alice", "b.pdf", "two").await.unwrap();
        store.save("alice", "c.pdf", "three").await.unwrap();

        // Deleting a middle record must not let its id be reissued onto
        // a colliding value.
        assert!(store.delete("alice", second.id).await.unwrap());
        store.save("alice", "d.pdf", "four").await.unwrap();

        let history = store.history("alice").await.unwrap();
        let mut ids: Vec<i64> = history.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), history.len(), "duplicate id in {:?}", ids);
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let store = test_store().await;
        store.save("alice", "first.pdf", "1").await.unwrap();
        store.save("alice", "second.pdf", "2").await.unwrap();
        store.save("alice", "third.pdf", "3").await.unwrap();

        let history = store.history("alice").await.unwrap();
        let names: Vec<&str> = history.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, ["third.pdf", "second.pdf", "first.pdf"]);
        assert!(history[0].timestamp >= history[1].timestamp);
        assert!(history[1].timestamp >= history[2].timestamp);
    }

    #[tokio::test]
    async fn unknown_user_has_empty_history() {
        let store = test_store().await;
        assert!(store.history("nobody").await.unwrap().is_empty());
        assert!(store.get_by_id("nobody", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = test_store().await;
        let saved = store.save("alice", "f.pdf", "text").await.unwrap();

        assert!(store.delete("alice", saved.id).await.unwrap());
        assert!(!store.delete("alice", saved.id).await.unwrap());
        assert!(!store.delete("alice", 999).await.unwrap());
    }

    #[tokio::test]
    async fn empty_user_statistics_default() {
        let store = test_store().await;
        let stats = store.user_statistics("alice").await.unwrap();
        assert_eq!(stats.total_analyses, 0);
        assert_eq!(stats.avg_file_size, 0);
        assert!(stats.last_analysis_date.is_none());
        assert_eq!(stats.last_analysis_display(), "never");
    }

    #[tokio::test]
    async fn average_file_size_truncates() {
        let store = test_store().await;
        store.save("alice", "a.pdf", &"x".repeat(100)).await.unwrap();
        store.save("alice", "b.pdf", &"x".repeat(200)).await.unwrap();
        store.save("alice", "c.pdf", &"x".repeat(300)).await.unwrap();

        let stats = store.user_statistics("alice").await.unwrap();
        assert_eq!(stats.total_analyses, 3);
        assert_eq!(stats.avg_file_size, 200);
        assert!(stats.last_analysis_date.is_some());
    }

    #[tokio::test]
    async fn system_statistics_skip_empty_users() {
        let store = test_store().await;
        store.save("alice", "a.pdf", "aa").await.unwrap();
        store.save("bob", "b.pdf", "bb").await.unwrap();
        // carol never saves anything

        let stats = store.system_statistics().await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_analyses, 2);
        assert_eq!(stats.users.get("alice"), Some(&1));
        assert_eq!(stats.users.get("bob"), Some(&1));
        assert!(!stats.users.contains_key("carol"));
    }

    #[tokio::test]
    async fn delete_all_clears_history_and_statistics() {
        let store = test_store().await;
        store.save("alice", "a.pdf", &"x".repeat(100)).await.unwrap();
        store.save("alice", "b.pdf", &"x".repeat(200)).await.unwrap();
        store.save("alice", "c.pdf", &"x".repeat(300)).await.unwrap();

        assert!(store.delete_all("alice").await.unwrap());
        assert!(store.history("alice").await.unwrap().is_empty());

        let stats = store.user_statistics("alice").await.unwrap();
        assert_eq!(stats.total_analyses, 0);

        // Idempotent: clearing an already-empty user still succeeds.
        assert!(store.delete_all("alice").await.unwrap());
    }

    #[tokio::test]
    async fn empty_username_is_rejected() {
        let store = test_store().await;
        assert!(store.save("  ", "f.pdf", "text").await.is_err());
    }

    #[tokio::test]
    async fn imported_records_keep_their_timestamps() {
        let store = test_store().await;
        store
            .insert_imported("alice", "2025-01-15T10:00:00", "old.pdf", 42, "legacy")
            .await
            .unwrap();
        store.save("alice", "new.pdf", "fresh").await.unwrap();

        let history = store.history("alice").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].timestamp, "2025-01-15T10:00:00");
        assert_eq!(history[1].file_size_chars, 42);
        assert_eq!(history[0].file_name, "new.pdf");
    }

    #[tokio::test]
    async fn survey_statistics_aggregate_by_question() {
        let store = test_survey_store().await;

        let mut first = BTreeMap::new();
        first.insert("ease_of_use".to_string(), 4.0);
        first.insert("accuracy".to_string(), 5.0);
        store
            .add_response("student", "alice", "Alice", &first)
            .await
            .unwrap();

        let mut second = BTreeMap::new();
        second.insert("ease_of_use".to_string(), 2.0);
        store
            .add_response("teacher", "bob", "Bob", &second)
            .await
            .unwrap();

        let stats = store.statistics(None).await.unwrap();
        assert_eq!(stats.total_responses, 2);
        let ease = &stats.categories["ease_of_use"];
        assert_eq!(ease.count, 2);
        assert!((ease.mean - 3.0).abs() < f64::EPSILON);
        assert_eq!(ease.min, 2.0);
        assert_eq!(ease.max, 4.0);

        let students_only = store.statistics(Some("student")).await.unwrap();
        assert_eq!(students_only.total_responses, 1);
        assert!((students_only.overall_mean - 4.5).abs() < f64::EPSILON);

        assert!(store.has_responded("alice").await.unwrap());
        assert!(!store.has_responded("carol").await.unwrap());
    }

    #[tokio::test]
    async fn empty_survey_statistics() {
        let store = test_survey_store().await;
        let stats = store.statistics(None).await.unwrap();
        assert_eq!(stats.total_responses, 0);
        assert!(stats.categories.is_empty());
        assert_eq!(stats.overall_mean, 0.0);
    }
}
