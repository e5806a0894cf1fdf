//! Core data models for the grader harness.
//!
//! These types represent stored analysis records, the derived statistics
//! views, and the satisfaction-survey records that flow through the store,
//! the CLI, and the HTTP API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One stored analysis outcome for one user.
///
/// Records are immutable once created: they are removed whole (by id or
/// per user), never edited field by field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Unique within the owning user's collection, assigned by the store.
    pub id: i64,
    pub username: String,
    /// ISO-8601 local time, set at creation.
    pub timestamp: String,
    /// Name of the uploaded file. Opaque here; not validated for path
    /// safety (that is the caller's job).
    pub file_name: String,
    /// Character length of `result`: a size proxy, not the upload's byte
    /// size. Legacy files may omit it.
    #[serde(default)]
    pub file_size_chars: i64,
    /// The critique text from the generative model. Opaque except to the
    /// report renderer's line classifier.
    pub result: String,
}

/// Per-user usage summary. Derived on demand, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct UserStatistics {
    pub total_analyses: i64,
    /// Timestamp of the most recent record; `None` when the user has no
    /// analyses yet.
    pub last_analysis_date: Option<String>,
    /// Arithmetic mean of `file_size_chars`, truncated toward zero.
    pub avg_file_size: i64,
}

impl UserStatistics {
    pub fn last_analysis_display(&self) -> &str {
        self.last_analysis_date.as_deref().unwrap_or("never")
    }
}

/// System-wide usage summary. Users with zero records do not appear.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatistics {
    pub total_users: i64,
    pub total_analyses: i64,
    /// Per-user record counts, restricted to users with at least one record.
    pub users: BTreeMap<String, i64>,
}

/// One satisfaction-survey response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyResponse {
    /// `SURVEY_<YYYYmmdd_HHMMSS>_<n>`, assigned by the store.
    pub id: String,
    pub timestamp: String,
    /// `teacher` or `student`.
    pub user_type: String,
    pub username: String,
    pub name: String,
    /// Question key to rating (1..=5).
    pub responses: BTreeMap<String, f64>,
}

/// Aggregated survey statistics over some set of responses.
#[derive(Debug, Clone, Serialize)]
pub struct SurveyStatistics {
    pub total_responses: i64,
    pub categories: BTreeMap<String, QuestionStats>,
    pub overall_mean: f64,
}

/// Score summary for a single survey question.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: i64,
}

/// Map a mean score onto the five-band satisfaction scale used in the
/// survey results page.
pub fn satisfaction_level(score: f64) -> &'static str {
    if score >= 4.5 {
        "highest"
    } else if score >= 3.5 {
        "high"
    } else if score >= 2.5 {
        "moderate"
    } else if score >= 1.5 {
        "low"
    } else {
        "lowest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_analysis_display_falls_back_to_never() {
        let stats = UserStatistics {
            total_analyses: 0,
            last_analysis_date: None,
            avg_file_size: 0,
        };
        assert_eq!(stats.last_analysis_display(), "never");
    }

    #[test]
    fn satisfaction_bands_cover_the_scale() {
        assert_eq!(satisfaction_level(5.0), "highest");
        assert_eq!(satisfaction_level(4.5), "highest");
        assert_eq!(satisfaction_level(4.0), "high");
        assert_eq!(satisfaction_level(3.0), "moderate");
        assert_eq!(satisfaction_level(2.0), "low");
        assert_eq!(satisfaction_level(1.0), "lowest");
    }

    #[test]
    fn record_deserializes_without_file_size() {
        let json = r#"{"id": 1, "username": "alice", "timestamp": "2026-01-01T00:00:00",
                       "file_name": "proj.pdf", "result": "ok"}"#;
        let record: AnalysisRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.file_size_chars, 0);
    }
}
