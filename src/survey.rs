//! Satisfaction survey commands: record a response, list responses, and
//! show aggregate statistics.
//!
//! Responses feed the research side of the system; the ratings scale is
//! 1 (lowest) to 5 (highest) per question.

use anyhow::{bail, Result};
use std::collections::BTreeMap;

use crate::config::Config;
use crate::db;
use crate::models::satisfaction_level;
use crate::store::SurveyStore;

pub async fn run_survey_add(
    config: &Config,
    user_type: &str,
    username: &str,
    name: &str,
    ratings: &[(String, String)],
) -> Result<()> {
    if ratings.is_empty() {
        bail!("pass at least one --rating question=score");
    }

    let mut responses = BTreeMap::new();
    for (question, raw) in ratings {
        let score: f64 = raw
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid score for '{}': {}", question, raw))?;
        if !(1.0..=5.0).contains(&score) {
            bail!("score for '{}' must be between 1 and 5, got {}", question, score);
        }
        responses.insert(question.clone(), score);
    }

    let pool = db::connect(config).await?;
    let store = SurveyStore::new(pool.clone());

    if store.has_responded(username).await? {
        println!("Note: '{}' has responded before; recording another response.", username);
    }

    let response = store.add_response(user_type, username, name, &responses).await?;
    println!("Recorded {} ({} ratings).", response.id, response.responses.len());

    pool.close().await;
    Ok(())
}

pub async fn run_survey_list(config: &Config, user_type: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SurveyStore::new(pool.clone());

    let responses = match user_type {
        Some(t) => store.responses_by_type(t).await?,
        None => store.all_responses().await?,
    };
    pool.close().await;

    if responses.is_empty() {
        println!("No survey responses.");
        return Ok(());
    }

    println!("  {:<28} {:<8} {:<16} {:<19}", "ID", "TYPE", "USER", "TIMESTAMP");
    println!("  {}", "-".repeat(74));
    for response in &responses {
        let ts: String = response.timestamp.chars().take(19).collect();
        println!(
            "  {:<28} {:<8} {:<16} {:<19}",
            response.id, response.user_type, response.username, ts
        );
    }

    Ok(())
}

pub async fn run_survey_stats(config: &Config, user_type: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SurveyStore::new(pool.clone());

    let stats = store.statistics(user_type).await?;
    pool.close().await;

    match user_type {
        Some(t) => println!("Survey statistics ({} responses only)", t),
        None => println!("Survey statistics (all responses)"),
    }
    println!("=================================");
    println!();
    println!("  Responses:     {}", stats.total_responses);

    if stats.total_responses == 0 {
        println!();
        return Ok(());
    }

    println!(
        "  Overall mean:  {:.2} ({})",
        stats.overall_mean,
        satisfaction_level(stats.overall_mean)
    );
    println!();
    println!("  By question:");
    println!(
        "  {:<28} {:>6} {:>6} {:>6} {:>6}",
        "QUESTION", "MEAN", "MIN", "MAX", "COUNT"
    );
    println!("  {}", "-".repeat(56));
    for (question, q) in &stats.categories {
        println!(
            "  {:<28} {:>6.2} {:>6.1} {:>6.1} {:>6}",
            question, q.mean, q.min, q.max, q.count
        );
    }
    println!();

    Ok(())
}
