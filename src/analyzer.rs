//! Generative-critique provider abstraction and implementations.
//!
//! Defines the [`CritiqueProvider`] trait and concrete implementations:
//! - **[`DisabledProvider`]** — returns errors; used when no model is configured.
//! - **[`GeminiProvider`]** — calls the Google Generative Language API with
//!   retry and backoff.
//!
//! The rubric prompt is fixed: it asks the model to find the project's
//! stated objectives and conclusions, judge their coherence, and answer in
//! the small markdown convention the report renderer understands
//! (`##` headings, `**bold**` lines, `-` bullets).
//!
//! # Retry Strategy
//!
//! Transient failures use exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::AnalyzerConfig;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Trait for critique providers.
///
/// Carries provider metadata; the actual completion call is performed by
/// [`generate_critique`] (kept as a free function due to async trait
/// limitations).
pub trait CritiqueProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-1.5-flash"`).
    fn model_name(&self) -> &str;
}

/// A no-op provider that always returns errors.
pub struct DisabledProvider;

impl CritiqueProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
}

/// Critique provider using the Google Generative Language API.
///
/// Calls `POST /v1beta/models/{model}:generateContent`. Requires the
/// `GOOGLE_API_KEY` environment variable to be set.
pub struct GeminiProvider {
    model: String,
}

impl GeminiProvider {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("analyzer.model required for Gemini provider"))?;

        if std::env::var("GOOGLE_API_KEY").is_err() {
            bail!("GOOGLE_API_KEY environment variable not set");
        }

        Ok(Self { model })
    }
}

impl CritiqueProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Instantiate the provider selected by the configuration.
pub fn create_provider(config: &AnalyzerConfig) -> Result<Box<dyn CritiqueProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "gemini" => Ok(Box::new(GeminiProvider::new(config)?)),
        other => bail!("Unknown analyzer provider: {}", other),
    }
}

/// Build the rubric prompt around the extracted document text.
///
/// The document is truncated to `max_chars` characters so oversized
/// uploads cannot blow past the model's context window.
pub fn build_prompt(document_text: &str, max_chars: usize) -> String {
    let truncated: String = document_text.chars().take(max_chars).collect();
    format!(
        "Role: you are an experienced project advisor reviewing a student project report.\n\
         Task: analyze how coherent the project is.\n\
         \n\
         Content:\n\
         {}\n\
         \n\
         Instructions:\n\
         1. Find the stated objectives and the conclusions in the text.\n\
         2. Compare them and judge whether the conclusions answer the objectives.\n\
         3. Give a verdict per objective and overall recommendations.\n\
         \n\
         Output format (markdown):\n\
         ## Analysis\n\
         **Objectives found:**\n\
         - one per line\n\
         **Verdict per objective:**\n\
         - one per line\n\
         **Recommendations:**\n\
         - one per line\n",
        truncated
    )
}

/// Run one critique through the configured provider.
///
/// # Errors
///
/// - `"disabled"` provider: always returns an error.
/// - `"gemini"` provider: returns an error if the API key is missing, the
///   API returns a non-retryable error (including auth failures), or all
///   retries are exhausted.
pub async fn generate_critique(config: &AnalyzerConfig, document_text: &str) -> Result<String> {
    match config.provider.as_str() {
        "gemini" => generate_gemini(config, document_text).await,
        "disabled" => bail!("Analyzer is disabled — set [analyzer] provider in the config"),
        other => bail!("Unknown analyzer provider: {}", other),
    }
}

async fn generate_gemini(config: &AnalyzerConfig, document_text: &str) -> Result<String> {
    let api_key =
        std::env::var("GOOGLE_API_KEY").map_err(|_| anyhow::anyhow!("GOOGLE_API_KEY not set"))?;

    let model = config
        .model
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("analyzer.model required"))?;

    let base_url = config.url.as_deref().unwrap_or(GEMINI_BASE_URL);
    let endpoint = format!(
        "{}/v1beta/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let prompt = build_prompt(document_text, config.max_prompt_chars);
    let body = serde_json::json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(&endpoint)
            .header("x-goog-api-key", &api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_gemini_response(&json);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "Gemini API error {}: {}",
                        status,
                        body_text
                    ));
                    continue;
                }

                // Client error (not 429) — auth and quota problems land
                // here and must surface unchanged.
                let body_text = response.text().await.unwrap_or_default();
                bail!("Gemini API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Critique failed after retries")))
}

/// Pull the completion text out of a generateContent response.
///
/// Concatenates `candidates[0].content.parts[*].text`.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing candidates"))?;

    let mut text = String::new();
    for part in parts {
        if let Some(s) = part.get("text").and_then(|t| t.as_str()) {
            text.push_str(s);
        }
    }

    if text.is_empty() {
        bail!("Gemini response contained no text parts");
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_truncates_document_text() {
        let doc = "x".repeat(100);
        let prompt = build_prompt(&doc, 10);
        assert!(prompt.contains(&"x".repeat(10)));
        assert!(!prompt.contains(&"x".repeat(11)));
    }

    #[test]
    fn parse_concatenates_text_parts() {
        let json = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "## Analysis\n" }, { "text": "- good" }] }
            }]
        });
        assert_eq!(
            parse_gemini_response(&json).unwrap(),
            "## Analysis\n- good"
        );
    }

    #[test]
    fn parse_rejects_empty_response() {
        let json = serde_json::json!({ "candidates": [] });
        assert!(parse_gemini_response(&json).is_err());

        let json = serde_json::json!({
            "candidates": [{ "content": { "parts": [] } }]
        });
        assert!(parse_gemini_response(&json).is_err());
    }

    #[tokio::test]
    async fn disabled_provider_always_errors() {
        let config = crate::config::AnalyzerConfig::default();
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "disabled");
        assert!(generate_critique(&config, "anything").await.is_err());
    }
}
