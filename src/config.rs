use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportsConfig {
    /// Prefix for suggested report file names. Deployments localize this
    /// (the Thai installations use their own word for "report").
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,
    /// Name shown in report metadata tables and footers.
    #[serde(default = "default_system_name")]
    pub system_name: String,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            filename_prefix: default_filename_prefix(),
            system_name: default_system_name(),
        }
    }
}

fn default_filename_prefix() -> String {
    "report".to_string()
}
fn default_system_name() -> String {
    "AI Project Grader".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7411".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyzerConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL override, mainly for tests pointed at a stub server.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            url: None,
            max_prompt_chars: 30_000,
            max_retries: 5,
            timeout_secs: 60,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_prompt_chars() -> usize {
    30_000
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    60
}

impl AnalyzerConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

impl Config {
    /// Minimal in-memory configuration for commands that can run without
    /// a config file (e.g. shell completions).
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/grader.sqlite"),
            },
            reports: ReportsConfig::default(),
            server: ServerConfig::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.reports.filename_prefix.is_empty() {
        anyhow::bail!("reports.filename_prefix must not be empty");
    }

    if config.analyzer.max_prompt_chars == 0 {
        anyhow::bail!("analyzer.max_prompt_chars must be > 0");
    }

    if config.analyzer.is_enabled() && config.analyzer.model.is_none() {
        anyhow::bail!(
            "analyzer.model must be specified when provider is '{}'",
            config.analyzer.provider
        );
    }

    match config.analyzer.provider.as_str() {
        "disabled" | "gemini" => {}
        other => anyhow::bail!(
            "Unknown analyzer provider: '{}'. Must be disabled or gemini.",
            other
        ),
    }

    Ok(config)
}
