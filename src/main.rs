//! # Grader Harness CLI (`grd`)
//!
//! The `grd` binary is the primary interface for Grader Harness. It
//! provides commands for database initialization, document analysis,
//! history management, statistics, report rendering, legacy data import,
//! and starting the HTTP API server.
//!
//! ## Usage
//!
//! ```bash
//! grd --config ./config/grd.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `grd init` | Create the SQLite database and run schema migrations |
//! | `grd analyze <file> --user <name>` | Extract, critique, and store one document |
//! | `grd history <user>` | List a user's stored analyses |
//! | `grd show <user> <id>` | Print one analysis in full |
//! | `grd delete <user> <id>` | Delete one analysis (or `--all`) |
//! | `grd stats [user]` | Per-user or system-wide usage statistics |
//! | `grd report <user> <id>` | Render a DOCX/PDF report |
//! | `grd import <file>` | One-time import of a legacy JSON history file |
//! | `grd export` | Export all records as canonical JSON |
//! | `grd survey <add\|list\|stats>` | Satisfaction survey responses |
//! | `grd serve api` | Start the JSON HTTP API server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! grd init --config ./config/grd.toml
//!
//! # Critique a project document
//! grd analyze ./uploads/project.pdf --user alice
//!
//! # Render the newest analysis as a PDF
//! grd report alice 1 --format pdf --out ./report.pdf
//!
//! # Bring over the old dashboard's history.json
//! grd import ./history.json
//!
//! # Start the API for the dashboard
//! grd serve api --config ./config/grd.toml
//! ```

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use grader_harness::{
    analyze, config, export, history, import, migrate, report, server, stats, survey,
};

/// Grader Harness CLI — analysis history, statistics, and report
/// rendering for an AI project grader.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/grd.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "grd",
    about = "Grader Harness — analysis history, statistics, and reports for an AI project grader",
    version,
    long_about = "Grader Harness stores rubric critiques of uploaded project documents per user, \
    derives usage statistics on demand, renders stored analyses into downloadable Word/PDF \
    reports, and serves the whole contract over a JSON HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/grd.toml`. Database, report, analyzer, and
    /// server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/grd.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (analyses, surveys). This command is idempotent — running it
    /// multiple times is safe.
    Init,

    /// Analyze one project document and store the critique.
    ///
    /// Reads the file, extracts its text (PDF or DOCX), sends it to the
    /// configured generative model with the grading rubric, and saves
    /// the result to the user's history.
    Analyze {
        /// Path to the document (`.pdf` or `.docx`).
        file: PathBuf,

        /// Username the analysis is stored under.
        #[arg(long)]
        user: String,

        /// Extract only — show the text size without calling the
        /// analyzer or writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// List a user's stored analyses, newest first.
    History {
        username: String,

        /// Maximum number of entries to show.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print one stored analysis in full.
    Show {
        username: String,
        /// Analysis id (as shown by `grd history`).
        id: i64,
    },

    /// Delete one analysis, or a user's entire history.
    Delete {
        username: String,

        /// Analysis id to delete.
        id: Option<i64>,

        /// Delete the user's entire history instead of one record.
        #[arg(long)]
        all: bool,
    },

    /// Show usage statistics.
    ///
    /// With a username: that user's totals. Without: the system-wide
    /// overview with a per-user breakdown.
    Stats {
        username: Option<String>,
    },

    /// Render a stored analysis as a DOCX or PDF report.
    Report {
        username: String,

        /// Analysis id to render. Omit together with `--summary`.
        id: Option<i64>,

        /// Report format: `docx` or `pdf`.
        #[arg(long, default_value = "docx")]
        format: String,

        /// Output path. Defaults to the suggested download name in the
        /// current directory.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Render a summary of the user's whole history instead of one
        /// analysis (always DOCX).
        #[arg(long)]
        summary: bool,
    },

    /// Import a legacy JSON history file.
    ///
    /// Accepts both layouts the old dashboard produced: the
    /// username-to-records mapping and the flat `{"analyses": [...]}`
    /// list. Records get fresh ids; timestamps are preserved.
    Import {
        /// Path to the legacy JSON file.
        file: PathBuf,

        /// Parse and report counts without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Export all analysis records as canonical JSON.
    ///
    /// The output is accepted back by `grd import`, so exports double
    /// as backups.
    Export {
        /// Output file. Writes to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Manage satisfaction survey responses.
    Survey {
        #[command(subcommand)]
        action: SurveyAction,
    },

    /// Start the JSON HTTP API server.
    ///
    /// Exposes analyze, history, statistics, and report downloads for
    /// the dashboard and LMS integrations.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Survey subcommands.
#[derive(Subcommand)]
enum SurveyAction {
    /// Record one survey response.
    ///
    /// Ratings are `question=score` pairs with scores from 1 to 5,
    /// e.g. `--rating ease_of_use=4 --rating accuracy=5`.
    Add {
        /// Respondent type: `teacher` or `student`.
        #[arg(long)]
        user_type: String,

        /// Respondent username.
        #[arg(long)]
        user: String,

        /// Respondent display name.
        #[arg(long)]
        name: String,

        /// Rating as `question=score`; repeatable.
        #[arg(long = "rating", value_parser = parse_key_val)]
        ratings: Vec<(String, String)>,
    },

    /// List recorded responses.
    List {
        /// Restrict to one respondent type.
        #[arg(long)]
        user_type: Option<String>,
    },

    /// Show aggregate survey statistics.
    Stats {
        /// Restrict to one respondent type.
        #[arg(long)]
        user_type: Option<String>,
    },
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the JSON API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// the Grader Harness API endpoints.
    Api,
}

/// Parse a `key=value` pair for `--rating` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "grd", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Analyze {
            file,
            user,
            dry_run,
        } => {
            analyze::run_analyze(&cfg, &file, &user, dry_run).await?;
        }
        Commands::History { username, limit } => {
            history::run_history(&cfg, &username, limit).await?;
        }
        Commands::Show { username, id } => {
            history::run_show(&cfg, &username, id).await?;
        }
        Commands::Delete { username, id, all } => {
            history::run_delete(&cfg, &username, id, all).await?;
        }
        Commands::Stats { username } => {
            stats::run_stats(&cfg, username.as_deref()).await?;
        }
        Commands::Report {
            username,
            id,
            format,
            out,
            summary,
        } => {
            report::run_report(&cfg, &username, id, &format, out.as_deref(), summary).await?;
        }
        Commands::Import { file, dry_run } => {
            import::run_import(&cfg, &file, dry_run).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::Survey { action } => match action {
            SurveyAction::Add {
                user_type,
                user,
                name,
                ratings,
            } => {
                survey::run_survey_add(&cfg, &user_type, &user, &name, &ratings).await?;
            }
            SurveyAction::List { user_type } => {
                survey::run_survey_list(&cfg, user_type.as_deref()).await?;
            }
            SurveyAction::Stats { user_type } => {
                survey::run_survey_stats(&cfg, user_type.as_deref()).await?;
            }
        },
        Commands::Serve { service } => match service {
            ServeService::Api => {
                server::run_server(&cfg).await?;
            }
        },
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
