//! # Grader Harness
//!
//! Analysis history, statistics, and report rendering for an AI project
//! grader.
//!
//! Grader Harness is the storage and reporting backbone behind a
//! project-grading dashboard: uploaded project documents (PDF/DOCX) are
//! reduced to text, critiqued by a generative model against a fixed
//! rubric, and persisted as per-user analysis records. Records can be
//! listed, summarized into usage statistics, and rendered into
//! downloadable Word/PDF reports, via a CLI (`grd`) and a JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────┐
//! │ PDF/DOCX     │──▶│ Extract +     │──▶│  SQLite   │
//! │ upload       │   │ Critique      │   │ analyses  │
//! └──────────────┘   └───────────────┘   └────┬─────┘
//!                                             │
//!                       ┌─────────────────────┤
//!                       ▼                     ▼
//!                  ┌──────────┐       ┌──────────────┐
//!                  │   CLI    │       │ HTTP (JSON)  │
//!                  │  (grd)   │       │ + DOCX/PDF   │
//!                  └──────────┘       └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! grd init                              # create database
//! grd analyze project.pdf --user alice  # extract, critique, store
//! grd history alice                     # list stored analyses
//! grd report alice 1 --format pdf      # render a downloadable report
//! grd stats                             # system-wide usage overview
//! grd serve api                         # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`store`] | SQLite record and survey stores |
//! | [`extract`] | PDF/DOCX text extraction |
//! | [`analyzer`] | Generative-critique provider abstraction |
//! | [`render`] | DOCX and PDF report rendering |
//! | [`server`] | JSON HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`import`] | Legacy JSON history import |
//! | [`export`] | Canonical JSON export |

pub mod analyze;
pub mod analyzer;
pub mod config;
pub mod db;
pub mod export;
pub mod extract;
pub mod history;
pub mod import;
pub mod migrate;
pub mod models;
pub mod render;
pub mod report;
pub mod server;
pub mod stats;
pub mod store;
pub mod survey;
