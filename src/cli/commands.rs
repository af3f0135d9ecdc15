//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Model and prompt registry CLI
#[derive(Parser, Debug)]
#[command(name = "modelreg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Tracking server URI (overrides MLFLOW_TRACKING_URI)
    #[arg(long, global = true)]
    pub tracking_uri: Option<String>,

    /// Registry URI (overrides MLFLOW_REGISTRY_URI; defaults to the tracking URI)
    #[arg(long, global = true)]
    pub registry_uri: Option<String>,

    /// Settings file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a model version from a model URI
    Register {
        /// Model URI, e.g. runs:/<run_id>/model or models:/<model_id>
        model_uri: String,

        /// Registered model name
        name: String,

        /// Seconds to wait for the version to become READY (0 = don't wait)
        #[arg(long)]
        await_secs: Option<u64>,

        /// Version tag as KEY=VALUE (repeatable)
        #[arg(long = "tag", value_parser = parse_key_val)]
        tags: Vec<(String, String)>,
    },

    /// Search registered models
    SearchModels {
        /// Filter expression, e.g. "name LIKE 'fore%'"
        #[arg(long)]
        filter: Option<String>,

        /// Order-by column (repeatable), e.g. "name ASC"
        #[arg(long)]
        order_by: Vec<String>,

        /// Maximum number of results (all when omitted)
        #[arg(long)]
        max_results: Option<usize>,
    },

    /// Search model versions
    SearchVersions {
        /// Filter expression, e.g. "name = 'forecaster'"
        #[arg(long)]
        filter: Option<String>,

        /// Order-by column (repeatable)
        #[arg(long)]
        order_by: Vec<String>,

        /// Maximum number of results (all when omitted)
        #[arg(long)]
        max_results: Option<usize>,
    },

    /// Search prompts
    SearchPrompts {
        /// Filter expression
        #[arg(long)]
        filter: Option<String>,

        /// Maximum number of results (all when omitted)
        #[arg(long)]
        max_results: Option<usize>,
    },

    /// Load a prompt by prompts:/ URI, or by name and --version
    LoadPrompt {
        /// prompts:/<name>/<version>, prompts:/<name>@<alias>, or a bare name
        name_or_uri: String,

        /// Version, required with a bare name
        #[arg(long)]
        version: Option<u64>,

        /// Print null instead of failing when the prompt doesn't exist
        #[arg(long)]
        allow_missing: bool,

        /// Logged model to link the prompt to
        #[arg(long)]
        model_id: Option<String>,
    },

    /// Register a new prompt version
    RegisterPrompt {
        /// Prompt name
        name: String,

        /// Template text
        #[arg(long, conflicts_with = "template_file")]
        template: Option<String>,

        /// Read the template from a file
        #[arg(long)]
        template_file: Option<PathBuf>,

        /// Description of the change
        #[arg(long)]
        commit_message: Option<String>,

        /// Version tag as KEY=VALUE (repeatable)
        #[arg(long = "tag", value_parser = parse_key_val)]
        tags: Vec<(String, String)>,
    },

    /// Point a prompt alias at a version
    SetAlias {
        name: String,
        alias: String,
        version: u64,
    },

    /// Remove a prompt alias
    DeleteAlias { name: String, alias: String },

    /// Set a tag on a model version
    SetTag {
        name: String,
        version: String,
        key: String,
        value: String,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

/// Parse a `KEY=VALUE` argument
fn parse_key_val(arg: &str) -> Result<(String, String), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{arg}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{arg}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
