//! CLI module
//!
//! Command-line interface over the registry facade.
//!
//! # Commands
//!
//! - `register` - Register a model version from a model URI
//! - `search-models` / `search-versions` / `search-prompts` - Paginated searches
//! - `load-prompt` / `register-prompt` - Prompt registry access
//! - `set-alias` / `delete-alias` - Manage prompt aliases
//! - `set-tag` - Tag a model version

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
