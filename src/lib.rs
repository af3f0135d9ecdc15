//! # modelreg
//!
//! A fluent client facade for model and prompt registries.
//!
//! ## Features
//!
//! - **Model registration**: tolerant of existing models, resolves `runs:/`
//!   URIs to logged models, waits for new versions to become READY
//! - **Paginated search**: aggregate cursor-paged searches up to a bound
//! - **Prompt registry**: memoized prompt loading, aliases, and best-effort
//!   linking of loaded prompts to runs, models and traces
//! - **HTTP transport**: retries with backoff and optional rate limiting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use modelreg::{LoadPromptOptions, RegisterOptions, Registry, Settings};
//!
//! #[tokio::main]
//! async fn main() -> modelreg::Result<()> {
//!     let registry = Registry::from_settings(Settings::load(None)?)?;
//!
//!     let version = registry
//!         .register_model("runs:/<run_id>/model", "forecaster", RegisterOptions::new())
//!         .await?;
//!
//!     let prompt = registry
//!         .load_prompt("prompts:/greeting@production", LoadPromptOptions::new())
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      fluent::Registry                      │
//! │  register_model  search_*  load_prompt  register_prompt    │
//! └────────────────────────────────────────────────────────────┘
//!          │                │               │
//! ┌────────┴──────┬─────────┴─────┬─────────┴──────┬───────────┐
//! │  Pagination   │  PromptCache  │    Linker      │  Context  │
//! │  aggregate    │  LRU memo     │  link_async    │ run/model │
//! └───────────────┴───────────────┴────────────────┴───────────┘
//!                          │
//! ┌────────────────────────┴───────────────────────────────────┐
//! │         RegistryClient  (RestRegistryClient → HTTP)        │
//! └────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Registry entities and common type aliases
pub mod types;

/// Settings from YAML and environment
pub mod config;

/// Model and prompt URI parsing
pub mod uri;

/// HTTP client with retry and rate limiting
pub mod http;

/// Cursor-based pagination helpers
pub mod pagination;

/// Best-effort background linking
pub mod linker;

/// Bounded memoization
pub mod cache;

/// Active run, model and trace
pub mod context;

/// Registry client interface and REST implementation
pub mod client;

/// High-level registry facade
pub mod fluent;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::Settings;
pub use error::{Error, ErrorCode, Result};
pub use fluent::{LoadPromptOptions, RegisterOptions, Registry};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
