//! Fluent registry facade
//!
//! `Registry` wraps a `RegistryClient` with the behavior callers expect on
//! top of the raw API: tolerant model creation, source resolution for
//! `runs:/` URIs, readiness waits, search aggregation across pages, a
//! memoized prompt loader and best-effort prompt linking.

mod models;
mod prompts;

pub use models::RegisterOptions;
pub use prompts::LoadPromptOptions;

use crate::cache::PromptCache;
use crate::client::{RegistryClient, RestRegistryClient};
use crate::config::Settings;
use crate::context::ActiveContext;
use crate::error::Result;
use std::sync::Arc;

/// Per-call page size when searching registered models
pub const SEARCH_REGISTERED_MODEL_MAX_RESULTS_DEFAULT: usize = 100;

/// Per-call page size when searching model versions
pub const SEARCH_MODEL_VERSION_MAX_RESULTS_DEFAULT: usize = 10_000;

/// Per-call page size when searching prompts
pub const SEARCH_PROMPTS_MAX_RESULTS_DEFAULT: usize = 100;

/// High-level registry operations. Clones share the client, the prompt
/// cache and the active context.
#[derive(Clone)]
pub struct Registry {
    client: Arc<dyn RegistryClient>,
    settings: Settings,
    prompt_cache: PromptCache,
    context: ActiveContext,
}

impl Registry {
    /// Create a facade over `client`
    pub fn new(client: Arc<dyn RegistryClient>, settings: Settings) -> Self {
        let prompt_cache = PromptCache::new(settings.prompt_cache_size);
        Self {
            client,
            settings,
            prompt_cache,
            context: ActiveContext::new(),
        }
    }

    /// Create a facade talking REST to the configured registry
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let client = RestRegistryClient::from_settings(&settings)?;
        Ok(Self::new(Arc::new(client), settings))
    }

    /// Use `context` as the source of the active run, model and trace
    #[must_use]
    pub fn with_context(mut self, context: ActiveContext) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &ActiveContext {
        &self.context
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn client(&self) -> &Arc<dyn RegistryClient> {
        &self.client
    }

    pub fn prompt_cache(&self) -> &PromptCache {
        &self.prompt_cache
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("registry_uri", &self.settings.registry_uri())
            .field("prompt_cache", &self.prompt_cache)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
