//! Prompt registry operations

use super::{Registry, SEARCH_PROMPTS_MAX_RESULTS_DEFAULT};
use crate::cache::PromptCacheKey;
use crate::client::RegisterPrompt;
use crate::error::{Error, Result};
use crate::linker::{link_async, LinkTask};
use crate::pagination::{aggregate, PageRequest};
use crate::types::{Prompt, PromptVersion, StringMap};
use crate::uri::{is_alias_reference, is_legacy_workspace_registry, parse_prompt_name_or_uri};
use std::sync::Arc;
use tracing::{debug, info};

/// Options of `Registry::load_prompt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPromptOptions {
    /// Version to load; required with a bare name, forbidden with a URI
    pub version: Option<u64>,
    /// Return `None` instead of an error when the prompt does not exist
    pub allow_missing: bool,
    /// Link the prompt to `model_id`, or to the active model
    pub link_to_model: bool,
    pub model_id: Option<String>,
}

impl Default for LoadPromptOptions {
    fn default() -> Self {
        Self {
            version: None,
            allow_missing: false,
            link_to_model: true,
            model_id: None,
        }
    }
}

impl LoadPromptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    #[must_use]
    pub fn allow_missing(mut self, allow: bool) -> Self {
        self.allow_missing = allow;
        self
    }

    #[must_use]
    pub fn link_to_model(mut self, link: bool) -> Self {
        self.link_to_model = link;
        self
    }

    #[must_use]
    pub fn model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }
}

impl Registry {
    /// Reject registries that have no prompt support
    fn require_prompt_registry(&self) -> Result<()> {
        let uri = self.settings.registry_uri();
        if is_legacy_workspace_registry(uri) {
            return Err(Error::unsupported(format!(
                "The '{uri}' model registry does not support prompts. \
                 Use a Unity Catalog or tracking server registry instead."
            )));
        }
        Ok(())
    }

    /// Register a new version of prompt `name`, creating the prompt if needed
    pub async fn register_prompt(
        &self,
        name: &str,
        template: &str,
        commit_message: Option<&str>,
        tags: StringMap,
    ) -> Result<PromptVersion> {
        self.require_prompt_registry()?;

        let prompt = self
            .client
            .register_prompt(&RegisterPrompt {
                name: name.to_string(),
                template: template.to_string(),
                commit_message: commit_message.map(str::to_string),
                tags,
            })
            .await?;
        info!("Registered version {} of prompt '{}'", prompt.version, prompt.name);
        Ok(prompt)
    }

    /// Prompts matching `filter`, across as many pages as needed
    pub async fn search_prompts(
        &self,
        filter: Option<&str>,
        max_results: Option<usize>,
    ) -> Result<Vec<Prompt>> {
        self.require_prompt_registry()?;

        let client = self.client.as_ref();
        let page = aggregate(
            move |count, token| client.search_prompts(filter, PageRequest::new(count, token)),
            SEARCH_PROMPTS_MAX_RESULTS_DEFAULT,
            max_results,
        )
        .await?;
        Ok(page.into_items())
    }

    /// Load a prompt by `prompts:/` URI, or by name plus `options.version`.
    ///
    /// Loads by alias always hit the registry; anything else is memoized.
    /// A loaded prompt is linked to the active run (synchronously), to the
    /// target model (in the background) and to the active trace.
    pub async fn load_prompt(
        &self,
        name_or_uri: &str,
        options: LoadPromptOptions,
    ) -> Result<Option<PromptVersion>> {
        self.require_prompt_registry()?;

        let loaded = if is_alias_reference(name_or_uri) {
            self.load_prompt_uncached(name_or_uri, options.version, options.allow_missing)
                .await?
        } else {
            match self
                .load_prompt_cached(name_or_uri, options.version, options.allow_missing)
                .await?
            {
                Some(prompt) => Some(prompt),
                // The prompt may have been registered since the miss was cached
                None => {
                    self.load_prompt_uncached(name_or_uri, options.version, options.allow_missing)
                        .await?
                }
            }
        };

        let Some(prompt) = loaded else {
            return Ok(None);
        };

        if let Some(run_id) = self.context.active_run_id() {
            self.client
                .link_prompt_version_to_run(&run_id, &prompt.uri())
                .await?;
        }

        if options.link_to_model {
            if let Some(model_id) = options.model_id.or_else(|| self.context.active_model_id()) {
                self.link_prompt_to_model(&prompt, model_id);
            }
        }

        if let Some(trace_id) = self.context.active_trace_id() {
            if let Some(recorder) = self.context.trace_recorder() {
                recorder.register_prompt(&trace_id, &prompt);
            }
        }

        Ok(Some(prompt))
    }

    async fn load_prompt_cached(
        &self,
        name_or_uri: &str,
        version: Option<u64>,
        allow_missing: bool,
    ) -> Result<Option<PromptVersion>> {
        let key = PromptCacheKey::new(name_or_uri, version, allow_missing);
        self.prompt_cache
            .get_or_try_load(key, || {
                self.load_prompt_uncached(name_or_uri, version, allow_missing)
            })
            .await
    }

    async fn load_prompt_uncached(
        &self,
        name_or_uri: &str,
        version: Option<u64>,
        allow_missing: bool,
    ) -> Result<Option<PromptVersion>> {
        let prompt = parse_prompt_name_or_uri(name_or_uri, version)?;
        debug!("Loading prompt {prompt}");
        self.client.load_prompt(&prompt, allow_missing).await
    }

    fn link_prompt_to_model(&self, prompt: &PromptVersion, model_id: String) {
        let task = LinkTask::new(
            "link_prompt",
            format!(
                "prompt '{}' version {} to model '{model_id}'",
                prompt.name, prompt.version
            ),
        );
        let client = Arc::clone(&self.client);
        let name = prompt.name.clone();
        let version = prompt.version;

        link_async(task, async move {
            client
                .link_prompt_version_to_model(&name, version, &model_id)
                .await
        });
    }

    pub async fn set_prompt_alias(&self, name: &str, alias: &str, version: u64) -> Result<()> {
        self.require_prompt_registry()?;
        self.client.set_prompt_alias(name, alias, version).await
    }

    pub async fn delete_prompt_alias(&self, name: &str, alias: &str) -> Result<()> {
        self.require_prompt_registry()?;
        self.client.delete_prompt_alias(name, alias).await
    }
}
