//! Registry client interface
//!
//! `RegistryClient` is the seam between the facade and the registry
//! service. The facade never talks HTTP itself; it calls these operations
//! and interprets their errors. `RestRegistryClient` implements them over
//! the registry's REST API.

mod rest;

pub use rest::RestRegistryClient;

use crate::error::Result;
use crate::pagination::{Page, PageRequest};
use crate::types::{
    FileInfo, LoggedModel, ModelVersion, Prompt, PromptVersion, RegisteredModel, Run, StringMap,
};
use crate::uri::PromptRef;
use async_trait::async_trait;

/// Filter and ordering of a search call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Filter expression, e.g. `name LIKE 'fore%'`
    pub filter: Option<String>,
    /// Columns with optional `ASC`/`DESC`
    pub order_by: Vec<String>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(column.into());
        self
    }
}

/// Arguments of a model version creation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateModelVersion {
    pub name: String,
    pub source: String,
    pub run_id: Option<String>,
    pub model_id: Option<String>,
    pub tags: StringMap,
    pub description: Option<String>,
}

/// Arguments of a prompt registration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterPrompt {
    pub name: String,
    pub template: String,
    pub commit_message: Option<String>,
    pub tags: StringMap,
}

/// Operations the facade needs from a registry service.
///
/// Implementations report registry failures as `Error::Registry` so the
/// facade can tell "already exists" and "not found" apart from transport
/// errors. Retries are the implementation's concern.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    // Registered models and versions

    async fn create_registered_model(&self, name: &str) -> Result<RegisteredModel>;

    async fn create_model_version(&self, request: &CreateModelVersion) -> Result<ModelVersion>;

    async fn get_model_version(&self, name: &str, version: &str) -> Result<ModelVersion>;

    async fn search_registered_models(
        &self,
        query: &SearchQuery,
        page: PageRequest,
    ) -> Result<Page<RegisteredModel>>;

    async fn search_model_versions(
        &self,
        query: &SearchQuery,
        page: PageRequest,
    ) -> Result<Page<ModelVersion>>;

    async fn set_model_version_tag(
        &self,
        name: &str,
        version: &str,
        key: &str,
        value: &str,
    ) -> Result<()>;

    // Runs, artifacts and logged models

    async fn get_run(&self, run_id: &str) -> Result<Run>;

    /// List artifacts directly under `path` of a run's artifact root
    async fn list_run_artifacts(&self, run_id: &str, path: &str) -> Result<Vec<FileInfo>>;

    /// One page of logged models; the page size is the server's default
    async fn search_logged_models(
        &self,
        experiment_ids: &[String],
        filter: Option<&str>,
        page_token: Option<String>,
    ) -> Result<Page<LoggedModel>>;

    async fn get_logged_model(&self, model_id: &str) -> Result<LoggedModel>;

    /// Set (overwrite) the given tags on a logged model
    async fn set_logged_model_tags(&self, model_id: &str, tags: &StringMap) -> Result<()>;

    // Prompts

    async fn register_prompt(&self, request: &RegisterPrompt) -> Result<PromptVersion>;

    /// Load a prompt version; a missing prompt is `Ok(None)` when `allow_missing`
    async fn load_prompt(
        &self,
        prompt: &PromptRef,
        allow_missing: bool,
    ) -> Result<Option<PromptVersion>>;

    async fn search_prompts(&self, filter: Option<&str>, page: PageRequest) -> Result<Page<Prompt>>;

    async fn link_prompt_version_to_run(&self, run_id: &str, prompt_uri: &str) -> Result<()>;

    async fn link_prompt_version_to_model(
        &self,
        name: &str,
        version: u64,
        model_id: &str,
    ) -> Result<()>;

    async fn set_prompt_alias(&self, name: &str, alias: &str, version: u64) -> Result<()>;

    async fn delete_prompt_alias(&self, name: &str, alias: &str) -> Result<()>;
}
