//! REST implementation of `RegistryClient`
//!
//! Speaks the registry's `/api/2.0/mlflow` JSON API. Prompts are stored as
//! registered models tagged `mlflow.prompt.is_prompt`, with the template in
//! the `mlflow.prompt.text` tag of each version.

use super::{CreateModelVersion, RegisterPrompt, RegistryClient, SearchQuery};
use crate::config::Settings;
use crate::error::{Error, ErrorCode, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::pagination::{Page, PageRequest};
use crate::types::{
    tag_list, FileInfo, LoggedModel, ModelVersion, Prompt, PromptVersion, RegisteredModel, Run,
    StringMap, Tag, IS_PROMPT_TAG, LINKED_PROMPTS_TAG, PROMPT_TEXT_TAG,
};
use crate::uri::{parse_prompt_name_or_uri, PromptRef, PromptSelector};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

const API_PREFIX: &str = "api/2.0/mlflow";

const PROMPT_FILTER: &str = "tags.`mlflow.prompt.is_prompt` = 'true'";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Deserialize)]
struct ApiError {
    error_code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct RegisteredModelResponse {
    registered_model: RegisteredModel,
}

#[derive(Deserialize)]
struct ModelVersionResponse {
    model_version: ModelVersion,
}

#[derive(Deserialize)]
struct ModelVersionsResponse {
    #[serde(default)]
    model_versions: Vec<ModelVersion>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RegisteredModelsResponse {
    #[serde(default)]
    registered_models: Vec<RegisteredModel>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RunResponse {
    run: Run,
}

#[derive(Deserialize)]
struct ListArtifactsResponse {
    #[serde(default)]
    files: Vec<FileInfo>,
}

#[derive(Deserialize)]
struct LoggedModelEnvelope {
    info: LoggedModel,
}

#[derive(Deserialize)]
struct LoggedModelResponse {
    model: LoggedModelEnvelope,
}

#[derive(Deserialize)]
struct LoggedModelsResponse {
    #[serde(default)]
    models: Vec<LoggedModelEnvelope>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Serialize)]
struct CreateModelVersionBody<'a> {
    name: &'a str,
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<Tag>,
}

/// Entry of the `mlflow.linkedPrompts` tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PromptLink {
    name: String,
    version: String,
}

// ============================================================================
// Client
// ============================================================================

/// Registry client over the REST API
#[derive(Debug)]
pub struct RestRegistryClient {
    http: HttpClient,
}

impl RestRegistryClient {
    /// Wrap an HTTP client whose base URL is the registry server
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Build a client for the registry URI in `settings`
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let uri = settings.registry_uri();
        let url = Url::parse(uri)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| {
                Error::unsupported(format!(
                    "Registry URI '{uri}' is not an HTTP(S) registry server"
                ))
            })?;

        let http = HttpClient::with_config(settings.http_client_config(url.as_str()))?;
        Ok(Self::new(http))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        config: RequestConfig,
    ) -> Result<T> {
        let url = format!("{API_PREFIX}/{path}");
        self.http
            .request_json(method, &url, &config)
            .await
            .map_err(api_error)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, config: RequestConfig) -> Result<T> {
        self.call(Method::GET, path, config).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        self.call(Method::POST, path, RequestConfig::new().json(body))
            .await
    }

    async fn latest_version(&self, name: &str) -> Result<ModelVersion> {
        let response: ModelVersionsResponse = self
            .post(
                "registered-models/get-latest-versions",
                json!({ "name": name }),
            )
            .await?;

        response
            .model_versions
            .into_iter()
            .max_by_key(|mv| mv.version.parse::<u64>().unwrap_or(0))
            .ok_or_else(|| Error::not_found(format!("Prompt '{name}' has no versions")))
    }
}

/// Turn an error body `{error_code, message}` into a typed registry error
fn api_error(err: Error) -> Error {
    match err {
        Error::HttpStatus { status, body } => match serde_json::from_str::<ApiError>(&body) {
            Ok(api) => Error::registry(ErrorCode::parse(&api.error_code), api.message),
            Err(_) => Error::HttpStatus { status, body },
        },
        other => other,
    }
}

fn search_config(filter: Option<String>, order_by: &[String], page: &PageRequest) -> RequestConfig {
    let mut config = RequestConfig::new()
        .query("max_results", page.max_results.to_string())
        .query_opt("filter", filter)
        .query_opt("page_token", page.page_token.clone());
    for column in order_by {
        config = config.query("order_by", column.as_str());
    }
    config
}

fn prompt_filter(filter: Option<&str>) -> String {
    match filter.map(str::trim) {
        Some(extra) if !extra.is_empty() => format!("{PROMPT_FILTER} AND {extra}"),
        _ => PROMPT_FILTER.to_string(),
    }
}

fn prompt_version_from(mv: ModelVersion) -> Result<PromptVersion> {
    let mut tags = mv.tags;
    let template = tags.remove(PROMPT_TEXT_TAG).ok_or_else(|| {
        Error::not_found(format!(
            "Model '{}' version {} is not a prompt",
            mv.name, mv.version
        ))
    })?;
    tags.remove(IS_PROMPT_TAG);

    let version = mv.version.parse::<u64>().map_err(|_| {
        Error::registry(
            ErrorCode::InvalidState,
            format!("Prompt '{}' has non-numeric version '{}'", mv.name, mv.version),
        )
    })?;

    Ok(PromptVersion {
        name: mv.name,
        version,
        template,
        commit_message: mv.description,
        creation_timestamp: mv.creation_timestamp,
        tags,
        aliases: mv.aliases,
    })
}

fn prompt_from(model: RegisteredModel) -> Prompt {
    let mut tags = model.tags;
    tags.remove(IS_PROMPT_TAG);
    Prompt {
        name: model.name,
        description: model.description,
        creation_timestamp: model.creation_timestamp,
        tags,
    }
}

/// Add `link` to a serialized link list; `None` when it is already there
fn merge_links(existing: Option<&String>, link: PromptLink) -> Result<Option<String>> {
    let mut links: Vec<PromptLink> = match existing {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)?,
        _ => Vec::new(),
    };
    if links.contains(&link) {
        return Ok(None);
    }
    links.push(link);
    Ok(Some(serde_json::to_string(&links)?))
}

#[async_trait]
impl RegistryClient for RestRegistryClient {
    async fn create_registered_model(&self, name: &str) -> Result<RegisteredModel> {
        let response: RegisteredModelResponse = self
            .post("registered-models/create", json!({ "name": name }))
            .await?;
        Ok(response.registered_model)
    }

    async fn create_model_version(&self, request: &CreateModelVersion) -> Result<ModelVersion> {
        let body = CreateModelVersionBody {
            name: &request.name,
            source: &request.source,
            run_id: request.run_id.as_deref(),
            model_id: request.model_id.as_deref(),
            description: request.description.as_deref(),
            tags: tag_list::to_tags(&request.tags),
        };
        let response: ModelVersionResponse = self
            .call(
                Method::POST,
                "model-versions/create",
                RequestConfig::new().json_body(&body)?,
            )
            .await?;
        Ok(response.model_version)
    }

    async fn get_model_version(&self, name: &str, version: &str) -> Result<ModelVersion> {
        let response: ModelVersionResponse = self
            .get(
                "model-versions/get",
                RequestConfig::new()
                    .query("name", name)
                    .query("version", version),
            )
            .await?;
        Ok(response.model_version)
    }

    async fn search_registered_models(
        &self,
        query: &SearchQuery,
        page: PageRequest,
    ) -> Result<Page<RegisteredModel>> {
        let response: RegisteredModelsResponse = self
            .get(
                "registered-models/search",
                search_config(query.filter.clone(), &query.order_by, &page),
            )
            .await?;
        Ok(Page::new(response.registered_models, response.next_page_token))
    }

    async fn search_model_versions(
        &self,
        query: &SearchQuery,
        page: PageRequest,
    ) -> Result<Page<ModelVersion>> {
        let response: ModelVersionsResponse = self
            .get(
                "model-versions/search",
                search_config(query.filter.clone(), &query.order_by, &page),
            )
            .await?;
        Ok(Page::new(response.model_versions, response.next_page_token))
    }

    async fn set_model_version_tag(
        &self,
        name: &str,
        version: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.post::<IgnoredAny>(
            "model-versions/set-tag",
            json!({ "name": name, "version": version, "key": key, "value": value }),
        )
        .await?;
        Ok(())
    }

    async fn get_run(&self, run_id: &str) -> Result<Run> {
        let response: RunResponse = self
            .get("runs/get", RequestConfig::new().query("run_id", run_id))
            .await?;
        Ok(response.run)
    }

    async fn list_run_artifacts(&self, run_id: &str, path: &str) -> Result<Vec<FileInfo>> {
        let path = Some(path).filter(|p| !p.is_empty());
        let response: ListArtifactsResponse = self
            .get(
                "artifacts/list",
                RequestConfig::new()
                    .query("run_id", run_id)
                    .query_opt("path", path),
            )
            .await?;
        Ok(response.files)
    }

    async fn search_logged_models(
        &self,
        experiment_ids: &[String],
        filter: Option<&str>,
        page_token: Option<String>,
    ) -> Result<Page<LoggedModel>> {
        let mut body = json!({ "experiment_ids": experiment_ids });
        if let Some(filter) = filter {
            body["filter"] = json!(filter);
        }
        if let Some(token) = page_token {
            body["page_token"] = json!(token);
        }

        let response: LoggedModelsResponse = self.post("logged-models/search", body).await?;
        let models = response.models.into_iter().map(|m| m.info).collect();
        Ok(Page::new(models, response.next_page_token))
    }

    async fn get_logged_model(&self, model_id: &str) -> Result<LoggedModel> {
        let response: LoggedModelResponse = self
            .get(&format!("logged-models/{model_id}"), RequestConfig::new())
            .await?;
        Ok(response.model.info)
    }

    async fn set_logged_model_tags(&self, model_id: &str, tags: &StringMap) -> Result<()> {
        self.call::<IgnoredAny>(
            Method::PATCH,
            &format!("logged-models/{model_id}/tags"),
            RequestConfig::new().json(json!({ "tags": tag_list::to_tags(tags) })),
        )
        .await?;
        Ok(())
    }

    async fn register_prompt(&self, request: &RegisterPrompt) -> Result<PromptVersion> {
        let created = self
            .post::<IgnoredAny>(
                "registered-models/create",
                json!({
                    "name": request.name,
                    "tags": [{ "key": IS_PROMPT_TAG, "value": "true" }],
                }),
            )
            .await;
        match created {
            Ok(_) => debug!("Created prompt '{}'", request.name),
            Err(e) if e.is_already_exists() => {
                debug!("Prompt '{}' exists, adding a version", request.name);
            }
            Err(e) => return Err(e),
        }

        let mut tags = request.tags.clone();
        tags.insert(IS_PROMPT_TAG.to_string(), "true".to_string());
        tags.insert(PROMPT_TEXT_TAG.to_string(), request.template.clone());

        let version = self
            .create_model_version(&CreateModelVersion {
                name: request.name.clone(),
                source: format!("prompts:/{}", request.name),
                description: request.commit_message.clone(),
                tags,
                ..Default::default()
            })
            .await?;
        prompt_version_from(version)
    }

    async fn load_prompt(
        &self,
        prompt: &PromptRef,
        allow_missing: bool,
    ) -> Result<Option<PromptVersion>> {
        let found = match &prompt.selector {
            PromptSelector::Version(version) => {
                self.get_model_version(&prompt.name, &version.to_string())
                    .await
            }
            PromptSelector::Alias(alias) => self
                .get::<ModelVersionResponse>(
                    "registered-models/alias",
                    RequestConfig::new()
                        .query("name", prompt.name.as_str())
                        .query("alias", alias.as_str()),
                )
                .await
                .map(|r| r.model_version),
            PromptSelector::Latest => self.latest_version(&prompt.name).await,
        };

        match found.and_then(prompt_version_from) {
            Ok(prompt) => Ok(Some(prompt)),
            Err(e) if allow_missing && e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn search_prompts(&self, filter: Option<&str>, page: PageRequest) -> Result<Page<Prompt>> {
        let response: RegisteredModelsResponse = self
            .get(
                "registered-models/search",
                search_config(Some(prompt_filter(filter)), &[], &page),
            )
            .await?;
        let prompts = response.registered_models.into_iter().map(prompt_from).collect();
        Ok(Page::new(prompts, response.next_page_token))
    }

    async fn link_prompt_version_to_run(&self, run_id: &str, prompt_uri: &str) -> Result<()> {
        let prompt = parse_prompt_name_or_uri(prompt_uri, None)?;
        let PromptSelector::Version(version) = prompt.selector else {
            return Err(Error::invalid_parameter(format!(
                "Only a specific prompt version can be linked to a run, got '{prompt_uri}'"
            )));
        };

        let run = self.get_run(run_id).await?;
        let link = PromptLink {
            name: prompt.name,
            version: version.to_string(),
        };
        if let Some(value) = merge_links(run.data.tags.get(LINKED_PROMPTS_TAG), link)? {
            self.post::<IgnoredAny>(
                "runs/set-tag",
                json!({ "run_id": run_id, "key": LINKED_PROMPTS_TAG, "value": value }),
            )
            .await?;
        }
        Ok(())
    }

    async fn link_prompt_version_to_model(
        &self,
        name: &str,
        version: u64,
        model_id: &str,
    ) -> Result<()> {
        let model = self.get_logged_model(model_id).await?;
        let link = PromptLink {
            name: name.to_string(),
            version: version.to_string(),
        };
        if let Some(value) = merge_links(model.tags.get(LINKED_PROMPTS_TAG), link)? {
            let tags = StringMap::from([(LINKED_PROMPTS_TAG.to_string(), value)]);
            self.set_logged_model_tags(model_id, &tags).await?;
        }
        Ok(())
    }

    async fn set_prompt_alias(&self, name: &str, alias: &str, version: u64) -> Result<()> {
        self.post::<IgnoredAny>(
            "registered-models/alias",
            json!({ "name": name, "alias": alias, "version": version.to_string() }),
        )
        .await?;
        Ok(())
    }

    async fn delete_prompt_alias(&self, name: &str, alias: &str) -> Result<()> {
        self.call::<IgnoredAny>(
            Method::DELETE,
            "registered-models/alias",
            RequestConfig::new().query("name", name).query("alias", alias),
        )
        .await?;
        Ok(())
    }
}
