//! Model registration and search

use super::{
    Registry, SEARCH_MODEL_VERSION_MAX_RESULTS_DEFAULT, SEARCH_REGISTERED_MODEL_MAX_RESULTS_DEFAULT,
};
use crate::client::{CreateModelVersion, SearchQuery};
use crate::error::{Error, ErrorCode, Result};
use crate::pagination::{aggregate, collect_all, PageRequest};
use crate::types::{
    FileInfo, LoggedModel, ModelVersion, ModelVersionRef, ModelVersionStatus, RegisteredModel, Run,
    StringMap, MLMODEL_FILE_NAME, MODEL_VERSIONS_TAG,
};
use crate::uri::{is_runs_uri, parse_model_id_if_present, parse_runs_uri};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, info_span, warn, Instrument};

/// Options of `Registry::register_model`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// How long to wait for the new version to become READY. `None` uses the
    /// configured default; zero does not wait.
    pub await_registration_for: Option<Duration>,
    /// Tags set on the new model version
    pub tags: StringMap,
}

impl RegisterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn await_for(mut self, timeout: Duration) -> Self {
        self.await_registration_for = Some(timeout);
        self
    }

    #[must_use]
    pub fn no_wait(self) -> Self {
        self.await_for(Duration::ZERO)
    }

    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Where a new model version's artifacts come from
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedSource {
    source: String,
    run_id: Option<String>,
    model_id: Option<String>,
}

fn is_model_file(file: &FileInfo) -> bool {
    !file.is_dir && file.path.rsplit('/').next() == Some(MLMODEL_FILE_NAME)
}

/// Underlying storage location of `path` inside the run's artifact root
fn artifact_location(run: &Run, path: &str) -> Result<String> {
    let root = run.info.artifact_uri.trim_end_matches('/');
    if root.is_empty() {
        return Err(Error::invalid_parameter(format!(
            "Run {} has no artifact location",
            run.info.run_id
        )));
    }
    let path = path.trim_matches('/');
    Ok(if path.is_empty() {
        root.to_string()
    } else {
        format!("{root}/{path}")
    })
}

impl Registry {
    /// Create a new version of model `name` from `model_uri`, creating the
    /// registered model first when it does not exist yet.
    pub async fn register_model(
        &self,
        model_uri: &str,
        name: &str,
        options: RegisterOptions,
    ) -> Result<ModelVersion> {
        let span = info_span!("register_model", model = %name);
        async move {
            match self.client.create_registered_model(name).await {
                Ok(model) => info!("Successfully registered model '{}'.", model.name),
                Err(e) if e.is_already_exists() => info!(
                    "Registered model '{name}' already exists. Creating a new version of this model..."
                ),
                Err(e) => return Err(e),
            }

            let resolved = self.resolve_source(model_uri).await?;
            let request = CreateModelVersion {
                name: name.to_string(),
                source: resolved.source,
                run_id: resolved.run_id,
                model_id: resolved.model_id.clone(),
                tags: options.tags,
                description: None,
            };
            let mut version = self.client.create_model_version(&request).await?;

            let timeout = options
                .await_registration_for
                .unwrap_or_else(|| self.settings.await_registration());
            if !timeout.is_zero() {
                version = self.await_ready(version, timeout).await?;
            }
            info!("Created version '{}' of model '{}'.", version.version, version.name);

            if let Some(model_id) = &resolved.model_id {
                self.record_model_version(model_id, &version).await?;
            }
            Ok(version)
        }
        .instrument(span)
        .await
    }

    async fn resolve_source(&self, model_uri: &str) -> Result<ResolvedSource> {
        if !is_runs_uri(model_uri) {
            return Ok(ResolvedSource {
                source: model_uri.to_string(),
                run_id: None,
                model_id: parse_model_id_if_present(model_uri),
            });
        }

        let (run_id, artifact_path) = parse_runs_uri(model_uri)?;
        let artifacts = self
            .client
            .list_run_artifacts(&run_id, &artifact_path)
            .await?;
        let run = self.client.get_run(&run_id).await?;
        if artifacts.iter().any(is_model_file) {
            return Ok(ResolvedSource {
                source: artifact_location(&run, &artifact_path)?,
                run_id: Some(run_id),
                model_id: None,
            });
        }

        let candidates = self.logged_models_from_run(&run, &artifact_path).await?;
        let model_id = select_logged_model(&run, candidates, &artifact_path)?;
        let source = format!("models:/{model_id}");
        warn!(
            "Run with id {run_id} has no artifacts at artifact path '{artifact_path}', \
             registering model based on {source} instead"
        );

        Ok(ResolvedSource {
            source,
            run_id: Some(run_id),
            model_id: Some(model_id),
        })
    }

    /// Logged models named `name` in the run's experiment that the run produced
    async fn logged_models_from_run(&self, run: &Run, name: &str) -> Result<Vec<LoggedModel>> {
        let client = self.client.as_ref();
        let experiment_ids = [run.info.experiment_id.clone()];
        let filter = format!("name = '{name}'");
        let (experiment_ids, filter) = (&experiment_ids[..], filter.as_str());

        collect_all(
            move |token| client.search_logged_models(experiment_ids, Some(filter), token),
            |model| model.source_run_id.as_deref() == Some(run.info.run_id.as_str()),
        )
        .await
    }

    /// Poll until the version leaves PENDING_REGISTRATION or `timeout` passes
    async fn await_ready(&self, created: ModelVersion, timeout: Duration) -> Result<ModelVersion> {
        let deadline = Instant::now() + timeout;
        let interval = self.settings.await_poll_interval();
        info!(
            "Waiting up to {} seconds for model version to finish creation. Model name: {}, version {}",
            timeout.as_secs(),
            created.name,
            created.version
        );

        let mut current = created;
        loop {
            match current.status {
                ModelVersionStatus::Ready => return Ok(current),
                ModelVersionStatus::FailedRegistration => {
                    return Err(Error::RegistrationFailed {
                        message: current.status_message.unwrap_or_default(),
                        name: current.name,
                        version: current.version,
                    });
                }
                ModelVersionStatus::PendingRegistration => {}
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "Model version {} of '{}' is still pending after {}s; returning it as is",
                    current.version,
                    current.name,
                    timeout.as_secs()
                );
                return Ok(current);
            }
            sleep(interval.min(deadline - now)).await;
            current = self
                .client
                .get_model_version(&current.name, &current.version)
                .await?;
        }
    }

    /// Append `{name, version}` to the logged model's version list tag
    async fn record_model_version(&self, model_id: &str, version: &ModelVersion) -> Result<()> {
        let model = self.client.get_logged_model(model_id).await?;
        let mut versions: Vec<ModelVersionRef> = match model.tags.get(MODEL_VERSIONS_TAG) {
            Some(existing) if !existing.trim().is_empty() => serde_json::from_str(existing)?,
            _ => Vec::new(),
        };
        versions.push(ModelVersionRef {
            name: version.name.clone(),
            version: version.version.clone(),
        });

        let tags = StringMap::from([(
            MODEL_VERSIONS_TAG.to_string(),
            serde_json::to_string(&versions)?,
        )]);
        self.client.set_logged_model_tags(model_id, &tags).await
    }

    /// Registered models matching `query`, across as many pages as needed
    pub async fn search_registered_models(
        &self,
        max_results: Option<usize>,
        query: &SearchQuery,
    ) -> Result<Vec<RegisteredModel>> {
        let client = self.client.as_ref();
        let page = aggregate(
            move |count, token| client.search_registered_models(query, PageRequest::new(count, token)),
            SEARCH_REGISTERED_MODEL_MAX_RESULTS_DEFAULT,
            max_results,
        )
        .await?;
        Ok(page.into_items())
    }

    /// Model versions matching `query`, across as many pages as needed
    pub async fn search_model_versions(
        &self,
        max_results: Option<usize>,
        query: &SearchQuery,
    ) -> Result<Vec<ModelVersion>> {
        let client = self.client.as_ref();
        let page = aggregate(
            move |count, token| client.search_model_versions(query, PageRequest::new(count, token)),
            SEARCH_MODEL_VERSION_MAX_RESULTS_DEFAULT,
            max_results,
        )
        .await?;
        Ok(page.into_items())
    }

    pub async fn set_model_version_tag(
        &self,
        name: &str,
        version: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.client
            .set_model_version_tag(name, version, key, value)
            .await
    }
}

/// Pick the logged model to register among the run's candidates; with
/// several, the one logged at the largest step wins.
fn select_logged_model(run: &Run, candidates: Vec<LoggedModel>, artifact_path: &str) -> Result<String> {
    let run_id = &run.info.run_id;
    if candidates.len() > 1 {
        let outputs = run.outputs.as_ref().ok_or_else(|| {
            Error::invalid_parameter(format!(
                "Multiple logged models found for run {run_id}. Cannot determine which model \
                 to register. Please use `models:/<model_id>` instead."
            ))
        })?;
        let step_of = |model: &LoggedModel| {
            outputs
                .model_outputs
                .iter()
                .find(|o| o.model_id == model.model_id)
                .map_or(0, |o| o.step)
        };
        return candidates
            .into_iter()
            .max_by_key(|model| step_of(model))
            .map(|model| model.model_id)
            .ok_or_else(|| Error::registry(ErrorCode::InternalError, "no candidate models"));
    }

    candidates
        .into_iter()
        .next()
        .map(|model| model.model_id)
        .ok_or_else(|| {
            Error::not_found(format!(
                "Unable to find a logged_model with artifact_path {artifact_path} under run {run_id}"
            ))
        })
}
