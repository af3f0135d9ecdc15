//! Common types used throughout modelreg
//!
//! Registry entities as the REST API returns them, plus shared type
//! aliases and the well-known tag keys the facade reads and writes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

// ============================================================================
// Well-known names
// ============================================================================

/// File that marks a directory as a saved model
pub const MLMODEL_FILE_NAME: &str = "MLmodel";

/// Logged-model tag holding the JSON list of registered versions
pub const MODEL_VERSIONS_TAG: &str = "mlflow.modelVersions";

/// Run / logged-model tag holding the JSON list of linked prompts
pub const LINKED_PROMPTS_TAG: &str = "mlflow.linkedPrompts";

/// Registered-model tag marking the model as a prompt
pub const IS_PROMPT_TAG: &str = "mlflow.prompt.is_prompt";

/// Model-version tag carrying the prompt template text
pub const PROMPT_TEXT_TAG: &str = "mlflow.prompt.text";

// ============================================================================
// HTTP Types
// ============================================================================

/// Backoff strategy for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Tags
// ============================================================================

/// A single key/value tag as it appears on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// (De)serialize a tag map as the `[{key, value}]` list the API uses
pub mod tag_list {
    use super::{StringMap, Tag};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(tags: &StringMap, serializer: S) -> Result<S::Ok, S::Error> {
        to_tags(tags).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StringMap, D::Error> {
        let tags = Option::<Vec<Tag>>::deserialize(deserializer)?.unwrap_or_default();
        Ok(tags.into_iter().map(|t| (t.key, t.value)).collect())
    }

    /// Sorted list form of a tag map
    pub fn to_tags(tags: &StringMap) -> Vec<Tag> {
        let mut list: Vec<Tag> = tags.iter().map(|(k, v)| Tag::new(k, v)).collect();
        list.sort_by(|a, b| a.key.cmp(&b.key));
        list
    }
}

// ============================================================================
// Registered Models
// ============================================================================

/// A named model in the registry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegisteredModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_timestamp: Option<i64>,
    #[serde(default)]
    pub latest_versions: Vec<ModelVersion>,
    #[serde(default, with = "tag_list")]
    pub tags: StringMap,
    #[serde(default)]
    pub aliases: Vec<RegisteredModelAlias>,
}

/// Alias pointing at a version of a registered model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredModelAlias {
    pub alias: String,
    pub version: String,
}

/// Lifecycle of a model version while the backend copies its artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelVersionStatus {
    PendingRegistration,
    FailedRegistration,
    #[default]
    Ready,
}

/// A single version of a registered model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default)]
    pub status: ModelVersionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<i64>,
    #[serde(default, with = "tag_list")]
    pub tags: StringMap,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Entry of the `mlflow.modelVersions` tag on a logged model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersionRef {
    pub name: String,
    pub version: String,
}

// ============================================================================
// Prompts
// ============================================================================

/// A named prompt in the registry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<i64>,
    #[serde(default)]
    pub tags: StringMap,
}

/// A single version of a prompt template
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PromptVersion {
    pub name: String,
    pub version: u64,
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<i64>,
    #[serde(default)]
    pub tags: StringMap,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl PromptVersion {
    /// Canonical `prompts:/name/version` URI of this version
    pub fn uri(&self) -> String {
        format!("prompts:/{}/{}", self.name, self.version)
    }
}

// ============================================================================
// Runs and Logged Models
// ============================================================================

/// A model logged to an experiment, independent of the registry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoggedModel {
    pub model_id: String,
    pub name: String,
    pub experiment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_run_id: Option<String>,
    #[serde(default, with = "tag_list")]
    pub tags: StringMap,
}

/// Tracking run, reduced to what registration needs
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Run {
    pub info: RunInfo,
    #[serde(default)]
    pub data: RunData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<RunOutputs>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment_id: String,
    /// Root of the run's artifact store, e.g. `s3://bucket/0/<run_id>/artifacts`
    #[serde(default)]
    pub artifact_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunData {
    #[serde(default, with = "tag_list")]
    pub tags: StringMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunOutputs {
    #[serde(default)]
    pub model_outputs: Vec<ModelOutput>,
}

/// A model logged by a run at a given step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub model_id: String,
    #[serde(default)]
    pub step: i64,
}

/// Artifact listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
}
