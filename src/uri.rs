//! URI forms the facade understands
//!
//! - `runs:/<run_id>/<artifact_path>`
//! - `models:/<model_id>`
//! - `prompts:/<name>/<version>`, `prompts:/<name>@<alias>`, `prompts:/<name>`

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

const RUNS_SCHEME: &str = "runs:/";
const MODELS_SCHEME: &str = "models:/";
const PROMPTS_SCHEME: &str = "prompts:/";

static PROMPT_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^prompts:/+(?P<name>[^/@]+)(?:/(?P<version>[^/@]+)|@(?P<alias>[^/@]+))?/?$")
        .expect("prompt URI pattern is valid")
});

// ============================================================================
// Runs and models
// ============================================================================

/// Check for a `runs:/` URI
pub fn is_runs_uri(uri: &str) -> bool {
    uri.starts_with(RUNS_SCHEME)
}

/// Split a `runs:/<run_id>/<path>` URI into run id and artifact path
pub fn parse_runs_uri(uri: &str) -> Result<(String, String)> {
    let rest = uri
        .strip_prefix(RUNS_SCHEME)
        .ok_or_else(|| Error::invalid_parameter(format!("Not a runs:/ URI: '{uri}'")))?;
    let rest = rest.trim_start_matches('/');

    let (run_id, path) = rest.split_once('/').unwrap_or((rest, ""));
    if run_id.is_empty() {
        return Err(Error::invalid_parameter(format!(
            "Not a proper runs:/ URI: '{uri}'. Runs URIs must be of the form 'runs:/<run_id>/run-relative/path/to/artifact'"
        )));
    }

    Ok((run_id.to_string(), path.trim_end_matches('/').to_string()))
}

/// Model id of a `models:/<model_id>` URI.
///
/// Registered-model forms (`models:/name/1`, `models:/name@alias`) carry no
/// model id and yield `None`.
pub fn parse_model_id_if_present(uri: &str) -> Option<String> {
    let rest = uri.strip_prefix(MODELS_SCHEME)?.trim_matches('/');
    if rest.is_empty() || rest.contains('/') || rest.contains('@') {
        return None;
    }
    Some(rest.to_string())
}

// ============================================================================
// Registries
// ============================================================================

/// Check for the legacy workspace registry (`databricks`, `databricks://profile`),
/// which has no prompt support. `databricks-uc` is a different scheme.
pub fn is_legacy_workspace_registry(uri: &str) -> bool {
    uri == "databricks" || uri.starts_with("databricks://")
}

// ============================================================================
// Prompts
// ============================================================================

/// Which version of a prompt to load
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PromptSelector {
    Version(u64),
    Alias(String),
    Latest,
}

/// A resolved prompt reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PromptRef {
    pub name: String,
    pub selector: PromptSelector,
}

impl PromptRef {
    pub fn version(name: impl Into<String>, version: u64) -> Self {
        Self {
            name: name.into(),
            selector: PromptSelector::Version(version),
        }
    }

    pub fn alias(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: PromptSelector::Alias(alias.into()),
        }
    }
}

impl fmt::Display for PromptRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            PromptSelector::Version(v) => write!(f, "prompts:/{}/{v}", self.name),
            PromptSelector::Alias(alias) => write!(f, "prompts:/{}@{alias}", self.name),
            PromptSelector::Latest => write!(f, "prompts:/{}", self.name),
        }
    }
}

/// Check whether a name or URI refers to a prompt alias
pub fn is_alias_reference(name_or_uri: &str) -> bool {
    name_or_uri.contains('@')
}

/// Resolve a prompt name plus version, or a `prompts:/` URI, to a reference.
///
/// A URI must not be combined with an explicit version; a bare name needs one.
pub fn parse_prompt_name_or_uri(name_or_uri: &str, version: Option<u64>) -> Result<PromptRef> {
    if !name_or_uri.starts_with(PROMPTS_SCHEME) {
        let version = version.ok_or_else(|| {
            Error::invalid_parameter(format!(
                "Version must be specified when loading a prompt by name. \
                 Use a prompt URI (e.g. 'prompts:/{name_or_uri}') to load the latest version."
            ))
        })?;
        if name_or_uri.is_empty() || name_or_uri.contains('/') {
            return Err(Error::invalid_parameter(format!(
                "Invalid prompt name: '{name_or_uri}'"
            )));
        }
        return Ok(PromptRef::version(name_or_uri, version));
    }

    if version.is_some() {
        return Err(Error::invalid_parameter(
            "The version must not be specified when loading a prompt by URI; \
             include it in the URI instead (e.g. 'prompts:/name/1').",
        ));
    }

    let caps = PROMPT_URI.captures(name_or_uri).ok_or_else(|| {
        Error::invalid_parameter(format!(
            "Invalid prompt URI: '{name_or_uri}'. Expected 'prompts:/<name>/<version>' or 'prompts:/<name>@<alias>'"
        ))
    })?;
    let name = caps["name"].to_string();

    if let Some(version) = caps.name("version") {
        let version = version.as_str().parse::<u64>().map_err(|_| {
            Error::invalid_parameter(format!(
                "Prompt version must be a positive integer, got '{}'",
                version.as_str()
            ))
        })?;
        return Ok(PromptRef::version(name, version));
    }

    match caps.name("alias").map(|m| m.as_str()) {
        Some("latest") | None => Ok(PromptRef {
            name,
            selector: PromptSelector::Latest,
        }),
        Some(alias) => Ok(PromptRef::alias(name, alias)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_runs_uri() {
        assert_eq!(
            parse_runs_uri("runs:/abc123/models/clf").unwrap(),
            ("abc123".to_string(), "models/clf".to_string())
        );
        assert_eq!(
            parse_runs_uri("runs:/abc123").unwrap(),
            ("abc123".to_string(), String::new())
        );
        assert!(parse_runs_uri("runs:/").is_err());
        assert!(parse_runs_uri("s3://bucket/path").is_err());
        assert!(is_runs_uri("runs:/abc/model"));
        assert!(!is_runs_uri("models:/m-1"));
    }

    #[test_case("models:/m-0123abcd", Some("m-0123abcd") ; "model id")]
    #[test_case("models:/m-0123abcd/", Some("m-0123abcd") ; "trailing slash")]
    #[test_case("models:/forecaster/3", None ; "registered version")]
    #[test_case("models:/forecaster@champion", None ; "registered alias")]
    #[test_case("runs:/abc/model", None ; "runs uri")]
    #[test_case("/local/path", None ; "local path")]
    fn test_parse_model_id(uri: &str, expected: Option<&str>) {
        assert_eq!(parse_model_id_if_present(uri).as_deref(), expected);
    }

    #[test]
    fn test_legacy_workspace_registry() {
        assert!(is_legacy_workspace_registry("databricks"));
        assert!(is_legacy_workspace_registry("databricks://profile"));
        assert!(!is_legacy_workspace_registry("databricks-uc"));
        assert!(!is_legacy_workspace_registry("http://localhost:5000"));
    }

    #[test_case("greeting", Some(2), PromptRef::version("greeting", 2) ; "name and version")]
    #[test_case("prompts:/greeting/3", None, PromptRef::version("greeting", 3) ; "version uri")]
    #[test_case("prompts:/greeting@prod", None, PromptRef::alias("greeting", "prod") ; "alias uri")]
    #[test_case("prompts:/greeting", None, PromptRef { name: "greeting".into(), selector: PromptSelector::Latest } ; "latest uri")]
    #[test_case("prompts:/greeting@latest", None, PromptRef { name: "greeting".into(), selector: PromptSelector::Latest } ; "latest alias")]
    fn test_parse_prompt_ok(input: &str, version: Option<u64>, expected: PromptRef) {
        assert_eq!(parse_prompt_name_or_uri(input, version).unwrap(), expected);
    }

    #[test_case("greeting", None ; "name without version")]
    #[test_case("prompts:/greeting/1", Some(1) ; "uri with version")]
    #[test_case("prompts:/greeting/one", None ; "non numeric version")]
    #[test_case("prompts:/", None ; "empty uri")]
    #[test_case("a/b", Some(1) ; "slash in name")]
    fn test_parse_prompt_invalid(input: &str, version: Option<u64>) {
        let err = parse_prompt_name_or_uri(input, version).unwrap_err();
        assert_eq!(err.code(), Some(&crate::error::ErrorCode::InvalidParameterValue));
    }

    #[test]
    fn test_prompt_ref_display() {
        assert_eq!(PromptRef::version("p", 1).to_string(), "prompts:/p/1");
        assert_eq!(PromptRef::alias("p", "prod").to_string(), "prompts:/p@prod");
        assert!(is_alias_reference("prompts:/p@prod"));
    }
}
