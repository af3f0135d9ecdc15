//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::client::SearchQuery;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::fluent::{LoadPromptOptions, RegisterOptions, Registry};
use crate::types::StringMap;
use serde_json::{json, Value};
use std::fs;
use std::time::Duration;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Settings from the config file and environment, with CLI flags on top
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.cli.config.as_deref())?;
        if let Some(uri) = &self.cli.tracking_uri {
            settings.tracking_uri = Some(uri.clone());
        }
        if let Some(uri) = &self.cli.registry_uri {
            settings.registry_uri = Some(uri.clone());
        }
        Ok(settings)
    }

    /// Run the CLI command and print its result
    pub async fn run(&self) -> Result<()> {
        let registry = Registry::from_settings(self.settings()?)?;
        let output = self.execute(&registry).await?;
        self.output_message(&output);
        Ok(())
    }

    /// Run the CLI command against `registry`, returning the message to print
    pub async fn execute(&self, registry: &Registry) -> Result<Value> {
        match &self.cli.command {
            Commands::Register {
                model_uri,
                name,
                await_secs,
                tags,
            } => {
                let mut options = RegisterOptions {
                    tags: to_map(tags),
                    ..Default::default()
                };
                if let Some(secs) = await_secs {
                    options = options.await_for(Duration::from_secs(*secs));
                }
                let version = registry.register_model(model_uri, name, options).await?;
                Ok(json!({ "type": "MODEL_VERSION", "model_version": version }))
            }
            Commands::SearchModels {
                filter,
                order_by,
                max_results,
            } => {
                let query = search_query(filter.as_deref(), order_by);
                let models = registry
                    .search_registered_models(*max_results, &query)
                    .await?;
                Ok(json!({ "type": "REGISTERED_MODELS", "registered_models": models }))
            }
            Commands::SearchVersions {
                filter,
                order_by,
                max_results,
            } => {
                let query = search_query(filter.as_deref(), order_by);
                let versions = registry.search_model_versions(*max_results, &query).await?;
                Ok(json!({ "type": "MODEL_VERSIONS", "model_versions": versions }))
            }
            Commands::SearchPrompts {
                filter,
                max_results,
            } => {
                let prompts = registry
                    .search_prompts(filter.as_deref(), *max_results)
                    .await?;
                Ok(json!({ "type": "PROMPTS", "prompts": prompts }))
            }
            Commands::LoadPrompt {
                name_or_uri,
                version,
                allow_missing,
                model_id,
            } => {
                let options = LoadPromptOptions {
                    version: *version,
                    allow_missing: *allow_missing,
                    link_to_model: model_id.is_some(),
                    model_id: model_id.clone(),
                };
                let prompt = registry.load_prompt(name_or_uri, options).await?;
                Ok(json!({ "type": "PROMPT", "prompt": prompt }))
            }
            Commands::RegisterPrompt {
                name,
                template,
                template_file,
                commit_message,
                tags,
            } => {
                let template = match (template, template_file) {
                    (Some(text), _) => text.clone(),
                    (None, Some(path)) => fs::read_to_string(path).map_err(|e| {
                        Error::config(format!(
                            "Failed to read template file '{}': {e}",
                            path.display()
                        ))
                    })?,
                    (None, None) => {
                        return Err(Error::config(
                            "A template is required (use --template or --template-file)",
                        ))
                    }
                };
                let prompt = registry
                    .register_prompt(name, &template, commit_message.as_deref(), to_map(tags))
                    .await?;
                Ok(json!({ "type": "PROMPT", "prompt": prompt }))
            }
            Commands::SetAlias {
                name,
                alias,
                version,
            } => {
                registry.set_prompt_alias(name, alias, *version).await?;
                Ok(json!({ "type": "ALIAS_SET", "name": name, "alias": alias, "version": version }))
            }
            Commands::DeleteAlias { name, alias } => {
                registry.delete_prompt_alias(name, alias).await?;
                Ok(json!({ "type": "ALIAS_DELETED", "name": name, "alias": alias }))
            }
            Commands::SetTag {
                name,
                version,
                key,
                value,
            } => {
                registry
                    .set_model_version_tag(name, version, key, value)
                    .await?;
                Ok(json!({
                    "type": "TAG_SET",
                    "name": name,
                    "version": version,
                    "key": key,
                    "value": value
                }))
            }
        }
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        let rendered = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(msg),
            OutputFormat::Pretty => serde_json::to_string_pretty(msg),
        };
        println!("{}", rendered.unwrap_or_default());
    }
}

fn to_map(pairs: &[(String, String)]) -> StringMap {
    pairs.iter().cloned().collect()
}

fn search_query(filter: Option<&str>, order_by: &[String]) -> SearchQuery {
    SearchQuery {
        filter: filter.map(str::to_string),
        order_by: order_by.to_vec(),
    }
}
