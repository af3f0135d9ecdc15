//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: facade → REST client → HTTP → registry

use clap::Parser;
use modelreg::cli::{Cli, Runner};
use modelreg::config::{AuthSettings, HttpSettings};
use modelreg::context::ActiveContext;
use modelreg::{LoadPromptOptions, ModelVersionStatus, RegisterOptions, Registry, Settings};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer) -> Settings {
    Settings {
        registry_uri: Some(server.uri()),
        auth: AuthSettings {
            token: Some("secret-token".to_string()),
            ..Default::default()
        },
        http: HttpSettings {
            max_retries: 0,
            ..Default::default()
        },
        await_poll_interval_ms: 10,
        ..Default::default()
    }
}

fn prompt_version(name: &str, version: &str, template: &str) -> serde_json::Value {
    json!({
        "name": name,
        "version": version,
        "tags": [
            { "key": "mlflow.prompt.is_prompt", "value": "true" },
            { "key": "mlflow.prompt.text", "value": template }
        ]
    })
}

// ============================================================================
// Model registration
// ============================================================================

#[tokio::test]
async fn test_register_model_from_run_artifacts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/registered-models/create"))
        .and(header("Authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": "RESOURCE_ALREADY_EXISTS",
            "message": "Registered Model (name=forecaster) already exists."
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/artifacts/list"))
        .and(query_param("run_id", "r1"))
        .and(query_param("path", "model"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                { "path": "model/MLmodel", "is_dir": false, "file_size": 412 },
                { "path": "model/model.pkl", "is_dir": false, "file_size": 9120 }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/runs/get"))
        .and(query_param("run_id", "r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run": {
                "info": {
                    "run_id": "r1",
                    "experiment_id": "0",
                    "artifact_uri": "mlflow-artifacts:/0/r1/artifacts"
                },
                "data": {}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/model-versions/create"))
        .and(body_partial_json(json!({
            "name": "forecaster",
            "source": "mlflow-artifacts:/0/r1/artifacts/model",
            "run_id": "r1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model_version": { "name": "forecaster", "version": "7", "status": "PENDING_REGISTRATION" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/model-versions/get"))
        .and(query_param("version", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model_version": { "name": "forecaster", "version": "7", "status": "READY" }
        })))
        .mount(&server)
        .await;

    let registry = Registry::from_settings(settings(&server)).unwrap();
    let version = registry
        .register_model(
            "runs:/r1/model",
            "forecaster",
            RegisterOptions::new().await_for(Duration::from_secs(5)),
        )
        .await
        .unwrap();

    assert_eq!(version.version, "7");
    assert_eq!(version.status, ModelVersionStatus::Ready);
}

#[tokio::test]
async fn test_register_logged_model_updates_version_tag() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/registered-models/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "registered_model": { "name": "forecaster" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/model-versions/create"))
        .and(body_partial_json(json!({ "source": "models:/m-1", "model_id": "m-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model_version": { "name": "forecaster", "version": "1", "status": "READY" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/logged-models/m-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": { "info": { "model_id": "m-1", "name": "model", "experiment_id": "0" } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/2.0/mlflow/logged-models/m-1/tags"))
        .and(body_partial_json(json!({
            "tags": [{
                "key": "mlflow.modelVersions",
                "value": "[{\"name\":\"forecaster\",\"version\":\"1\"}]"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let registry = Registry::from_settings(settings(&server)).unwrap();
    registry
        .register_model("models:/m-1", "forecaster", RegisterOptions::new())
        .await
        .unwrap();
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_search_registered_models_across_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/registered-models/search"))
        .and(query_param("page_token", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "registered_models": [{ "name": "c" }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/registered-models/search"))
        .and(query_param("max_results", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "registered_models": [{ "name": "a" }, { "name": "b" }],
            "next_page_token": "p2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = Registry::from_settings(settings(&server)).unwrap();
    let models = registry
        .search_registered_models(None, &Default::default())
        .await
        .unwrap();

    let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

// ============================================================================
// Prompts
// ============================================================================

#[tokio::test]
async fn test_load_prompt_links_run_and_caches() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/model-versions/get"))
        .and(query_param("name", "greeting"))
        .and(query_param("version", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model_version": prompt_version("greeting", "2", "Hello {{name}}")
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/runs/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run": { "info": { "run_id": "r1", "experiment_id": "0" }, "data": {} }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/set-tag"))
        .and(body_partial_json(json!({
            "run_id": "r1",
            "key": "mlflow.linkedPrompts",
            "value": "[{\"name\":\"greeting\",\"version\":\"2\"}]"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let context = ActiveContext::new();
    context.set_active_run(Some("r1".to_string()));
    let registry = Registry::from_settings(settings(&server))
        .unwrap()
        .with_context(context);

    for _ in 0..2 {
        let prompt = registry
            .load_prompt(
                "greeting",
                LoadPromptOptions::new().version(2).link_to_model(false),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(prompt.template, "Hello {{name}}");
    }
}

#[tokio::test]
async fn test_load_prompt_links_model_in_background() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/registered-models/alias"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model_version": prompt_version("greeting", "4", "Hi")
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/logged-models/m-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": { "info": { "model_id": "m-7", "name": "agent", "experiment_id": "0" } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/2.0/mlflow/logged-models/m-7/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let registry = Registry::from_settings(settings(&server)).unwrap();
    let prompt = registry
        .load_prompt("prompts:/greeting@prod", LoadPromptOptions::new().model_id("m-7"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(prompt.version, 4);

    let mut patched = false;
    for _ in 0..200 {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests.iter().any(|r| r.method.as_str() == "PATCH") {
            patched = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(patched, "prompt was never linked to the model");
}

#[tokio::test]
async fn test_load_prompt_survives_link_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/model-versions/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model_version": prompt_version("greeting", "1", "Hi")
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/logged-models/m-gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error_code": "RESOURCE_DOES_NOT_EXIST",
            "message": "Logged model m-gone not found"
        })))
        .mount(&server)
        .await;

    let registry = Registry::from_settings(settings(&server)).unwrap();
    let prompt = registry
        .load_prompt("prompts:/greeting/1", LoadPromptOptions::new().model_id("m-gone"))
        .await
        .unwrap();
    assert!(prompt.is_some());
}

// ============================================================================
// CLI
// ============================================================================

#[tokio::test]
async fn test_cli_search_versions() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/model-versions/search"))
        .and(query_param("filter", "name = 'forecaster'"))
        .and(query_param("max_results", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model_versions": [
                { "name": "forecaster", "version": "2" },
                { "name": "forecaster", "version": "1" }
            ],
            "next_page_token": "more"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let cli = Cli::parse_from([
        "modelreg",
        "--registry-uri",
        uri.as_str(),
        "search-versions",
        "--filter",
        "name = 'forecaster'",
        "--max-results",
        "2",
    ]);
    let runner = Runner::new(cli);
    let registry = Registry::from_settings(runner.settings().unwrap()).unwrap();

    let output = runner.execute(&registry).await.unwrap();
    assert_eq!(output["type"], "MODEL_VERSIONS");
    assert_eq!(output["model_versions"].as_array().unwrap().len(), 2);
    assert_eq!(output["model_versions"][0]["version"], "2");
}

#[tokio::test]
async fn test_cli_set_alias() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/registered-models/alias"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let cli = Cli::parse_from([
        "modelreg",
        "--registry-uri",
        uri.as_str(),
        "set-alias",
        "greeting",
        "prod",
        "3",
    ]);
    let runner = Runner::new(cli);
    let registry = Registry::from_settings(runner.settings().unwrap()).unwrap();

    let output = runner.execute(&registry).await.unwrap();
    assert_eq!(
        output,
        json!({ "type": "ALIAS_SET", "name": "greeting", "alias": "prod", "version": 3 })
    );
}
