//! Blocking client for the Ollama REST API.
//!
//! Only liveness matters here: which models are pulled, whether the LLM
//! answers a prompt, and whether the embedder returns a vector.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::{blocking::Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_LLM_MODEL: &str = "deepseek-r1:latest";
pub const DEFAULT_EMBEDDER_MODEL: &str = "mxbai-embed-large:latest";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OllamaModel {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url).with_context(|| format!("invalid ollama url '{base_url}'"))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build ollama http client")?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.endpoint(path);
        tracing::debug!(url = %url, "ollama request");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .with_context(|| format!("ollama request to {url} failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<unreadable response body>".to_string());
            bail!("ollama {path} returned status {status} body {body}");
        }
        response
            .json::<Value>()
            .with_context(|| format!("failed to decode ollama {path} response"))
    }

    /// Models pulled on the server (`GET /api/tags`).
    pub fn list_models(&self) -> Result<Vec<OllamaModel>> {
        let url = self.endpoint("/api/tags");
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("ollama request to {url} failed"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("ollama /api/tags returned status {status}");
        }
        let tags = response
            .json::<TagsResponse>()
            .context("failed to decode ollama /api/tags response")?;
        Ok(tags.models)
    }

    pub fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let payload = self.post_json(
            "/api/generate",
            &json!({ "model": model, "prompt": prompt, "stream": false }),
        )?;
        payload
            .get("response")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| anyhow!("ollama /api/generate response missing 'response' field"))
    }

    pub fn embed(&self, model: &str, prompt: &str) -> Result<Vec<f32>> {
        let payload = self.post_json(
            "/api/embeddings",
            &json!({ "model": model, "prompt": prompt }),
        )?;
        let values = payload
            .get("embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("ollama /api/embeddings response missing 'embedding' field"))?;
        if values.is_empty() {
            bail!("ollama /api/embeddings returned an empty embedding");
        }
        values
            .iter()
            .map(|value| {
                value
                    .as_f64()
                    .map(|number| number as f32)
                    .ok_or_else(|| anyhow!("embedding contains a non-numeric value"))
            })
            .collect()
    }
}

/// Exact tag match; a tag-less name also matches its `:latest` tag.
pub fn model_available(models: &[OllamaModel], name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() {
        return false;
    }
    models.iter().any(|model| {
        model.name == name || (!name.contains(':') && model.name == format!("{name}:latest"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };

    fn client_for(server: &MockServer) -> OllamaClient {
        OllamaClient::new(&server.base_url(), Duration::from_secs(5)).expect("client")
    }

    fn model(name: &str) -> OllamaModel {
        OllamaModel {
            name: name.to_string(),
            size: 1,
        }
    }

    #[test]
    fn unit_model_available_applies_latest_rule() {
        let models = vec![model("deepseek-r1:latest"), model("mxbai-embed-large:v1")];
        assert!(model_available(&models, "deepseek-r1:latest"));
        assert!(model_available(&models, "deepseek-r1"));
        assert!(!model_available(&models, "mxbai-embed-large"));
        assert!(model_available(&models, "mxbai-embed-large:v1"));
        assert!(!model_available(&models, "deepseek-r1:7b"));
        assert!(!model_available(&models, " "));
    }

    #[test]
    fn functional_list_models_decodes_tags() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/tags");
            then.status(200).json_body(json!({
                "models": [
                    {"name": "deepseek-r1:latest", "size": 4_700_000_000_u64},
                    {"name": "mxbai-embed-large:latest", "size": 669_000_000_u64}
                ]
            }));
        });
        let models = client_for(&server).list_models().expect("models");
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "deepseek-r1:latest");
        assert_eq!(models[1].size, 669_000_000);
    }

    #[test]
    fn functional_generate_sends_non_streaming_request() {
        let server = MockServer::start();
        let generate = server.mock(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .body_includes("\"stream\":false")
                .body_includes("\"model\":\"deepseek-r1:latest\"");
            then.status(200)
                .json_body(json!({"response": "OK", "done": true}));
        });
        let text = client_for(&server)
            .generate("deepseek-r1:latest", "Reply with OK")
            .expect("generate");
        generate.assert();
        assert_eq!(text, "OK");
    }

    #[test]
    fn regression_generate_requires_response_field() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).json_body(json!({"done": true}));
        });
        let error = client_for(&server)
            .generate("deepseek-r1:latest", "hi")
            .expect_err("missing response");
        assert!(error.to_string().contains("missing 'response'"));
    }

    #[test]
    fn functional_embed_returns_vector() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/embeddings");
            then.status(200)
                .json_body(json!({"embedding": [0.25, -0.5, 1.0]}));
        });
        let vector = client_for(&server)
            .embed("mxbai-embed-large:latest", "test")
            .expect("embed");
        assert_eq!(vector, vec![0.25, -0.5, 1.0]);
    }

    #[test]
    fn regression_embed_rejects_empty_vector_and_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/embeddings")
                .body_includes("empty-model");
            then.status(200).json_body(json!({"embedding": []}));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/embeddings")
                .body_includes("missing-model");
            then.status(404).body("model not found");
        });
        let client = client_for(&server);
        assert!(client
            .embed("empty-model", "x")
            .expect_err("empty")
            .to_string()
            .contains("empty embedding"));
        assert!(client
            .embed("missing-model", "x")
            .expect_err("404")
            .to_string()
            .contains("404"));
    }
}
