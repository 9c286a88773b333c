//! Ollama completion generator (`POST /api/generate`).

use super::Generator;
use crate::error::{KildeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Generator backed by a local Ollama server.
pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, temperature: f32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.to_string(),
            temperature,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    #[instrument(skip(self, system, user), fields(model = %self.model))]
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest {
                model: &self.model,
                system,
                prompt: user,
                stream: false,
                options: GenerateOptions {
                    temperature: self.temperature,
                },
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KildeError::Generation(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        debug!("Generated {} characters", parsed.response.len());
        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_generate_sends_non_streaming_request() {
        let router = Router::new().route(
            "/api/generate",
            post(|Json(body): Json<serde_json::Value>| async move {
                let reply = format!(
                    "{}|{}|{}|{}",
                    body["model"].as_str().unwrap_or_default(),
                    body["system"].as_str().unwrap_or_default(),
                    body["prompt"].as_str().unwrap_or_default(),
                    body["stream"]
                );
                Json(serde_json::json!({ "response": reply, "done": true }))
            }),
        );
        let base_url = serve(router).await;

        let generator = OllamaGenerator::new(&format!("{}/", base_url), "llama3.1", 0.2).unwrap();
        let answer = generator.generate("be brief", "what is SQL").await.unwrap();
        assert_eq!(answer, "llama3.1|be brief|what is SQL|false");
    }

    #[tokio::test]
    async fn test_error_status_is_generation_error() {
        let router = Router::new().route(
            "/api/generate",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
        );
        let base_url = serve(router).await;

        let generator = OllamaGenerator::new(&base_url, "llama3.1", 0.2).unwrap();
        let err = generator.generate("s", "u").await.unwrap_err();
        assert!(matches!(err, KildeError::Generation(msg) if msg.contains("model crashed")));
    }
}
