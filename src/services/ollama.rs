use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::services::embedding::{Embedder, EmbeddingError};
use crate::services::reasoning::{BackendKind, ReasoningError, TextGenerator};

/// Client for a self-hosted Ollama server
///
/// Serves two roles:
/// - local text generation for match reasons (`/api/generate`)
/// - optional embedding backend (`/api/embeddings`)
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    generate_model: String,
    embed_model: String,
    client: Client,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(
        base_url: String,
        generate_model: String,
        embed_model: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            generate_model,
            embed_model,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Ollama
    }

    async fn generate(&self, prompt: &str) -> Result<String, ReasoningError> {
        let payload = json!({
            "model": self.generate_model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": 0.3, "num_predict": 60 },
        });

        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ReasoningError::ApiError(format!(
                "Ollama generate returned {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        json.get("response")
            .and_then(|r| r.as_str())
            .map(str::to_string)
            .ok_or_else(|| ReasoningError::Malformed("missing `response` field".into()))
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let payload = json!({
            "model": self.embed_model,
            "prompt": text,
        });

        let response = self
            .client
            .post(self.url("/api/embeddings"))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Unavailable(format!(
                "Ollama embeddings returned {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        let values = json
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| EmbeddingError::InvalidResponse("Missing embedding array".into()))?;

        let vector = values
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| EmbeddingError::InvalidResponse("Non-numeric embedding value".into()))?;

        if vector.is_empty() {
            return Err(EmbeddingError::InvalidResponse("Empty embedding".into()));
        }

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: String) -> OllamaClient {
        OllamaClient::new(
            url,
            "mistral".to_string(),
            "nomic-embed-text".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_reads_response_field() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response":" Leads zero-trust rollouts at scale. ","done":true}"#)
            .create_async()
            .await;

        let text = client(server.url()).generate("prompt").await.unwrap();

        assert_eq!(text, " Leads zero-trust rollouts at scale. ");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_non_success_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/generate")
            .with_status(503)
            .create_async()
            .await;

        let err = client(server.url()).generate("prompt").await.unwrap_err();
        assert!(matches!(err, ReasoningError::ApiError(_)));
    }

    #[tokio::test]
    async fn test_embed_parses_vector() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding":[0.5,-0.25,1.0]}"#)
            .create_async()
            .await;

        let v = client(server.url()).embed("text").await.unwrap();
        assert_eq!(v, vec![0.5, -0.25, 1.0]);
    }

    #[tokio::test]
    async fn test_embed_missing_field_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"model not found"}"#)
            .create_async()
            .await;

        let err = client(server.url()).embed("text").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
    }
}
