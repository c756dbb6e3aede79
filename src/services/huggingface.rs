use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::services::reasoning::{BackendKind, ReasoningError, TextGenerator};

pub const DEFAULT_HF_ENDPOINT: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_HF_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";

/// Hosted inference API client
pub struct HuggingFaceClient {
    endpoint: String,
    model: String,
    api_token: Option<String>,
    client: Client,
}

impl HuggingFaceClient {
    pub fn new(
        endpoint: String,
        model: String,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint,
            model,
            api_token: api_token.filter(|t| !t.trim().is_empty()),
            client,
        })
    }

    pub fn has_token(&self) -> bool {
        self.api_token.is_some()
    }
}

#[async_trait]
impl TextGenerator for HuggingFaceClient {
    fn kind(&self) -> BackendKind {
        BackendKind::HuggingFace
    }

    async fn generate(&self, prompt: &str) -> Result<String, ReasoningError> {
        let token = self
            .api_token
            .as_deref()
            .ok_or_else(|| ReasoningError::NotConfigured("HF API token not set".into()))?;

        let url = format!(
            "{}/models/{}",
            self.endpoint.trim_end_matches('/'),
            self.model
        );
        let payload = json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": 60,
                "temperature": 0.3,
                "return_full_text": false,
            },
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ReasoningError::ApiError(format!(
                "Inference API returned {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        json.as_array()
            .and_then(|items| items.first())
            .and_then(|item| item.get("generated_text"))
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| ReasoningError::Malformed("missing `generated_text`".into()))
    }
}
