// src/services/generator.rs

use std::fmt;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::GeneratorConfig;

/// Why a text-generation call produced nothing usable.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// The request never got a response (DNS, TLS, connection reset, timeout).
    Transport(String),
    /// The endpoint answered with a non-success status.
    Status(u16),
    /// The body could not be decoded as JSON.
    Decode(String),
    /// The response carried no generated text.
    EmptyPayload,
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Transport(msg) => write!(f, "transport failure: {}", msg),
            GenerationError::Status(code) => write!(f, "generator returned status {}", code),
            GenerationError::Decode(msg) => write!(f, "undecodable response: {}", msg),
            GenerationError::EmptyPayload => write!(f, "response contained no generated text"),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Remote text model that turns a prompt into a raw text blob.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Client for the Hugging Face inference API.
pub struct HuggingFaceGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
}

impl HuggingFaceGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl TextGenerator for HuggingFaceGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let payload = json!({
            "inputs": prompt,
            "parameters": {
                "max_length": 1000,
                "temperature": 0.7,
                "do_sample": true,
                "num_return_sequences": 1
            }
        });

        let mut request = self.client.post(self.endpoint()).json(&payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        extract_generated_text(&body).ok_or(GenerationError::EmptyPayload)
    }
}

/// Pulls `generated_text` out of either `[{"generated_text": ..}]` or `{"generated_text": ..}`.
fn extract_generated_text(body: &Value) -> Option<String> {
    let entry = match body {
        Value::Array(items) => items.first()?,
        other => other,
    };

    entry
        .get("generated_text")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_owned)
}
