use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;

use crate::config::AdvisorConfig;
use crate::error::{AdvisorError, Result, TransportError};
use crate::llm::backend::TextGenerationBackend;
use crate::llm::types::*;

/// Gemini `generateContent` backend.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(config: &AdvisorConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AdvisorError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.request_timeout.as_secs(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    // reqwest errors embed the URL, which carries the API key
    fn transport_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout {
                seconds: self.timeout_secs,
            };
        }
        TransportError::Request(error.without_url().to_string())
    }
}

#[async_trait]
impl TextGenerationBackend for GeminiClient {
    async fn generate(
        &self,
        system_instruction: &str,
        payload: &serde_json::Value,
    ) -> std::result::Result<String, TransportError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = GenerateContentRequest {
            contents: vec![Content::user_text(payload.to_string())],
            system_instruction: Some(Content::user_text(system_instruction)),
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        debug!("Calling Gemini model {}", self.model);

        let res = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = res.status();

        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateContentResponse = res.json().await.map_err(|e| {
            TransportError::EmptyResponse(format!(
                "Unreadable Gemini response: {}",
                e.without_url()
            ))
        })?;

        if let Some(reason) = body.finish_reason().filter(|reason| *reason != "STOP") {
            warn!("Gemini stopped early ({}), response may be incomplete", reason);
        }

        body.first_text().ok_or_else(|| {
            TransportError::EmptyResponse("Gemini returned no text candidates".to_string())
        })
    }
}

