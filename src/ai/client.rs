use crate::ai::types::{
    ApiErrorBody, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
};
use crate::ai::{AiError, TextCompletion};
use async_trait::async_trait;
use std::time::Duration;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TOKENS: u32 = 300;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Chat-completions client behind the `TextCompletion` boundary. The key is
/// sourced from the environment at startup; nothing here retries — a failure
/// surfaces once, as an inline message.
pub struct OpenAiGateway {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    api_url: String,
}

impl OpenAiGateway {
    pub fn new(api_key: String) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AiError::Network(err.to_string()))?;

        Ok(Self {
            http,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            api_url: OPENAI_API_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Overrides the endpoint; used by tests against a local mock server.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    async fn call_api(&self, prompt: &str, role: &str) -> Result<String, AiError> {
        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: format!(
                        "Você faz parte do time da agência como {role}. Responda em PT-BR."
                    ),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: DEFAULT_TEMPERATURE,
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|err| AiError::Network(err.to_string()))?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "completion response received");

        if !status.is_success() {
            return Err(Self::error_from_status(status.as_u16(), response).await);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| AiError::InvalidResponse(err.to_string()))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::InvalidResponse("response contained no choices".to_string()))?;

        Ok(choice.message.content)
    }

    async fn error_from_status(status: u16, response: reqwest::Response) -> AiError {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());

        match status {
            401 | 403 => AiError::Authentication(format!("invalid API key ({status})")),
            429 => AiError::RateLimit(60),
            _ => {
                // Prefer the API's human-readable message when the envelope parses.
                let message = serde_json::from_str::<ApiErrorBody>(&body)
                    .map(|parsed| parsed.error.message)
                    .unwrap_or(body);
                AiError::Api { status, message }
            }
        }
    }
}

#[async_trait]
impl TextCompletion for OpenAiGateway {
    async fn complete(&self, prompt: &str, role: &str) -> Result<String, AiError> {
        tracing::info!(role, prompt_chars = prompt.len(), "requesting completion");
        self.call_api(prompt, role).await
    }
}
