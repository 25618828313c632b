//! Ollama storyteller client (OpenAI-compatible API)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::infrastructure::ports::{
    FinishReason, MessageRole, StoryPrompt, StoryResponse, StorytellerError, StorytellerPort,
    TokenUsage,
};

/// Default Ollama base URL.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Default model for Ollama.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Default request timeout. Story generation can be slow on local models.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Client for Ollama's OpenAI-compatible API
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self::with_timeout(base_url, model, DEFAULT_TIMEOUT_SECS)
    }

    /// Create client with custom timeout (for testing).
    pub fn with_timeout(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout_secs,
        }
    }

    /// Create client from environment variables.
    ///
    /// Uses `OLLAMA_BASE_URL` and `OLLAMA_MODEL` environment variables,
    /// falling back to defaults if not set.
    pub fn from_env() -> Self {
        let base_url = std::env::var("OLLAMA_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OLLAMA_BASE_URL.to_string());
        let model =
            std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_OLLAMA_MODEL.to_string());
        Self::new(&base_url, &model)
    }

    fn map_send_error(&self, e: reqwest::Error) -> StorytellerError {
        if e.is_timeout() {
            StorytellerError::Timeout(self.timeout_secs)
        } else {
            StorytellerError::RequestFailed(e.to_string())
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL)
    }
}

#[async_trait]
impl StorytellerPort for OllamaClient {
    async fn generate(&self, prompt: StoryPrompt) -> Result<StoryResponse, StorytellerError> {
        let api_request = OpenAIChatRequest {
            model: self.model.clone(),
            messages: build_messages(&prompt),
            temperature: prompt.temperature,
            max_tokens: prompt.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&api_request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .map_err(|e| StorytellerError::RequestFailed(e.to_string()))?;
            return Err(StorytellerError::RequestFailed(error_text));
        }

        let api_response: OpenAIChatResponse = response
            .json()
            .await
            .map_err(|e| StorytellerError::InvalidResponse(e.to_string()))?;

        convert_response(api_response)
    }
}

fn build_messages(prompt: &StoryPrompt) -> Vec<OpenAIMessage> {
    let mut messages = Vec::new();

    if let Some(system) = &prompt.system_prompt {
        messages.push(OpenAIMessage {
            role: "system".to_string(),
            content: Some(system.clone()),
        });
    }

    for msg in &prompt.messages {
        messages.push(OpenAIMessage {
            role: match msg.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
                MessageRole::System => "system",
            }
            .to_string(),
            content: Some(msg.content.clone()),
        });
    }

    messages
}

fn convert_response(response: OpenAIChatResponse) -> Result<StoryResponse, StorytellerError> {
    let choice = response.choices.into_iter().next().ok_or_else(|| {
        StorytellerError::InvalidResponse("No choices in storyteller response".to_string())
    })?;

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Unknown,
        None => FinishReason::Stop,
    };

    Ok(StoryResponse {
        content: choice.message.content.unwrap_or_default(),
        finish_reason,
        usage: response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
    })
}

// =============================================================================
// OpenAI API types
// =============================================================================

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize, Default)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::ChatMessage;

    #[test]
    fn test_system_prompt_is_first_message() {
        let prompt = StoryPrompt::new(vec![ChatMessage::user("hello")])
            .with_system_prompt("you are a storyteller");
        let messages = build_messages(&prompt);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
    }

    #[test]
    fn test_convert_response_takes_first_choice() {
        let response = OpenAIChatResponse {
            choices: vec![OpenAIChoice {
                message: OpenAIMessage {
                    role: "assistant".to_string(),
                    content: Some("{\"title\":\"x\"}".to_string()),
                },
                finish_reason: Some("stop".to_string()),
            }],
            usage: None,
        };

        let converted = convert_response(response).unwrap();
        assert_eq!(converted.content, "{\"title\":\"x\"}");
        assert_eq!(converted.finish_reason, FinishReason::Stop);
    }

    #[test]
    fn test_convert_response_without_choices_is_invalid() {
        let response = OpenAIChatResponse {
            choices: vec![],
            usage: None,
        };
        let err = convert_response(response).unwrap_err();
        assert!(matches!(err, StorytellerError::InvalidResponse(_)));
    }

    /// Requires a running Ollama instance with the default model pulled.
    #[tokio::test]
    #[ignore = "requires ollama"]
    async fn test_generate_against_live_ollama() {
        let client = OllamaClient::from_env();
        let prompt = StoryPrompt::new(vec![ChatMessage::user("Say hi in one word.")])
            .with_temperature(0.0);

        let response = client.generate(prompt).await.unwrap();
        assert!(!response.content.is_empty());
    }
}
