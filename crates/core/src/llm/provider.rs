use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::config::ProviderSettings;

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone)]
pub struct LLMRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub dump_prompt: bool,
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse, LLMError>;

    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat completion endpoint. One request per call, no retries.
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key.into());
        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }

    pub fn from_settings(settings: &ProviderSettings, api_key: &str) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = &settings.base_url {
            config = config.with_api_base(base_url);
        }

        Self {
            client: Client::with_config(config),
            model: settings.model.clone(),
        }
    }

    fn is_reasoning_model(&self) -> bool {
        self.model.starts_with("o1") || self.model.starts_with("o3")
    }

    fn build_messages(
        &self,
        request: &LLMRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, LLMError> {
        if self.is_reasoning_model() {
            let combined_prompt = format!(
                "Instructions:\n{}\n\nTask:\n{}",
                request.system_prompt, request.user_prompt
            );
            let user = ChatCompletionRequestUserMessageArgs::default()
                .content(combined_prompt)
                .build()
                .map_err(|e| LLMError::ApiError(e.to_string()))?;
            return Ok(vec![user.into()]);
        }

        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(request.system_prompt.clone())
            .build()
            .map_err(|e| LLMError::ApiError(e.to_string()))?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(request.user_prompt.clone())
            .build()
            .map_err(|e| LLMError::ApiError(e.to_string()))?;

        Ok(vec![system.into(), user.into()])
    }
}

pub fn dump_prompt(model: &str, request: &LLMRequest) {
    eprintln!("\n{} PROMPT DUMP {}", "=".repeat(25), "=".repeat(25));
    eprintln!("Model: {}", model);
    eprintln!("Temperature: {}", request.temperature);
    eprintln!("\n{} SYSTEM PROMPT {}", "=".repeat(20), "=".repeat(20));
    eprintln!("{}", request.system_prompt);
    eprintln!("\n{} USER PROMPT {}", "=".repeat(21), "=".repeat(21));
    eprintln!("{}", request.user_prompt);
    eprintln!("{}\n", "=".repeat(63));
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse, LLMError> {
        let is_reasoning_model = self.is_reasoning_model();

        debug!("Sending request to model: {}", self.model);
        debug!(
            "Temperature: {}, reasoning model: {}",
            request.temperature, is_reasoning_model
        );

        if request.dump_prompt {
            dump_prompt(&self.model, &request);
        }

        let messages = self.build_messages(&request)?;

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder.model(&self.model).messages(messages);
        if !is_reasoning_model {
            request_builder.temperature(request.temperature);
        }

        let api_request = request_builder
            .build()
            .map_err(|e| LLMError::ApiError(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(api_request)
            .await
            .map_err(|e| LLMError::ApiError(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .ok_or_else(|| LLMError::InvalidResponse("No content in response".to_string()))?;

        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        debug!("Received response with {} tokens", usage.total_tokens);

        Ok(LLMResponse {
            content,
            model: response.model,
            usage,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> LLMRequest {
        LLMRequest {
            system_prompt: "You are a senior Solidity auditor.".to_string(),
            user_prompt: "Summarize this.".to_string(),
            temperature: 0.0,
            dump_prompt: false,
        }
    }

    #[test]
    fn test_chat_models_get_system_and_user_messages() {
        let provider = OpenAIProvider::new("test_key", "gpt-4");
        let messages = provider.build_messages(&request()).unwrap();

        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_reasoning_models_fold_system_prompt() {
        let provider = OpenAIProvider::new("test_key", "o1-mini");
        let messages = provider.build_messages(&request()).unwrap();

        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_settings_model_is_used() {
        let settings = ProviderSettings {
            model: "gpt-4o".to_string(),
            api_key: None,
            base_url: Some("http://localhost:8080/v1".to_string()),
        };
        let provider = OpenAIProvider::from_settings(&settings, "test_key");
        assert_eq!(provider.model_name(), "gpt-4o");
    }
}
