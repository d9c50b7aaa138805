use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use freeflow_core::config::{LlmConfig, LlmProvider};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm client construction failed: {0}")]
    Construction(String),
    #[error("llm transport failure: {0}")]
    Transport(String),
    #[error("llm provider returned status {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("llm response did not contain a completion")]
    EmptyCompletion,
}

/// Opaque text-completion service. One call in, one free-form text response
/// out; no retries, no streaming.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

const MAX_COMPLETION_TOKENS: u32 = 1000;

/// HTTP-backed client speaking the chat-completion shapes of the three
/// supported providers. The provider and model are fixed at construction
/// from configuration; agents stay stateless.
pub struct HttpLlmClient {
    http: reqwest::Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Construction(error.to_string()))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(config.provider).to_string());

        Ok(Self {
            http,
            provider: config.provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn api_key(&self) -> &str {
        self.api_key.as_ref().map(|key| key.expose_secret()).unwrap_or("")
    }

    async fn complete_openai(&self, system: &str, user: &str) -> Result<String, LlmError> {
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct Message {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Completion {
            choices: Vec<Choice>,
        }

        let body = json!({
            "model": self.model,
            "max_tokens": MAX_COMPLETION_TOKENS,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(self.api_key())
            .json(&body)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;
        let completion: Completion = decode_response(response).await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyCompletion)
    }

    async fn complete_anthropic(&self, system: &str, user: &str) -> Result<String, LlmError> {
        #[derive(Deserialize)]
        struct Block {
            text: Option<String>,
        }
        #[derive(Deserialize)]
        struct Completion {
            content: Vec<Block>,
        }

        let body = json!({
            "model": self.model,
            "max_tokens": MAX_COMPLETION_TOKENS,
            "system": system,
            "messages": [{"role": "user", "content": user}],
        });

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key())
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;
        let completion: Completion = decode_response(response).await?;

        completion
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or(LlmError::EmptyCompletion)
    }

    async fn complete_ollama(&self, system: &str, user: &str) -> Result<String, LlmError> {
        #[derive(Deserialize)]
        struct Message {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Completion {
            message: Message,
        }

        let body = json!({
            "model": self.model,
            "stream": false,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;
        let completion: Completion = decode_response(response).await?;

        completion.message.content.ok_or(LlmError::EmptyCompletion)
    }
}

fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => "https://api.openai.com",
        LlmProvider::Anthropic => "https://api.anthropic.com",
        LlmProvider::Ollama => "http://localhost:11434",
    }
}

async fn decode_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, LlmError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Provider { status: status.as_u16(), body });
    }

    response.json::<T>().await.map_err(|error| LlmError::Transport(error.to_string()))
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        match self.provider {
            LlmProvider::OpenAi => self.complete_openai(system, user).await,
            LlmProvider::Anthropic => self.complete_anthropic(system, user).await,
            LlmProvider::Ollama => self.complete_ollama(system, user).await,
        }
    }
}

/// Test double that returns a fixed completion for every call.
#[derive(Clone, Debug)]
pub struct StaticLlmClient {
    response: String,
}

impl StaticLlmClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self { response: response.into() }
    }
}

#[async_trait]
impl LlmClient for StaticLlmClient {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        Ok(self.response.clone())
    }
}

/// Test double simulating a provider outage; every call fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingLlmClient;

#[async_trait]
impl LlmClient for FailingLlmClient {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        Err(LlmError::Transport("simulated llm outage".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use freeflow_core::config::{LlmConfig, LlmProvider};

    use super::{default_base_url, HttpLlmClient, LlmClient, StaticLlmClient};

    fn config(provider: LlmProvider, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: Some("sk-test".to_string().into()),
            base_url: base_url.map(str::to_string),
            model: "test-model".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn base_url_defaults_per_provider() {
        assert!(default_base_url(LlmProvider::OpenAi).contains("openai"));
        assert!(default_base_url(LlmProvider::Anthropic).contains("anthropic"));
        assert!(default_base_url(LlmProvider::Ollama).contains("11434"));
    }

    #[test]
    fn trailing_slash_is_trimmed_from_configured_base_url() {
        let client = HttpLlmClient::from_config(&config(
            LlmProvider::Anthropic,
            Some("https://llm.internal/"),
        ))
        .expect("client should build");
        assert_eq!(client.base_url, "https://llm.internal");
    }

    #[tokio::test]
    async fn static_client_echoes_its_canned_response() {
        let client = StaticLlmClient::new("{\"ok\": true}");
        let completion = client.complete("system", "user").await.expect("static completion");
        assert_eq!(completion, "{\"ok\": true}");
    }
}
