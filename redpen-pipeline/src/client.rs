//! Chat transport boundary.
//!
//! The reliability core never talks to the network itself; consumers hand
//! it a callback built from a [`ChatClient`]. The trait is the seam for
//! tests (a scripted mock) and for alternative backends; [`OpenAiClient`]
//! is the production implementation of the chat-completions REST
//! endpoint. Retry-with-backoff around transport failures belongs to the
//! caller, not here.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use redpen_core::{SamplingConfig, UsageLedger, UsageRecord};

use crate::errors::ClientError;

/// Who said a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The system preamble.
    System,
    /// The user (including few-shot example turns).
    User,
    /// The model (few-shot example answers).
    Assistant,
}

/// One turn of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker of this turn.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// What one chat call produced: the trimmed text and, when the server
/// reported it, the token usage for the ledger.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// Trimmed response text.
    pub text: String,
    /// Server-reported usage, if any.
    pub usage: Option<UsageRecord>,
}

/// A blocking-free chat completion backend.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends one conversation and returns the model's reply.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        config: &SamplingConfig,
    ) -> Result<ChatOutcome, ClientError>;
}

/// Configuration for [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key (`None` = read `OPENAI_API_KEY` from the environment).
    pub api_key: Option<String>,
    /// Base URL of the API.
    ///
    /// Default: `https://api.openai.com/v1`
    pub base_url: String,
    /// Per-request timeout.
    ///
    /// Default: 120 seconds.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// reqwest-based client for the OpenAI chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// Client with default configuration and the key from the
    /// environment.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::with_config(ClientConfig::default())
    }

    /// Client with explicit configuration.
    pub fn with_config(config: ClientConfig) -> Result<Self, ClientError> {
        let api_key = match config.api_key {
            Some(key) => key,
            None => env::var("OPENAI_API_KEY").map_err(|_| ClientError::MissingApiKey)?,
        };
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            api_key,
            base_url: config.base_url,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    presence_penalty: f32,
    frequency_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        config: &SamplingConfig,
    ) -> Result<ChatOutcome, ClientError> {
        let request = ChatCompletionRequest {
            model: config.model.as_str(),
            messages,
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
            top_p: config.top_p,
            presence_penalty: config.presence_penalty,
            frequency_penalty: config.frequency_penalty,
        };

        tracing::debug!(model = %config.model, temperature = config.temperature, "chat request");

        let response: ChatCompletionResponse = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(str::trim)
            .ok_or(ClientError::EmptyResponse)?
            .to_string();

        let usage = response.usage.map(|usage| UsageRecord {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            model: config.model,
        });

        Ok(ChatOutcome { text, usage })
    }
}

/// Runs one chat call and reports its usage into the run's ledger.
///
/// This is the generation-callback body every consumer shares: usage is
/// appended for every call that reached the model, independent of
/// whether extraction later succeeds. The error is stringly typed at
/// this seam because the controller treats transport failures as opaque.
pub(crate) async fn chat_logging_usage(
    client: &dyn ChatClient,
    messages: &[ChatMessage],
    ledger: &UsageLedger,
    config: SamplingConfig,
) -> Result<String, String> {
    let outcome = client
        .chat(messages, &config)
        .await
        .map_err(|error| error.to_string())?;
    if let Some(usage) = outcome.usage {
        ledger.append(usage);
    }
    Ok(outcome.text)
}
