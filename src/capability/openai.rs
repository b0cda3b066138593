// src/capability/openai.rs
//! OpenAI-compatible HTTP providers (Groq, OpenAI, local gateways).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Embedder, TextGenerator};
use crate::error::ExternalError;

const USER_AGENT: &str = concat!("clause-risk-engine/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(4);

pub const LEGAL_SYSTEM_PROMPT: &str = "You are an expert legal analyst specializing in contract \
review and risk assessment. Provide clear, structured, actionable analysis. When asked for JSON, \
return only valid JSON.";

fn http_client(timeout: Duration) -> Result<reqwest::Client, ExternalError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()?)
}

/// `POST {base_url}/chat/completions`, bearer auth, temperature 0.3.
pub struct ChatCompletionsGenerator {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl ChatCompletionsGenerator {
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, ExternalError> {
        Ok(Self {
            http: http_client(timeout)?,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model,
            api_key,
        })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for ChatCompletionsGenerator {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ExternalError> {
        let req = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: LEGAL_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.3,
            max_tokens,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExternalError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| ExternalError::Malformed(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ExternalError::EmptyResponse);
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "chat-completions"
    }
}

/// `POST {base_url}/embeddings` with a single input string.
pub struct HttpEmbedder {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl HttpEmbedder {
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, ExternalError> {
        Ok(Self {
            http: http_client(timeout)?,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model,
            api_key,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ExternalError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExternalError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        let parsed: EmbeddingResponse =
            serde_json::from_str(&body).map_err(|e| ExternalError::Malformed(e.to_string()))?;

        match parsed.data.into_iter().next() {
            Some(d) if !d.embedding.is_empty() => Ok(d.embedding),
            _ => Err(ExternalError::EmptyResponse),
        }
    }

    fn name(&self) -> &'static str {
        "http-embeddings"
    }
}
