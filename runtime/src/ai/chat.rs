use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{config::LlmConfig, pipeline::utils::truncate_chars};

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(model: &str, llm: &LlmConfig, system: String, user: String) -> Self {
        Self {
            model: model.to_string(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        }
    }
}

/// A chat-completion style model endpoint returning the first choice's text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

pub struct ChatCompletionsClient {
    http: Client,
    base: String,
    models_timeout: Duration,
}

impl ChatCompletionsClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.timeout())
            .build()
            .context("failed to build model http client")?;
        Ok(Self {
            http,
            base: config.base_url.trim_end_matches('/').to_string(),
            models_timeout: Duration::from_secs(config.models_timeout_secs),
        })
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base)
    }

    /// Model ids served by the endpoint; empty when the endpoint is unreachable.
    pub async fn list_models(&self) -> Vec<String> {
        match self.fetch_models().await {
            Ok(models) => models,
            Err(err) => {
                warn!(error = %err, "Local LLM: models request failed");
                Vec::new()
            }
        }
    }

    async fn fetch_models(&self) -> Result<Vec<String>> {
        let resp = self
            .http
            .get(format!("{}/v1/models", self.base))
            .timeout(self.models_timeout)
            .send()
            .await
            .context("models request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let err_txt = resp.text().await.unwrap_or_default();
            bail!("models request failed ({status} {err_txt})");
        }
        let payload: Value = resp.json().await.context("models response not JSON")?;
        Ok(parse_model_ids(&payload))
    }
}

#[async_trait]
impl ChatModel for ChatCompletionsClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let resp = self
            .http
            .post(self.chat_completions_url())
            .json(request)
            .send()
            .await
            .context("request to model endpoint failed")?;

        let status = resp.status();
        if !status.is_success() {
            let err_txt = resp.text().await.unwrap_or_default();
            bail!("model endpoint returned {status}: {}", truncate_chars(&err_txt, 500));
        }

        let body: Value = resp
            .json()
            .await
            .context("model endpoint returned a non-JSON body")?;
        let content = body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .context("model response has no choices[0].message.content")?;
        debug!(model = %request.model, chars = content.len(), "model response received");
        Ok(content.to_string())
    }
}

fn parse_model_ids(payload: &Value) -> Vec<String> {
    let Some(entries) = payload.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut models: Vec<String> = Vec::new();
    for entry in entries {
        let id = match entry {
            Value::Object(obj) => obj.get("id").and_then(Value::as_str),
            Value::String(s) => Some(s.as_str()),
            _ => None,
        };
        let Some(id) = id.map(str::trim).filter(|id| !id.is_empty()) else {
            continue;
        };
        if !models.iter().any(|existing| existing == id) {
            models.push(id.to_string());
        }
    }
    models
}
