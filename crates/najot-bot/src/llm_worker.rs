//! Client for the hosted embedding and chat-completion endpoints.
//!
//! One worker is created per user credential. Both endpoints speak the
//! OpenAI wire format, so any compatible base URL works.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::memory::Message;
use crate::metrics;

/// A user-supplied API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct LLMWorker {
    base_url: String,
    api_key: ApiKey,
    chat_model: String,
    embedding_model: String,
    embedding_batch_size: usize,
    http_client: reqwest::Client,
}

impl LLMWorker {
    pub fn new(config: &Config, api_key: ApiKey) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        debug!("LLM worker initialized with backend: {}", config.openai_base_url);
        Ok(Self {
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_batch_size: config.embedding_batch_size.max(1),
            http_client,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    /// Embed `texts`, returning one vector per input in input order.
    pub async fn generate_embeddings(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.embedding_batch_size) {
            embeddings.extend(self.embed_batch(batch).await?);
        }

        debug!(
            "Generated {} embeddings (dim={})",
            embeddings.len(),
            embeddings.first().map(|e| e.len()).unwrap_or(0)
        );
        Ok(embeddings)
    }

    async fn embed_batch(&self, batch: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        debug!("Embedding batch of {} text(s)", batch.len());
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: batch,
        };

        let response = self.http_client
            .post(self.embeddings_url())
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                metrics::inc_remote_call("embeddings", "transport_error");
                anyhow::anyhow!("Embedding request failed: {}", e)
            })?;

        if !response.status().is_success() {
            metrics::inc_remote_call("embeddings", "http_error");
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Embedding endpoint returned {}: {}", status, body));
        }

        let mut parsed: EmbeddingResponse = response.json().await
            .map_err(|e| anyhow::anyhow!("Failed to parse embedding response: {}", e))?;
        metrics::inc_remote_call("embeddings", "ok");

        if parsed.data.len() != batch.len() {
            return Err(anyhow::anyhow!(
                "Embedding endpoint returned {} vectors for {} inputs",
                parsed.data.len(),
                batch.len()
            ));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    /// Send `prompt` as a single user turn and return the reply text as-is.
    pub async fn complete(&self, prompt: &str, temperature: f32) -> anyhow::Result<String> {
        debug!("Requesting completion for prompt ({} chars)", prompt.chars().count());
        let messages = [Message::user(prompt)];
        let request = ChatCompletionRequest {
            model: &self.chat_model,
            messages: &messages,
            temperature,
        };

        let response = self.http_client
            .post(self.completions_url())
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                metrics::inc_remote_call("chat_completions", "transport_error");
                anyhow::anyhow!("Completion request failed: {}", e)
            })?;

        if !response.status().is_success() {
            metrics::inc_remote_call("chat_completions", "http_error");
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Completion endpoint returned {}: {}", status, body));
        }

        let completion: ChatCompletionResponse = response.json().await
            .map_err(|e| anyhow::anyhow!("Failed to parse completion response: {}", e))?;
        metrics::inc_remote_call("chat_completions", "ok");

        let content = completion.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| anyhow::anyhow!("Completion response contained no message"))?;

        info!("Completion received ({} chars)", content.chars().count());
        Ok(content)
    }
}
