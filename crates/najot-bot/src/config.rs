// najot-bot/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub openai_base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub source_pdf: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embedding_batch_size: usize,
    pub request_timeout_seconds: u64,
    pub session_idle_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: "127.0.0.1".to_string(),
            api_port: 8000,
            openai_base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-4".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: 0.2,
            source_pdf: "najot_talim.pdf".to_string(),
            chunk_size: 1000,
            chunk_overlap: 300,
            top_k: 2,
            embedding_batch_size: 100,
            request_timeout_seconds: 120,
            session_idle_timeout_seconds: 3600,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }

        let defaults = Self::default();

        let cfg = Self {
            api_host: env::var("API_HOST").unwrap_or(defaults.api_host),
            api_port: parse_var("API_PORT", defaults.api_port)?,
            openai_base_url: env::var("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.openai_base_url),
            chat_model: env::var("CHAT_MODEL").unwrap_or(defaults.chat_model),
            embedding_model: env::var("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            temperature: parse_var("TEMPERATURE", defaults.temperature)?,
            source_pdf: env::var("SOURCE_PDF").unwrap_or(defaults.source_pdf),
            chunk_size: parse_var("CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_var("CHUNK_OVERLAP", defaults.chunk_overlap)?,
            top_k: parse_var("TOP_K", defaults.top_k)?,
            embedding_batch_size: parse_var("EMBEDDING_BATCH_SIZE", defaults.embedding_batch_size)?,
            request_timeout_seconds: parse_var(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            )?,
            session_idle_timeout_seconds: parse_var(
                "SESSION_IDLE_TIMEOUT_SECONDS",
                defaults.session_idle_timeout_seconds,
            )?,
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("CHUNK_SIZE must be greater than zero");
        }
        if self.chunk_overlap >= self.chunk_size {
            anyhow::bail!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap,
                self.chunk_size
            );
        }
        if self.top_k == 0 {
            anyhow::bail!("TOP_K must be at least 1");
        }
        if self.embedding_batch_size == 0 {
            anyhow::bail!("EMBEDDING_BATCH_SIZE must be at least 1");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!("TEMPERATURE must be between 0.0 and 2.0, got {}", self.temperature);
        }
        Ok(())
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- API: {}:{}", self.api_host, self.api_port);
        info!("- OpenAI Base URL: {}", self.openai_base_url);
        info!("- Chat Model: {} (temperature {})", self.chat_model, self.temperature);
        info!("- Embedding Model: {}", self.embedding_model);
        info!("- Source PDF: {}", self.source_pdf);
        info!("- Chunking: size {} / overlap {}", self.chunk_size, self.chunk_overlap);
        info!("- Retrieval Depth: {}", self.top_k);
        info!("- Request Timeout: {}s", self.request_timeout_seconds);
        info!("- Session Idle Timeout: {}s", self.session_idle_timeout_seconds);
    }

    pub fn api_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api_host, self.api_port)
            .parse()
            .with_context(|| format!("Invalid API address {}:{}", self.api_host, self.api_port))
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}
