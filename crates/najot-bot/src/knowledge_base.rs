//! Retrieval-augmented answering over the course brochure.
//!
//! Build: load PDF -> split pages -> embed chunks -> index.
//! Answer: embed question -> top-k chunks -> fill prompt -> complete.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::Config;
use crate::document::{load_pdf, RecursiveCharacterTextSplitter};
use crate::llm_worker::LLMWorker;
use crate::metrics;
use crate::prompt::PromptTemplate;
use crate::vector_store::{ScoredChunk, VectorStore};

pub struct KnowledgeBase {
    store: VectorStore,
    llm: Arc<LLMWorker>,
    prompt: PromptTemplate,
    top_k: usize,
    temperature: f32,
}

impl KnowledgeBase {
    pub async fn build(config: &Config, llm: Arc<LLMWorker>) -> anyhow::Result<Self> {
        let started = Instant::now();

        let pages = load_pdf(&config.source_pdf).await?;
        let splitter = RecursiveCharacterTextSplitter::new(config.chunk_size, config.chunk_overlap);
        let chunks = splitter.split_pages(&pages);
        if chunks.is_empty() {
            anyhow::bail!("Source document {} produced no chunks", config.source_pdf);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = llm.generate_embeddings(&texts).await?;
        let store = VectorStore::from_embeddings(chunks, embeddings)?;

        let elapsed = started.elapsed().as_secs_f64();
        metrics::observe_index_build(elapsed);
        info!(
            "Knowledge base ready: {} page(s), {} chunk(s), dim {} in {:.2}s",
            pages.len(),
            store.len(),
            store.stats().dimension,
            elapsed
        );

        Ok(Self::from_parts(store, llm, config))
    }

    pub fn from_parts(store: VectorStore, llm: Arc<LLMWorker>, config: &Config) -> Self {
        Self {
            store,
            llm,
            prompt: PromptTemplate::default(),
            top_k: config.top_k,
            temperature: config.temperature,
        }
    }

    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn chunk_count(&self) -> usize {
        self.store.len()
    }

    /// The `top_k` chunks closest to `question`.
    pub async fn retrieve(&self, question: &str) -> anyhow::Result<Vec<ScoredChunk>> {
        let query = self
            .llm
            .generate_embeddings(&[question.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No embedding returned for the question"))?;

        let hits = self.store.search(&query, self.top_k);
        debug!(
            "Retrieved {} chunk(s) from pages {:?}",
            hits.len(),
            hits.iter().map(|h| h.chunk.page).collect::<Vec<_>>()
        );
        Ok(hits)
    }

    pub async fn answer(&self, question: &str) -> anyhow::Result<String> {
        let hits = self.retrieve(question).await?;
        let context = join_context(&hits);
        let prompt = self.prompt.render(&context, question);
        self.llm.complete(&prompt, self.temperature).await
    }
}

/// Retrieved chunk texts joined by single spaces.
pub fn join_context(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|h| h.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
