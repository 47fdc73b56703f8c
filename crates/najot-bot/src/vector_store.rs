//! In-memory similarity index over document chunks.
//!
//! The brochure yields a few dozen chunks, so search is an exact linear
//! scan scored by cosine similarity.

use crate::document::Chunk;

#[derive(Debug, Clone, serde::Serialize)]
pub struct VectorStoreStats {
    pub total_chunks: usize,
    pub dimension: usize,
}

/// A chunk returned by [`VectorStore::search`] with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub similarity: f32,
}

#[derive(Debug, Default)]
pub struct VectorStore {
    entries: Vec<(Chunk, Vec<f32>)>,
    dimension: Option<usize>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a chunk and its embedding. All embeddings must share one
    /// dimension; the first insert fixes it.
    pub fn insert(&mut self, chunk: Chunk, embedding: Vec<f32>) -> anyhow::Result<()> {
        if embedding.is_empty() {
            anyhow::bail!("Refusing to index an empty embedding");
        }
        match self.dimension {
            Some(dim) if dim != embedding.len() => {
                anyhow::bail!(
                    "Embedding dimension mismatch: index holds {}, got {}",
                    dim,
                    embedding.len()
                );
            }
            Some(_) => {}
            None => self.dimension = Some(embedding.len()),
        }
        self.entries.push((chunk, embedding));
        Ok(())
    }

    pub fn from_embeddings(
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> anyhow::Result<Self> {
        if chunks.len() != embeddings.len() {
            anyhow::bail!(
                "Got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            );
        }
        let mut store = Self::new();
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            store.insert(chunk, embedding)?;
        }
        Ok(store)
    }

    /// Return at most `k` chunks, most similar first. Equal scores keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, (_, embedding))| (idx, cosine_similarity(query, embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(idx, similarity)| ScoredChunk {
                chunk: self.entries[idx].0.clone(),
                similarity,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> VectorStoreStats {
        VectorStoreStats {
            total_chunks: self.entries.len(),
            dimension: self.dimension.unwrap_or(0),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() { return 0.0; }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let similarity = if norm_a == 0.0 || norm_b == 0.0 { 0.0 } else { dot / (norm_a * norm_b) };
    if similarity.is_nan() { 0.0 } else { similarity }
}
