use std::cmp::Ordering;
use anyhow::{ensure, Result};
use log::debug;
use crate::utils::embedding::{cosine_similarity, AsyncEmbed, EmbedVec};
use crate::utils::splitter::Chunk;

pub type Vector = EmbedVec;

/// A chunk returned by a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Brute-force vector index held in memory. It is rebuilt on every run.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVecStore {
    dim: Option<usize>,
    points: Vec<(Vector, Chunk)>,
}

impl InMemoryVecStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed all chunks in one batch and index them.
    pub async fn from_chunks(embedder: &impl AsyncEmbed, chunks: Vec<Chunk>) -> Result<Self> {
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        ensure!(vectors.len() == chunks.len(), "embedded {} of {} chunks", vectors.len(), chunks.len());
        let mut store = Self::new();
        store.add_all(vectors.into_iter().zip(chunks))?;
        debug!("indexed {} chunks", store.len());
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index a chunk. All vectors of a store share one dimension.
    pub fn add(&mut self, vec: Vector, chunk: Chunk) -> Result<()> {
        match self.dim {
            Some(dim) => ensure!(vec.len() == dim, "vector dimension {} does not match store dimension {}", vec.len(), dim),
            None => self.dim = Some(vec.len()),
        }
        self.points.push((vec, chunk));
        Ok(())
    }

    pub fn add_all(&mut self, points: impl IntoIterator<Item = (Vector, Chunk)>) -> Result<()> {
        for (vec, chunk) in points {
            self.add(vec, chunk)?;
        }
        Ok(())
    }

    /// The `top_k` chunks most similar to `query` by cosine similarity. Ties keep insertion order.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        if let Some(dim) = self.dim {
            ensure!(query.len() == dim, "query dimension {} does not match store dimension {}", query.len(), dim);
        }
        let mut scored: Vec<(usize, f32)> = self.points
            .iter()
            .enumerate()
            .map(|(idx, (vec, _))| (idx, cosine_similarity(query, vec)))
            .collect();
        // stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(idx, score)| ScoredChunk {
                chunk: self.points[idx].1.clone(),
                score,
            })
            .collect())
    }
}
