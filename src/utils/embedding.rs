use anyhow::{ensure, Result};
use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::CreateEmbeddingRequestArgs;
use async_trait::async_trait;
use log::debug;

use crate::config::Settings;

/// Vector of floats representing an embedding.
pub type EmbedVec = Vec<f32>;

//TODO: when async fn in trait supports dyn dispatch, remove async_trait macro

/// Trait for getting the embedding dimension.
pub trait GetEmbedDim {
    fn embedding_dim(&self) -> Option<usize>;
}

/// Trait for embedding a string locally.
pub trait Embed: GetEmbedDim {
    fn embed(&self, string: &str) -> Result<EmbedVec>;
}

/// Async version of Embed trait, for remote embedding models.
#[async_trait]
pub trait AsyncEmbed: GetEmbedDim + Send + Sync {
    async fn embed(&self, string: &str) -> Result<EmbedVec>;

    /// Embed many strings, keeping their order.
    async fn embed_batch(&self, strings: &[String]) -> Result<Vec<EmbedVec>> {
        let mut embeddings = Vec::with_capacity(strings.len());
        for string in strings {
            embeddings.push(AsyncEmbed::embed(self, string).await?);
        }
        Ok(embeddings)
    }
}

/// Blanket impl of AsyncEmbed for Embed trait.
#[async_trait]
impl<T: Embed + Send + Sync> AsyncEmbed for T {
    async fn embed(&self, string: &str) -> Result<EmbedVec> {
        Embed::embed(self, string)
    }
}

/// Dot product of two embeddings. OpenAI embeddings are unit length, so this equals their cosine similarity.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity of two embeddings, `0.0` when either is a zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}


/// Embedding model from OpenAI API.
#[derive(Clone, Debug)]
pub struct OpenAIEmbedding {
    pub client: Client<OpenAIConfig>,
    pub embedding_model: String,
}

impl GetEmbedDim for OpenAIEmbedding {
    fn embedding_dim(&self) -> Option<usize> {
        match self.embedding_model.as_str() {
            "text-embedding-ada-002" | "text-embedding-3-small" => Some(1536),
            "text-embedding-3-large" => Some(3072),
            _ => None,
        }
    }
}

impl OpenAIEmbedding {
    pub fn new(api_key: impl Into<String>, embedding_model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(OpenAIConfig::new().with_api_key(api_key)),
            embedding_model: embedding_model.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut config = OpenAIConfig::new().with_api_key(settings.openai_api_key()?);
        if let Some(base_url) = &settings.openai_base_url {
            config = config.with_api_base(base_url.as_str());
        }
        Ok(Self {
            client: Client::with_config(config),
            embedding_model: settings.embedding_model.clone(),
        })
    }

    /// send a request to the OpenAI API to embed strings. Returns the embedding vectors in input order, or an error.
    async fn request_embed(&self, strings: Vec<String>) -> Result<Vec<EmbedVec>> {
        let expected = strings.len();
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.embedding_model.as_str())
            .input(strings)
            .build()?;
        let response = self.client.embeddings().create(request).await?;
        debug!("embedded {} inputs with {}, {} prompt tokens", expected, self.embedding_model, response.usage.prompt_tokens);
        let mut data = response.data;
        ensure!(data.len() == expected, "requested {} embeddings but got {}", expected, data.len());
        data.sort_by_key(|embedding| embedding.index);
        Ok(data.into_iter().map(|embedding| embedding.embedding).collect())
    }
}

#[async_trait]
impl AsyncEmbed for OpenAIEmbedding {
    async fn embed(&self, string: &str) -> Result<EmbedVec> {
        let mut embeddings = self.request_embed(vec![string.to_string()]).await?;
        embeddings.pop().ok_or_else(|| anyhow::anyhow!("empty embedding response"))
    }

    async fn embed_batch(&self, strings: &[String]) -> Result<Vec<EmbedVec>> {
        if strings.is_empty() {
            return Ok(Vec::new());
        }
        self.request_embed(strings.to_vec()).await
    }
}

#[cfg(test)]
pub(crate) mod test_embedding {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use anyhow::Result;
    use super::{cosine_similarity, dot, AsyncEmbed, Embed, EmbedVec, GetEmbedDim};

    /// Deterministic bag-of-words embedding for tests.
    pub(crate) struct BagOfWords {
        pub dim: usize,
    }

    impl GetEmbedDim for BagOfWords {
        fn embedding_dim(&self) -> Option<usize> {
            Some(self.dim)
        }
    }

    impl Embed for BagOfWords {
        fn embed(&self, string: &str) -> Result<EmbedVec> {
            let mut vec = vec![0.0; self.dim];
            for word in string.split_whitespace() {
                let word = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
                if word.is_empty() {
                    continue;
                }
                let mut hasher = DefaultHasher::new();
                word.hash(&mut hasher);
                vec[(hasher.finish() as usize) % self.dim] += 1.0;
            }
            Ok(vec)
        }
    }

    #[test]
    fn test_similarity() {
        assert_eq!(11.0, dot(&[1.0, 2.0], &[3.0, 4.0]));
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(0.0, cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]));
    }

    #[tokio::test]
    async fn test_blanket_async_embed_keeps_order() {
        let embedder = BagOfWords { dim: 64 };
        let inputs = vec!["I love coding".to_string(), "Hello World!".to_string()];
        let embeddings = embedder.embed_batch(&inputs).await.unwrap();
        assert_eq!(2, embeddings.len());
        assert_eq!(Embed::embed(&embedder, "hello world").unwrap(), embeddings[1]);
    }
}
