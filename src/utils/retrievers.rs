use anyhow::Result;
use log::debug;

use crate::filler::{FillPlaceholders, FillWith};
use crate::prompt::PartialPrompt;
use crate::utils::embedding::AsyncEmbed;
use crate::utils::history::ChatHistory;
use crate::utils::llm::{ChatMessage, ChatModel};
use crate::utils::vec_stores::{InMemoryVecStore, ScoredChunk};

pub const DEFAULT_TOP_K: usize = 4;

pub const CONTEXTUALIZE_QUESTION_PROMPT: &str = "Given a chat history and the latest user question \
which might reference context in the chat history, formulate a standalone question \
which can be understood without the chat history. Do NOT answer the question, \
just reformulate it if needed and otherwise return it as is.";

/// Embeds a query and looks up the most similar chunks.
pub struct Retriever<E: AsyncEmbed> {
    pub store: InMemoryVecStore,
    pub embedder: E,
    pub top_k: usize,
}

impl<E: AsyncEmbed> Retriever<E> {
    pub fn new(store: InMemoryVecStore, embedder: E) -> Self {
        Self {
            store,
            embedder,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let query_vec = self.embedder.embed(query).await?;
        self.store.search(&query_vec, self.top_k)
    }
}

/// Rewrites a follow-up question into a standalone one before retrieving.
pub struct HistoryAwareRetriever<'a, M: ChatModel, E: AsyncEmbed> {
    pub model: &'a M,
    pub retriever: &'a Retriever<E>,
}

impl<'a, M: ChatModel, E: AsyncEmbed> HistoryAwareRetriever<'a, M, E> {
    pub fn new(model: &'a M, retriever: &'a Retriever<E>) -> Self {
        Self { model, retriever }
    }

    /// The question to search with. Without history the question is used as-is.
    pub async fn standalone_question(&self, question: &str, history: &ChatHistory) -> Result<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(CONTEXTUALIZE_QUESTION_PROMPT));
        messages.extend(history.to_messages());
        messages.push(ChatMessage::user(question));
        let rewritten = self.model.chat(&messages).await?;
        let rewritten = rewritten.trim();
        debug!("rewrote question {:?} as {:?}", question, rewritten);
        Ok(if rewritten.is_empty() { question.to_string() } else { rewritten.to_string() })
    }

    pub async fn retrieve(&self, question: &str, history: &ChatHistory) -> Result<Vec<ScoredChunk>> {
        let query = self.standalone_question(question, history).await?;
        self.retriever.retrieve(&query).await
    }
}

/// Join retrieved chunks into one context block.
pub fn stuff_documents(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|scored| scored.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fills the `context` placeholder with retrieved chunks.
pub struct ContextFiller {
    placeholders_to_fill: Vec<String>,
}

impl ContextFiller {
    pub const CONTEXT_PLACEHOLDER: &'static str = "context";

    pub fn new() -> Self {
        Self {
            placeholders_to_fill: vec![Self::CONTEXT_PLACEHOLDER.to_string()],
        }
    }
}

impl Default for ContextFiller {
    fn default() -> Self {
        Self::new()
    }
}

impl FillPlaceholders for ContextFiller {
    fn placeholders_to_fill(&self) -> &Vec<String> {
        &self.placeholders_to_fill
    }
}

impl<'c> FillWith<&'c [ScoredChunk]> for ContextFiller {
    fn fill_with(&self, partial_prompt: &mut PartialPrompt, context: &'c [ScoredChunk]) -> Result<&'c [ScoredChunk]> {
        partial_prompt.try_fill(Self::CONTEXT_PLACEHOLDER, stuff_documents(context))?;
        Ok(context)
    }
}

#[cfg(test)]
mod test_retrievers {
    use std::sync::Mutex;
    use anyhow::Result;
    use async_trait::async_trait;
    use super::{stuff_documents, ContextFiller, HistoryAwareRetriever, Retriever};
    use crate::filler::FillWith;
    use crate::prompt::PromptTemplate;
    use crate::utils::embedding::test_embedding::BagOfWords;
    use crate::utils::history::ChatHistory;
    use crate::utils::llm::{ChatMessage, ChatModel};
    use crate::utils::splitter::Chunk;
    use crate::utils::vec_stores::InMemoryVecStore;

    struct Rewriter {
        seen: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ChatModel for Rewriter {
        async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
            self.seen.lock().unwrap().push(messages.len());
            Ok("  which cities have rust jobs  ".to_string())
        }
    }

    async fn retriever() -> Retriever<BagOfWords> {
        let chunks = ["rust jobs in berlin", "baking bread", "rust jobs in lisbon"]
            .iter()
            .enumerate()
            .map(|(idx, text)| Chunk { source: "jobs.txt".to_string(), start: idx * 100, text: text.to_string() })
            .collect();
        let embedder = BagOfWords { dim: 256 };
        let store = InMemoryVecStore::from_chunks(&embedder, chunks).await.unwrap();
        Retriever::new(store, embedder).with_top_k(2)
    }

    #[tokio::test]
    async fn test_retrieve_top_k() {
        let retriever = retriever().await;
        let chunks = retriever.retrieve("rust jobs").await.unwrap();
        assert_eq!(2, chunks.len());
        assert!(chunks.iter().all(|c| c.chunk.text.starts_with("rust jobs")));
        assert_eq!("rust jobs in berlin\n\nrust jobs in lisbon", stuff_documents(&chunks));
    }

    #[tokio::test]
    async fn test_history_aware_rewrites_only_with_history() {
        let retriever = retriever().await;
        let model = Rewriter { seen: Mutex::new(Vec::new()) };
        let history_aware = HistoryAwareRetriever::new(&model, &retriever);

        let empty = ChatHistory::new();
        assert_eq!("where?", history_aware.standalone_question("where?", &empty).await.unwrap());
        assert!(model.seen.lock().unwrap().is_empty());

        let mut history = ChatHistory::new();
        history.add_user("any rust jobs?");
        history.add_assistant("yes");
        let question = history_aware.standalone_question("where?", &history).await.unwrap();
        assert_eq!("which cities have rust jobs", question);
        assert_eq!(vec![4], *model.seen.lock().unwrap());
    }

    #[tokio::test]
    async fn test_context_filler() {
        let retriever = retriever().await;
        let chunks = retriever.retrieve("baking").await.unwrap();
        let template = PromptTemplate::new("Use the context:\n{{context}}");
        let mut prompt = template.construct_prompt();
        ContextFiller::new().fill_with(&mut prompt, &chunks[..1]).unwrap();
        assert_eq!("Use the context:\nbaking bread", prompt.complete().unwrap());
    }
}
