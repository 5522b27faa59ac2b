//! # Document question answering
//!
//! Conversational retrieval over local documents: the documents are chunked and embedded into an in-memory index,
//! each question is rewritten against the chat history, the closest chunks are stuffed into the system prompt and
//! both turns are remembered for follow-up questions.

use anyhow::{bail, Result};
use lazy_static::lazy_static;
use log::{debug, info};
use serde::Serialize;

use crate::filler::FillWith;
use crate::prompt::PromptTemplate;
use crate::utils::embedding::AsyncEmbed;
use crate::utils::history::{ChatHistory, HistoryBudget};
use crate::utils::llm::{ChatMessage, ChatModel};
use crate::utils::retrievers::{ContextFiller, HistoryAwareRetriever, Retriever};
use crate::utils::splitter::{split_documents, Document};
use crate::utils::vec_stores::{InMemoryVecStore, ScoredChunk};

pub const CHUNK_SIZE: usize = 1000;
pub const CHUNK_OVERLAP: usize = 100;

const CONCISE_INSTRUCTION: &str = "Limit your response to three concise sentences.";
const DETAILED_INSTRUCTION: &str = "Provide at least 3 paragraphs outlined with sub-headings where appropriate.";

lazy_static! {
    static ref QA_SYSTEM_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "You are an assistant for answering questions.\n\
        Use the provided context to respond. If the answer\n\
        isn't clear, acknowledge that you don't know.\n\
        {{length_instruction}}\n\
        {{context}}");
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    /// Documents the context came from, in retrieval order without repeats.
    pub sources: Vec<String>,
}

pub struct DocumentQa<M: ChatModel, E: AsyncEmbed> {
    pub model: M,
    pub retriever: Retriever<E>,
    pub history: ChatHistory,
    /// Three sentences instead of a sectioned multi-paragraph answer.
    pub concise: bool,
    pub history_budget: Option<HistoryBudget>,
}

impl<M: ChatModel, E: AsyncEmbed> DocumentQa<M, E> {
    /// Split and embed `documents` with the default chunking.
    pub async fn from_documents(model: M, embedder: E, documents: &[Document]) -> Result<Self> {
        Self::from_documents_with(model, embedder, documents, CHUNK_SIZE, CHUNK_OVERLAP).await
    }

    pub async fn from_documents_with(model: M, embedder: E, documents: &[Document], chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let chunks = split_documents(documents, chunk_size, chunk_overlap)?;
        if chunks.is_empty() {
            bail!("the documents contain no text to index");
        }
        info!("indexing {} chunks from {} documents", chunks.len(), documents.len());
        let store = InMemoryVecStore::from_chunks(&embedder, chunks).await?;
        Ok(Self {
            model,
            retriever: Retriever::new(store, embedder),
            history: ChatHistory::new(),
            concise: true,
            history_budget: None,
        })
    }

    pub fn concise(mut self, concise: bool) -> Self {
        self.concise = concise;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.retriever.top_k = top_k;
        self
    }

    /// Trim the replayed history to `budget` before every question.
    pub fn with_history_budget(mut self, budget: HistoryBudget) -> Self {
        self.history_budget = Some(budget);
        self
    }

    fn system_prompt(&self, context: &[ScoredChunk]) -> Result<String> {
        let mut prompt = QA_SYSTEM_TEMPLATE.construct_prompt();
        let instruction = if self.concise { CONCISE_INSTRUCTION } else { DETAILED_INSTRUCTION };
        prompt.try_fill("length_instruction", instruction)?;
        ContextFiller::new().fill_with(&mut prompt, context)?;
        Ok(prompt.complete()?)
    }

    pub async fn ask(&mut self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            bail!("the question is empty");
        }
        if let Some(budget) = &self.history_budget {
            budget.apply(&mut self.history);
        }
        let context = HistoryAwareRetriever::new(&self.model, &self.retriever)
            .retrieve(question, &self.history)
            .await?;
        debug!("retrieved {} chunks for {:?}", context.len(), question);

        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt(&context)?));
        messages.extend(self.history.to_messages());
        messages.push(ChatMessage::user(question));
        let answer = self.model.chat(&messages).await?;

        self.history.add_user(question);
        self.history.add_assistant(answer.as_str());

        let mut sources: Vec<String> = Vec::new();
        for scored in &context {
            if !sources.contains(&scored.chunk.source) {
                sources.push(scored.chunk.source.clone());
            }
        }
        Ok(Answer { answer, sources })
    }
}

#[cfg(test)]
mod test_doc_qa {
    use anyhow::Result;
    use super::{DocumentQa, CONCISE_INSTRUCTION, DETAILED_INSTRUCTION};
    use crate::utils::embedding::test_embedding::BagOfWords;
    use crate::utils::history::HistoryBudget;
    use crate::utils::llm::test_models::ScriptedModel;
    use crate::utils::llm::{ChatMessage, Role};
    use crate::utils::retrievers::CONTEXTUALIZE_QUESTION_PROMPT;
    use crate::utils::splitter::Document;
    use crate::utils::token::count_tokens_by_len;

    fn documents() -> Vec<Document> {
        vec![
            Document::new("policy.md", "Employees get 25 vacation days per year."),
            Document::new("menu.txt", "The cafeteria serves pasta on Fridays."),
        ]
    }

    fn reply(messages: &[ChatMessage]) -> Result<String> {
        Ok(if messages[0].content == CONTEXTUALIZE_QUESTION_PROMPT {
            "How many vacation days do employees get per year?".to_string()
        } else {
            format!("answer to {}", messages.last().map(|m| m.content.as_str()).unwrap_or(""))
        })
    }

    #[tokio::test]
    async fn test_answers_from_retrieved_context() {
        let model = ScriptedModel::new(reply);
        let mut qa = DocumentQa::from_documents(model, BagOfWords { dim: 256 }, &documents())
            .await
            .unwrap()
            .with_top_k(1);

        let answer = qa.ask("How many vacation days per year?").await.unwrap();
        assert_eq!("answer to How many vacation days per year?", answer.answer);
        assert_eq!(vec!["policy.md"], answer.sources);

        let request = qa.model.request(0);
        assert_eq!(Role::System, request[0].role);
        assert!(request[0].content.contains(CONCISE_INSTRUCTION));
        assert!(request[0].content.ends_with("Employees get 25 vacation days per year."));
        assert_eq!(2, qa.history.len());
    }

    #[tokio::test]
    async fn test_follow_up_is_contextualized() {
        let model = ScriptedModel::new(reply);
        let mut qa = DocumentQa::from_documents(model, BagOfWords { dim: 256 }, &documents())
            .await
            .unwrap()
            .concise(false)
            .with_top_k(1);
        qa.ask("vacation days?").await.unwrap();
        let answer = qa.ask("and per year?").await.unwrap();

        // answer, rewrite, answer
        assert_eq!(3, qa.model.request_count());
        assert_eq!(vec!["policy.md"], answer.sources);
        let last = qa.model.request(2);
        assert!(last[0].content.contains(DETAILED_INSTRUCTION));
        assert_eq!(4, last.len());
        assert_eq!("and per year?", last[3].content);
    }

    #[tokio::test]
    async fn test_rejects_empty_input() {
        let model = ScriptedModel::new(reply);
        let empty = vec![Document::new("blank.txt", "   ")];
        assert!(DocumentQa::from_documents(model, BagOfWords { dim: 8 }, &empty).await.is_err());

        let model = ScriptedModel::new(reply);
        let mut qa = DocumentQa::from_documents(model, BagOfWords { dim: 8 }, &documents()).await.unwrap();
        assert!(qa.ask("  ").await.is_err());
        assert_eq!(0, qa.model.request_count());
    }

    #[tokio::test]
    async fn test_history_budget_drops_old_turns() {
        let model = ScriptedModel::new(reply);
        let mut qa = DocumentQa::from_documents(model, BagOfWords { dim: 256 }, &documents())
            .await
            .unwrap()
            .with_top_k(1)
            .with_history_budget(HistoryBudget::new(count_tokens_by_len, 0));
        qa.ask("vacation days?").await.unwrap();
        qa.ask("and per year?").await.unwrap();

        // nothing to replay, so no rewrite either
        assert_eq!(2, qa.model.request_count());
        let last = qa.model.request(1);
        assert_eq!(2, last.len());
        assert_eq!("and per year?", last[1].content);
        assert_eq!(2, qa.history.len());
    }
}
