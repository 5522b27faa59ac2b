//! # Essay writer
//!
//! A small research-and-write workflow. A model drafts an outline, researches the topic on the web, writes a
//! 5-paragraph essay and then repeatedly critiques and revises it:
//!
//! ```text
//! CreateOutline -> PerformResearch -> WriteEssay -> ProvideCritique -> ResearchCritique -> ReviseEssay
//!                                                        ^                                     |
//!                                                        +------------- Continue --------------+
//! ```
//!
//! The loop ends after `max_iterations` revisions or as soon as the essay is longer than `word_count_limit` words.

use std::collections::HashMap;
use std::fmt;
use std::fmt::Formatter;
use anyhow::Result;
use lazy_static::lazy_static;
use log::{debug, info};
use serde::Serialize;

use crate::prompt::ChatPromptTemplate;
use crate::utils::llm::ChatModel;
use crate::utils::postprocess::lines::{parse_list, word_count};
use crate::utils::search::{search_with_retry, RetryPolicy, WebSearch};

pub const PLAN_PROMPT: &str = "You are an expert writer tasked with writing a high level outline of an essay. \
Write such an outline for the user provided topic. Give an outline of the essay along with any relevant notes \
or instructions for the sections.";

pub const WRITER_PROMPT: &str = "You are an essay assistant tasked with writing excellent 5-paragraph essays.\
Generate the best essay possible for the user's request and the initial outline. \
If the user provides critique, respond with a revised version of your previous attempts. \
Utilize all the information below as needed: \n\n------\n";

pub const REFLECTION_PROMPT: &str = "You are a teacher grading an essay submission. \
Generate critique and recommendations for the user's submission. \
Provide detailed recommendations, including requests for length, depth, style, etc.";

pub const RESEARCH_PLAN_PROMPT: &str = "You are a researcher charged with providing information that can \
be used when writing the following essay. Generate a list of search queries that will gather \
any relevant information. Only generate 3 queries max.";

pub const RESEARCH_CRITIQUE_PROMPT: &str = "You are a researcher charged with providing information that can \
be used when making any requested revisions (as outlined below). \
Generate a list of search queries that will gather any relevant information. Only generate 3 queries max.";

pub const MIN_ITERATIONS: usize = 1;
pub const MAX_ITERATIONS: usize = 10;
pub const MIN_WORD_COUNT_LIMIT: usize = 100;
pub const DEFAULT_MAX_ITERATIONS: usize = 3;
pub const DEFAULT_WORD_COUNT_LIMIT: usize = 1000;

const MAX_QUERIES: usize = 3;
const RESULTS_PER_QUERY: usize = 3;
const CRITIQUE_RESEARCH_HEADER: &str = "\n\nAdditional Research Based on Critique:\n";

lazy_static! {
    static ref OUTLINE_TEMPLATE: ChatPromptTemplate = ChatPromptTemplate::new()
        .system(PLAN_PROMPT)
        .human("{{topic}}");
    static ref RESEARCH_TEMPLATE: ChatPromptTemplate = ChatPromptTemplate::new()
        .system(RESEARCH_PLAN_PROMPT)
        .human("{{topic}}");
    static ref WRITE_TEMPLATE: ChatPromptTemplate = ChatPromptTemplate::new()
        .system(WRITER_PROMPT)
        .human("Topic: {{topic}}\nOutline: {{outline}}\nResearch: {{research}}");
    static ref CRITIQUE_TEMPLATE: ChatPromptTemplate = ChatPromptTemplate::new()
        .system(REFLECTION_PROMPT)
        .human("{{essay}}");
    static ref CRITIQUE_RESEARCH_TEMPLATE: ChatPromptTemplate = ChatPromptTemplate::new()
        .system(RESEARCH_CRITIQUE_PROMPT)
        .human("Essay: {{essay}}\nCritique: {{critique}}");
    static ref REVISE_TEMPLATE: ChatPromptTemplate = ChatPromptTemplate::new()
        .system(WRITER_PROMPT)
        .human("Previous Essay: {{essay}}\nCritique: {{critique}}");
}

/// Everything the workflow knows about one essay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EssayState {
    pub topic: String,
    pub outline: String,
    pub research: String,
    pub essay: String,
    pub critique: String,
    /// Completed revisions, never above `max_iterations`.
    pub iteration: usize,
    pub max_iterations: usize,
    pub word_count_limit: usize,
}

impl EssayState {
    /// Start a workflow. `max_iterations` is clamped to `1..=10` and `word_count_limit` raised to at least 100.
    pub fn new(topic: impl Into<String>, max_iterations: usize, word_count_limit: usize) -> Self {
        Self {
            topic: topic.into(),
            outline: String::new(),
            research: String::new(),
            essay: String::new(),
            critique: String::new(),
            iteration: 0,
            max_iterations: max_iterations.clamp(MIN_ITERATIONS, MAX_ITERATIONS),
            word_count_limit: word_count_limit.max(MIN_WORD_COUNT_LIMIT),
        }
    }

    /// Placeholder values for the stage templates.
    fn values(&self) -> HashMap<String, String> {
        HashMap::from([
            ("topic".to_string(), self.topic.clone()),
            ("outline".to_string(), self.outline.clone()),
            ("research".to_string(), self.research.clone()),
            ("essay".to_string(), self.essay.clone()),
            ("critique".to_string(), self.critique.clone()),
        ])
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.essay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    CreateOutline,
    PerformResearch,
    WriteEssay,
    ProvideCritique,
    ResearchCritique,
    ReviseEssay,
    End,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::CreateOutline => "create_outline",
            Stage::PerformResearch => "perform_research",
            Stage::WriteEssay => "write_essay",
            Stage::ProvideCritique => "provide_critique",
            Stage::ResearchCritique => "research_critique",
            Stage::ReviseEssay => "revise_essay",
            Stage::End => "end",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    End,
}

/// Whether another critique and revision round should run.
pub fn should_continue(state: &EssayState) -> Decision {
    if state.iteration >= state.max_iterations || state.word_count() > state.word_count_limit {
        Decision::End
    } else {
        Decision::Continue
    }
}

/// Result of a finished workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EssayReport {
    pub topic: String,
    pub outline: String,
    pub final_essay: String,
    pub final_critique: String,
    pub iterations: usize,
    pub word_count: usize,
}

impl From<EssayState> for EssayReport {
    fn from(state: EssayState) -> Self {
        Self {
            word_count: state.word_count(),
            topic: state.topic,
            outline: state.outline,
            final_essay: state.essay,
            final_critique: state.critique,
            iterations: state.iteration,
        }
    }
}

/// Drives an [EssayState] through the stages with one model and one search backend.
pub struct EssayWriter<M: ChatModel, S: WebSearch> {
    pub model: M,
    pub search: S,
    pub retry_policy: RetryPolicy,
}

impl<M: ChatModel, S: WebSearch> EssayWriter<M, S> {
    pub fn new(model: M, search: S) -> Self {
        Self {
            model,
            search,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub async fn run(&self, state: EssayState) -> Result<EssayReport> {
        self.run_with_observer(state, |_, _| {}).await
    }

    /// Run to completion, calling `observer` after every completed stage.
    pub async fn run_with_observer(&self, mut state: EssayState, mut observer: impl FnMut(Stage, &EssayState)) -> Result<EssayReport> {
        info!("writing essay on {:?} with at most {} revisions and a {} word limit",
              state.topic, state.max_iterations, state.word_count_limit);
        let mut stage = Stage::CreateOutline;
        while stage != Stage::End {
            let next = self.step(stage, &mut state).await?;
            debug!("finished {}, next {}", stage, next);
            observer(stage, &state);
            stage = next;
        }
        info!("essay finished after {} revisions, {} words", state.iteration, state.word_count());
        Ok(state.into())
    }

    /// Execute one stage and return the stage to run next.
    pub async fn step(&self, stage: Stage, state: &mut EssayState) -> Result<Stage> {
        let next = match stage {
            Stage::CreateOutline => {
                state.outline = self.ask(&OUTLINE_TEMPLATE, state).await?;
                Stage::PerformResearch
            }
            Stage::PerformResearch => {
                state.research = self.research(&RESEARCH_TEMPLATE, state).await?;
                Stage::WriteEssay
            }
            Stage::WriteEssay => {
                state.essay = self.ask(&WRITE_TEMPLATE, state).await?;
                Stage::ProvideCritique
            }
            Stage::ProvideCritique => {
                state.critique = self.ask(&CRITIQUE_TEMPLATE, state).await?;
                Stage::ResearchCritique
            }
            Stage::ResearchCritique => {
                let additional = self.research(&CRITIQUE_RESEARCH_TEMPLATE, state).await?;
                state.research.push_str(CRITIQUE_RESEARCH_HEADER);
                state.research.push_str(&additional);
                Stage::ReviseEssay
            }
            Stage::ReviseEssay => {
                state.essay = self.ask(&REVISE_TEMPLATE, state).await?;
                state.iteration += 1;
                match should_continue(state) {
                    Decision::Continue => Stage::ProvideCritique,
                    Decision::End => Stage::End,
                }
            }
            Stage::End => Stage::End,
        };
        Ok(next)
    }

    async fn ask(&self, template: &ChatPromptTemplate, state: &EssayState) -> Result<String> {
        let messages = template.format_messages(&state.values(), None)?;
        self.model.chat(&messages).await
    }

    /// Ask the model for search queries, run at most three of them and format the findings.
    async fn research(&self, template: &ChatPromptTemplate, state: &EssayState) -> Result<String> {
        let reply = self.ask(template, state).await?;
        let mut blocks = Vec::new();
        for query in parse_list(&reply, MAX_QUERIES) {
            let results = search_with_retry(&self.search, &query, RESULTS_PER_QUERY, &self.retry_policy).await;
            blocks.push(format!("Query: {}\nResults:\n{}\n", query, results));
        }
        Ok(blocks.join("\n"))
    }
}
