//! # promptbook
//!
//! A book of small, self-contained LLM applications built on a prompt-centric core.
//!
//! Every application is a flat sequence: collect input, format a prompt, invoke a model, render the reply. Some add a
//! retrieval step (split documents into chunks, embed them, search by similarity, stuff the closest chunks into the
//! prompt) or replay the conversation so far.
//!
//! ## Concepts
//!
//! ### Prompt Template and Placeholder
//!
//! A template of prompts, for example
//!
//! ```text
//! You are an expert in traditional cuisines. What is the traditional cuisine of {{country}}?
//! ```
//!
//! `{{country}}` is a placeholder named `"country"`. A name can be any string without line breaks or braces.
//!
//! ```
//! use promptbook::prompt::PromptTemplate;
//! let template = PromptTemplate::new("What is the traditional cuisine of {{country}}?");
//! let prompt = template.format(&[("country", "Peru")]).unwrap();
//! assert_eq!("What is the traditional cuisine of Peru?", prompt);
//! ```
//!
//! [`ChatPromptTemplate`](crate::prompt::ChatPromptTemplate) does the same for a list of role-tagged messages and
//! marks where the chat history is replayed.
//!
//! ### Partial Prompt
//!
//! A `PartialPrompt` comes from `PromptTemplate::construct_prompt`. It records which placeholder got filled by what
//! value, and is turned into the final prompt by `PartialPrompt::complete` once nothing is left unfilled.
//!
//! ### Filler
//!
//! Anything that fills one or more placeholders, i.e. implements [`FillPlaceholders`](crate::filler::FillPlaceholders)
//! and one of [`Fill`](crate::filler::Fill), [`FillMut`](crate::filler::FillMut), [`FillWith<CTX>`](crate::filler::FillWith)
//! and [`FillWithMut<CTX>`](crate::filler::FillWithMut). Retrieved documents, for instance, reach a prompt through
//! [`ContextFiller`](crate::utils::retrievers::ContextFiller).
//!
//! ### Endpoint
//!
//! A [`ChatModel`](crate::utils::llm::ChatModel) consumes messages and produces a reply. Post-processing of replies
//! lives in [utils::postprocess](crate::utils::postprocess).
//!
//! ### Applications
//!
//! The applications themselves live in [exemplars]; `promptbook-demos` wraps each of them in a command line program.
//!
//! ## Attribution
//! * `async_openai`: [crate::utils::llm::ConversationConfig] is adapted from its request arguments.
//! * `tiktoken-rs`: In [crate::utils::token::tiktoken], we re-export the `tiktoken-rs` crate.

pub mod prompt;
pub mod filler;
pub mod config;
pub mod utils;
pub mod exemplars;
