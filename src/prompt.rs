//! # Prompt
//! A prompt is simply a string
//! ## PromptTemplate
//! A prompt template is a string with placeholders. It can also have metadata in JSON format.
//!
//! ## Placeholder
//! A placeholder is a string that is in the format of `{{name}}`. It can be filled with a value.
//! It has a name, which is the string inside the double braces.
//!
//! ## PartialPrompt
//! A partial prompt is a prompt template with some placeholders filled. A partial prompt can be only constructed from a prompt template via [PromptTemplate::construct_prompt].
//!
//! The placeholders in a partial prompt can be filled with values via [PartialPrompt::fill] or [PartialPrompt::try_fill]. You can also use these two methods to update the filling values of the placeholders.
//! When all placeholders are filled, the partial prompt can be completed via [PartialPrompt::complete], in which the placeholders in a template are **actually** replaced with the filling values.
//!
//! ### Counting tokens
//! A partial prompt can be used to count the number of tokens in the prompt. For simple counting of tokens, you can use [PartialPrompt::current_token_num].
//!
//! If you need to frequently try different filling values and re-count tokens, you can use [PartialPrompt::with_counter_cache] to get a [PromptTokenCountCache].
//!
//! ## ChatPromptTemplate
//! An ordered list of role-tagged templates with an optional slot where the conversation history is replayed.
//! It turns one set of values into the message list sent to a chat model.


use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use anyhow::Result;
use crate::filler::{FillWith, MapFiller};
use crate::prompt::errors::{PlaceholderNotExist, UnfilledPlaceholders};
use crate::utils::history::ChatHistory;
use crate::utils::llm::{ChatMessage, Role};
use crate::utils::prompt_processing::{get_placeholders, replace_all_placeholders};
use crate::utils::token::{CountToken, PromptTokenCountCache};
use log::warn;
use crate::utils::JsonMap;


/// A prompt template with some placeholders filled. A partial prompt can be only constructed from a prompt template via [PromptTemplate::construct_prompt].
#[derive(Debug, Clone)]
#[readonly::make]
pub struct PartialPrompt {
    /// The template of the partial prompt, readonly
    #[readonly]
    pub template: PromptTemplate,

    /// Mapping from placeholder name to its filling value
    pub(crate) placeholder_to_vals: HashMap<String, Option<String>>,

    /// Record the placeholders that are not filled yet
    pub(crate) unfilled_placeholders: HashSet<String>,
}

impl PartialPrompt {
    /// Fill the placeholders in the partial prompt with the given values.
    /// Panics if the placeholder does not exist.
    pub fn fill(&mut self, placeholder: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.try_fill(placeholder, value).unwrap()
    }

    /// Fill the placeholders in the partial prompt with the given values.
    /// Returns an error if the placeholder does not exist.
    pub fn try_fill(&mut self, placeholder: impl Into<String>, value: impl Into<String>) -> Result<&mut Self, PlaceholderNotExist> {
        let placeholder = placeholder.into();
        if self.placeholder_to_vals.contains_key(&placeholder) {
            self.unfilled_placeholders.remove(&placeholder);
            self.placeholder_to_vals.insert(placeholder, Some(value.into()));
            Ok(self)
        } else {
            Err(PlaceholderNotExist::new(placeholder, value, &self.template.placeholders))
        }
    }

    /// Whether the placeholder has been filled.
    pub fn is_filled(&self, placeholder: &str) -> bool {
        matches!(self.placeholder_to_vals.get(placeholder), Some(Some(_)))
    }

    /// Get a [PromptTokenCountCache] that can be used to quickly count the number of tokens in the prompt and cache.
    pub fn with_counter_cache<'a, C: CountToken>(&'a self, counter: &'a C) -> PromptTokenCountCache<'a, C> {
        PromptTokenCountCache::new(self, counter)
    }

    /// Count the number of tokens in the prompt without caching. Note that the unfilled placeholders are also counted with the placeholder names.
    pub fn current_token_num(&self, counter: &impl CountToken) -> usize {
        PromptTokenCountCache::new(self, counter).current_count()
    }

    /// Complete the partial prompt and return the completed prompt.
    /// Returns an error if there are still unfilled placeholders.
    pub fn complete(&self) -> Result<String, UnfilledPlaceholders> {
        if self.unfilled_placeholders.is_empty() {
            Ok(replace_all_placeholders(self.template.str(), &self.placeholder_to_vals))
        } else {
            let mut all_placeholders: Vec<String> = self.template.placeholders.iter().cloned().collect();
            let mut unfilled_placeholders: Vec<String> = self.unfilled_placeholders.iter().cloned().collect();
            all_placeholders.sort();
            unfilled_placeholders.sort();
            Err(UnfilledPlaceholders {
                all_placeholders,
                unfilled_placeholders,
            })
        }
    }
}

/// A prompt template with placeholders. It can also have metadata in JSON format.
#[derive(Debug, Clone)]
#[readonly::make]
pub struct PromptTemplate {
    /// The template of the partial prompt, immutable
    template: Arc<String>,

    /// The placeholders in the template, readonly
    #[readonly]
    pub placeholders: HashSet<String>,

    /// The metadata of the prompt template, readonly
    #[readonly]
    pub meta_data: Arc<JsonMap>,
}

impl PromptTemplate {
    /// Create a prompt template from a string without metadata.
    pub fn new(template: impl Into<String>) -> Self {
        Self::with_metadata(template, JsonMap::new())
    }

    /// Create a prompt template from a string with metadata. Warns if the template does not have any placeholder.
    pub fn with_metadata(template: impl Into<String>, metadata: JsonMap) -> Self {
        let template = template.into();
        let placeholders = get_placeholders(&template);
        if placeholders.is_empty() {
            warn!("Your prompt template does not have a placeholder. If this is intended, ignore this message. \
            Otherwise, check whether you have written placeholders correctly.\n\
            Got prompt template:\n\
            {}", template);
        }
        Self {
            template: Arc::new(template),
            meta_data: Arc::new(metadata),
            placeholders,
        }
    }

    /// Get the prompt template as a string.
    #[inline]
    pub fn str(&self) -> &str {
        &self.template
    }

    /// Construct a partial prompt from the prompt template.
    pub fn construct_prompt(&self) -> PartialPrompt {
        PartialPrompt {
            template: self.clone(),
            placeholder_to_vals: self.placeholders.iter().map(|p| (p.clone(), None)).collect(),
            unfilled_placeholders: self.placeholders.clone(),
        }
    }

    /// Fill every placeholder from `values` and complete the prompt in one go.
    ///
    /// Errors if a value names an unknown placeholder or a placeholder is left unfilled.
    pub fn format(&self, values: &[(&str, &str)]) -> Result<String> {
        let mut prompt = self.construct_prompt();
        for (placeholder, value) in values {
            prompt.try_fill(*placeholder, *value)?;
        }
        Ok(prompt.complete()?)
    }
}

/// One entry of a [ChatPromptTemplate].
#[derive(Debug, Clone)]
pub enum ChatSegment {
    /// A message whose content is rendered from a template.
    Message(Role, PromptTemplate),
    /// The slot where previous turns are replayed.
    History,
}

/// Role-tagged templates rendered into a list of chat messages.
#[derive(Debug, Clone, Default)]
pub struct ChatPromptTemplate {
    segments: Vec<ChatSegment>,
}

impl ChatPromptTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system(mut self, template: impl Into<String>) -> Self {
        self.segments.push(ChatSegment::Message(Role::System, PromptTemplate::new(template)));
        self
    }

    pub fn human(mut self, template: impl Into<String>) -> Self {
        self.segments.push(ChatSegment::Message(Role::User, PromptTemplate::new(template)));
        self
    }

    pub fn ai(mut self, template: impl Into<String>) -> Self {
        self.segments.push(ChatSegment::Message(Role::Assistant, PromptTemplate::new(template)));
        self
    }

    /// Mark the position where the conversation history is replayed.
    pub fn history(mut self) -> Self {
        self.segments.push(ChatSegment::History);
        self
    }

    pub fn segments(&self) -> &[ChatSegment] {
        &self.segments
    }

    /// All placeholders of all message templates.
    pub fn placeholders(&self) -> HashSet<String> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                ChatSegment::Message(_, template) => Some(template.placeholders.iter().cloned()),
                ChatSegment::History => None,
            })
            .flatten()
            .collect()
    }

    /// Render the messages. Every template is filled from the same `values`; values a template
    /// does not use are ignored. The history, if given, is spliced in at the history slot.
    pub fn format_messages(&self, values: &HashMap<String, String>, history: Option<&ChatHistory>) -> Result<Vec<ChatMessage>> {
        let filler = MapFiller::from(values.clone());
        let mut messages = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment {
                ChatSegment::Message(role, template) => {
                    let mut prompt = template.construct_prompt();
                    filler.fill_with(&mut prompt, ())?;
                    messages.push(ChatMessage::new(*role, prompt.complete()?));
                }
                ChatSegment::History => {
                    if let Some(history) = history {
                        messages.extend(history.to_messages());
                    }
                }
            }
        }
        Ok(messages)
    }
}

pub mod errors {
    use std::collections::HashSet;
    use std::error::Error;
    use std::fmt;
    use std::fmt::Formatter;

    /// Error when trying to complete a partial prompt but there are still unfilled placeholders.
    #[derive(Debug)]
    pub struct UnfilledPlaceholders {
        pub unfilled_placeholders: Vec<String>,
        pub all_placeholders: Vec<String>,
    }

    impl fmt::Display for UnfilledPlaceholders {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "UnfilledPlaceholders: to complete the prompt template,\n  Requires Placeholders:{:?}\n  Unfilled Placeholders:{:?}",
                   self.all_placeholders, self.unfilled_placeholders)
        }
    }

    impl Error for UnfilledPlaceholders {}

    /// Error when trying to fill a placeholder that does not exist in the prompt template of the partial prompt.
    #[derive(Debug)]
    pub struct PlaceholderNotExist {
        pub try_fill_placeholder: String,
        pub value: String,
        pub available_placeholders: Vec<String>,
    }

    impl PlaceholderNotExist {
        pub(crate) fn new(try_fill_placeholder: impl Into<String>,
                          value: impl Into<String>,
                          available_placeholders: &HashSet<String>) -> Self {
            let mut available_placeholders: Vec<String> = available_placeholders.iter().cloned().collect();
            available_placeholders.sort();
            PlaceholderNotExist {
                try_fill_placeholder: try_fill_placeholder.into(),
                value: value.into(),
                available_placeholders,
            }
        }
    }

    impl fmt::Display for PlaceholderNotExist {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "PlaceholderNotExist: try to fill placeholder = {} with value = {}, but available placeholders are {:?}",
                   self.try_fill_placeholder,
                   self.value,
                   self.available_placeholders)
        }
    }

    impl Error for PlaceholderNotExist {}
}

#[cfg(test)]
mod test_prompt {
    use std::collections::HashMap;
    use super::{ChatPromptTemplate, PromptTemplate};
    use super::errors::UnfilledPlaceholders;
    use crate::utils::history::ChatHistory;
    use crate::utils::llm::Role;

    const CUISINE: &str = "What is the traditional cuisine of {{country}}?\nAnswer in {{number_of_paragraphs}} short paras in {{language}}";

    #[test]
    fn test_complete_substitutes_every_placeholder() {
        let template = PromptTemplate::new(CUISINE);
        let prompt = template
            .construct_prompt()
            .fill("country", "Peru")
            .fill("number_of_paragraphs", "2")
            .fill("language", "Spanish")
            .complete()
            .expect("all placeholders are filled");
        assert_eq!("What is the traditional cuisine of Peru?\nAnswer in 2 short paras in Spanish", prompt);
    }

    #[test]
    fn test_refill_overrides_value() {
        let template = PromptTemplate::new("Hello {{name}}, bye {{name}}");
        let mut prompt = template.construct_prompt();
        prompt.fill("name", "alice");
        prompt.fill("name", "bob");
        assert_eq!("Hello bob, bye bob", prompt.complete().unwrap());
    }

    #[test]
    fn test_unfilled_placeholders_are_reported() {
        let template = PromptTemplate::new(CUISINE);
        let mut prompt = template.construct_prompt();
        prompt.fill("country", "Peru");
        let UnfilledPlaceholders { unfilled_placeholders, all_placeholders } = prompt.complete().unwrap_err();
        assert_eq!(vec!["language".to_string(), "number_of_paragraphs".to_string()], unfilled_placeholders);
        assert_eq!(3, all_placeholders.len());
    }

    #[test]
    fn test_try_fill_unknown_placeholder() {
        let template = PromptTemplate::new(CUISINE);
        let mut prompt = template.construct_prompt();
        let err = prompt.try_fill("city", "Lima").unwrap_err();
        assert_eq!("city", err.try_fill_placeholder);
        assert!(!prompt.is_filled("country"));
    }

    #[test]
    fn test_format() {
        let template = PromptTemplate::new("Welcome to the {{city}} travel guide! Budget: {{budget}}");
        let prompt = template.format(&[("city", "Kyoto"), ("budget", "Low")]).unwrap();
        assert_eq!("Welcome to the Kyoto travel guide! Budget: Low", prompt);
        assert!(template.format(&[("city", "Kyoto")]).is_err());
    }

    #[test]
    fn test_chat_template_replays_history() {
        let template = ChatPromptTemplate::new()
            .system("You are a Agile Coach.")
            .history()
            .human("{{question}}");
        let mut history = ChatHistory::new();
        history.add_user("What is a sprint?");
        history.add_assistant("A time-box.");
        let values = HashMap::from([("question".to_string(), "How long?".to_string())]);

        let messages = template.format_messages(&values, Some(&history)).unwrap();
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(vec![Role::System, Role::User, Role::Assistant, Role::User], roles);
        assert_eq!("How long?", messages[3].content);

        let without_history = template.format_messages(&values, None).unwrap();
        assert_eq!(2, without_history.len());
    }

    #[test]
    fn test_chat_template_missing_value() {
        let template = ChatPromptTemplate::new()
            .system("Use the context: {{context}}")
            .human("{{input}}");
        let values = HashMap::from([("input".to_string(), "hi".to_string())]);
        assert!(template.format_messages(&values, None).is_err());
        assert_eq!(2, template.placeholders().len());
    }
}
