use std::collections::HashMap;
use anyhow::Result;
pub use tiktoken_rs::{cl100k_base, get_bpe_from_model, CoreBPE};
use log::warn;

use crate::utils::llm::ChatMessage;
use crate::utils::token::CountToken;
use lazy_static::lazy_static;

const TOKENS_PER_MESSAGE: usize = 3;
/// Rough cost of a low-detail image input.
const TOKENS_PER_LOW_DETAIL_IMAGE: usize = 85;
const DEFAULT_MAX_TOKENS: usize = 4096;

lazy_static! {
    /// const map from model name to max tokens.
    /// TODO: when `LazyCell` is stabilized, use that instead
    pub static ref MODEL_TO_MAX_TOKENS: HashMap<&'static str, usize> = HashMap::from([
        ("gpt-4o", 128000),
        ("gpt-4o-mini", 128000),
        ("gpt-4", 8192),
        ("gpt-4-32k", 32768),
        ("gpt-3.5-turbo", 16385),
        ("deepseek-chat", 65536),
    ]);
}

/// Context window of a model, matched by the longest known prefix of its name.
pub fn max_tokens_of(model: &str) -> usize {
    MODEL_TO_MAX_TOKENS
        .iter()
        .filter(|(name, _)| model.starts_with(*name))
        .max_by_key(|(name, _)| name.len())
        .map(|(_, max_tokens)| *max_tokens)
        .unwrap_or(DEFAULT_MAX_TOKENS)
}

/// Counter using the Tiktoken tokenizer.
#[derive(Clone)]
#[readonly::make]
pub struct Tiktoken {
    /// The model name of the tokenizer. read-only.
    #[readonly]
    pub model: String,
    /// Context window of the model. read-only.
    #[readonly]
    pub max_tokens: usize,
    /// The tokenizer. read-only.
    #[readonly]
    pub bpe: CoreBPE,
}

impl Tiktoken {
    /// Create a new Tiktoken counter. Models unknown to tiktoken fall back to the `cl100k_base` encoding.
    pub fn new(model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        let bpe = match get_bpe_from_model(&model) {
            Ok(bpe) => bpe,
            Err(_) => {
                warn!("no tokenizer registered for model {}, counting with cl100k_base", model);
                cl100k_base()?
            }
        };
        Ok(Tiktoken {
            max_tokens: max_tokens_of(&model),
            model,
            bpe,
        })
    }

    /// Count the number of tokens in a chat message. Following best practices from the OpenAI example.
    pub fn count_msg_token(&self, msg: &ChatMessage) -> usize {
        self.count_token(&msg.content) + msg.images.len() * TOKENS_PER_LOW_DETAIL_IMAGE + TOKENS_PER_MESSAGE
    }

    /// Keep the newest messages that fit into the context window, plus the system message if given.
    pub fn truncate_messages(&self,
                             messages: &[ChatMessage],
                             system_message: Option<ChatMessage>) -> Vec<ChatMessage> {
        match system_message {
            Some(sys_prompt) => {
                let sys_prompt_token_count = self.count_msg_token(&sys_prompt);
                let budget = self.max_tokens.saturating_sub(sys_prompt_token_count);
                let truncate_start_idx = self.get_truncate_start_idx(messages, budget);
                let mut new_messages = Vec::with_capacity(messages.len() - truncate_start_idx + 1);
                new_messages.push(sys_prompt);
                new_messages.extend_from_slice(&messages[truncate_start_idx..]);
                new_messages
            }
            None => {
                let truncate_start_idx = self.get_truncate_start_idx(messages, self.max_tokens);
                messages[truncate_start_idx..].to_vec()
            }
        }
    }

    pub(crate) fn get_truncate_start_idx(&self,
                                         messages: &[ChatMessage],
                                         max_tokens: usize) -> usize {
        let mut token_count = 0;
        // TODO: make this algorithm more smart as in Python `tokentrim`
        let mut truncate_start_idx = messages.len();
        for (idx, msg) in messages.iter().enumerate().rev() {
            let message_token_count = self.count_msg_token(msg);
            if token_count + message_token_count > max_tokens {
                break;
            }
            token_count += message_token_count;
            truncate_start_idx = idx;
        }
        truncate_start_idx
    }
}

impl CountToken for Tiktoken {
    fn count_token(&self, string: &str) -> usize {
        self.bpe.encode_with_special_tokens(string).len()
    }
}

#[cfg(test)]
mod test_tiktoken {
    use super::{max_tokens_of, Tiktoken};
    use crate::utils::llm::ChatMessage;
    use crate::utils::token::CountToken;

    #[test]
    fn test_max_tokens_prefers_longest_prefix() {
        assert_eq!(128000, max_tokens_of("gpt-4o-mini-2024-07-18"));
        assert_eq!(8192, max_tokens_of("gpt-4-0613"));
        assert_eq!(4096, max_tokens_of("gemma:2b"));
    }

    #[test]
    fn test_truncate_keeps_newest() {
        let tiktoken = Tiktoken::new("gpt-3.5-turbo").unwrap();
        assert!(tiktoken.count_token("hello world") > 0);
        let messages = vec![ChatMessage::user("first"), ChatMessage::assistant("second"), ChatMessage::user("third")];
        let budget = tiktoken.count_msg_token(&messages[2]);
        let start = tiktoken.get_truncate_start_idx(&messages, budget);
        assert_eq!(2, start);

        let kept = tiktoken.truncate_messages(&messages, Some(ChatMessage::system("sys")));
        assert_eq!(4, kept.len());
        assert_eq!("sys", kept[0].content);
    }
}
