//! In-memory conversation history for one session.

use std::fmt;
use anyhow::Result;
use log::debug;
use crate::utils::llm::{ChatMessage, Role};
use crate::utils::token::CountToken;
use crate::utils::token::tiktoken::Tiktoken;

/// Tokens kept free for the system prompt, the new question and the answer.
pub const DEFAULT_RESERVE_TOKENS: usize = 2048;

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

/// Ordered list of turns, replayed into prompts.
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push(ChatTurn { role, text: text.into() });
    }

    pub fn add_user(&mut self, text: impl Into<String>) {
        self.add(Role::User, text)
    }

    pub fn add_assistant(&mut self, text: impl Into<String>) {
        self.add(Role::Assistant, text)
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .map(|turn| ChatMessage::new(turn.role, turn.text.as_str()))
            .collect()
    }

    /// Drop the oldest turns until the remaining texts fit into `max_tokens`. Returns how many turns were dropped.
    pub fn trim_to_budget(&mut self, counter: &(impl CountToken + ?Sized), max_tokens: usize) -> usize {
        let mut token_count = 0;
        let mut keep_from = self.turns.len();
        for (idx, turn) in self.turns.iter().enumerate().rev() {
            let turn_tokens = counter.count_token(&turn.text);
            if token_count + turn_tokens > max_tokens {
                break;
            }
            token_count += turn_tokens;
            keep_from = idx;
        }
        self.turns.drain(..keep_from);
        keep_from
    }
}

/// How many tokens of history may be replayed into a prompt.
pub struct HistoryBudget {
    counter: Box<dyn CountToken + Send + Sync>,
    pub max_tokens: usize,
}

impl HistoryBudget {
    pub fn new(counter: impl CountToken + Send + Sync + 'static, max_tokens: usize) -> Self {
        Self {
            counter: Box::new(counter),
            max_tokens,
        }
    }

    /// The context window of `model` minus `reserve`, counted with the model's tokenizer.
    pub fn for_model(model: &str, reserve: usize) -> Result<Self> {
        let tiktoken = Tiktoken::new(model)?;
        let max_tokens = tiktoken.max_tokens.saturating_sub(reserve);
        Ok(Self::new(tiktoken, max_tokens))
    }

    /// Drop the oldest turns of `history` that do not fit. Returns how many turns were dropped.
    pub fn apply(&self, history: &mut ChatHistory) -> usize {
        let dropped = history.trim_to_budget(self.counter.as_ref(), self.max_tokens);
        if dropped > 0 {
            debug!("dropped {} turns to keep the history within {} tokens", dropped, self.max_tokens);
        }
        dropped
    }
}

impl fmt::Display for ChatHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for turn in &self.turns {
            writeln!(f, "{}: {}", turn.role, turn.text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test_history {
    use super::{ChatHistory, HistoryBudget};
    use crate::utils::llm::Role;
    use crate::utils::token::count_tokens_by_len;

    #[test]
    fn test_replay_order() {
        let mut history = ChatHistory::new();
        history.add_user("q1");
        history.add_assistant("a1");
        let messages = history.to_messages();
        assert_eq!(Role::User, messages[0].role);
        assert_eq!("a1", messages[1].content);
        assert_eq!("user: q1\nassistant: a1\n", history.to_string());
    }

    #[test]
    fn test_trim_drops_oldest() {
        let mut history = ChatHistory::new();
        history.add_user("aaaa");
        history.add_assistant("bbbb");
        history.add_user("cc");
        let dropped = history.trim_to_budget(&count_tokens_by_len, 6);
        assert_eq!(1, dropped);
        assert_eq!("bbbb", history.turns()[0].text);

        let dropped = history.trim_to_budget(&count_tokens_by_len, 0);
        assert_eq!(2, dropped);
        assert!(history.is_empty());
    }

    #[test]
    fn test_budget_for_model() {
        let budget = HistoryBudget::for_model("gpt-4", 2048).unwrap();
        assert_eq!(8192 - 2048, budget.max_tokens);
        assert_eq!(0, HistoryBudget::for_model("gpt-4", 10000).unwrap().max_tokens);

        let mut history = ChatHistory::new();
        history.add_user("hello");
        assert_eq!(0, budget.apply(&mut history));
        assert_eq!(1, HistoryBudget::new(count_tokens_by_len, 4).apply(&mut history));
        assert!(history.is_empty());
    }
}
