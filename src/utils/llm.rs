//! # LLM endpoint
//!
//! The endpoint of a `PromptTemplate -> PartialPrompt -> prompt` pipeline. A [ChatModel] consumes a list of
//! [ChatMessage]s and produces a reply. [openai::OpenAIChat] talks to any OpenAI-compatible server.

use std::fmt;
use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

pub mod openai;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        f.write_str(name)
    }
}

/// How closely a vision model should look at an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageDetail {
    Auto,
    #[default]
    Low,
    High,
}

/// An image sent inline as a base64 data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub data_url: String,
    pub detail: ImageDetail,
}

impl ImageAttachment {
    /// Encode raw image bytes as `data:<mime>;base64,<payload>` with low detail.
    pub fn from_bytes(bytes: &[u8], mime: &str) -> Self {
        Self {
            data_url: format!("data:{};base64,{}", mime, STANDARD.encode(bytes)),
            detail: ImageDetail::Low,
        }
    }

    pub fn jpeg(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes, "image/jpeg")
    }
}

/// A single message of a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub images: Vec<ImageAttachment>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.images.push(image);
        self
    }
}

/// Incremental pieces of a reply.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Configuration of a chat conversation. Adapted from `async_openai`'s request arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u16>,
}

impl ConversationConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u16) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

//TODO: when async fn in trait supports dyn dispatch, remove async_trait macro
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the messages and wait for the whole reply.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Send a single user prompt.
    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.chat(&[ChatMessage::user(prompt)]).await
    }

    /// Stream the reply. Models without streaming support yield the whole reply as one piece.
    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        let reply = self.chat(messages).await?;
        Ok(stream::once(async move { Ok(reply) }).boxed())
    }
}

#[cfg(test)]
mod test_llm {
    use super::{ChatMessage, ChatModel, ImageAttachment, Role};
    use anyhow::Result;
    use async_trait::async_trait;
    use futures::StreamExt;

    struct Shout;

    #[async_trait]
    impl ChatModel for Shout {
        async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
            Ok(messages.last().map(|m| m.content.to_uppercase()).unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_invoke_and_default_stream() {
        let model = Shout;
        assert_eq!("HELLO", model.invoke("hello").await.unwrap());
        let pieces: Vec<String> = model
            .chat_stream(&[ChatMessage::user("abc")])
            .await
            .unwrap()
            .map(|piece| piece.unwrap())
            .collect()
            .await;
        assert_eq!(vec!["ABC".to_string()], pieces);
    }

    #[test]
    fn test_image_data_url() {
        let image = ImageAttachment::jpeg(b"hi");
        assert_eq!("data:image/jpeg;base64,aGk=", image.data_url);
        let message = ChatMessage::user("describe").with_image(image);
        assert_eq!(Role::User, message.role);
        assert_eq!(1, message.images.len());
        assert_eq!("assistant", Role::Assistant.to_string());
    }
}

#[cfg(test)]
pub(crate) mod test_models {
    use std::sync::Mutex;
    use anyhow::Result;
    use async_trait::async_trait;
    use super::{ChatMessage, ChatModel};

    /// Answers with a closure over the request and keeps every request it saw.
    pub(crate) struct ScriptedModel<F> {
        reply: F,
        pub requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl<F: Fn(&[ChatMessage]) -> Result<String> + Send + Sync> ScriptedModel<F> {
        pub(crate) fn new(reply: F) -> Self {
            Self {
                reply,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub(crate) fn request(&self, idx: usize) -> Vec<ChatMessage> {
            self.requests.lock().unwrap()[idx].clone()
        }
    }

    #[async_trait]
    impl<F: Fn(&[ChatMessage]) -> Result<String> + Send + Sync> ChatModel for ScriptedModel<F> {
        async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
            self.requests.lock().unwrap().push(messages.to_vec());
            (self.reply)(messages)
        }
    }
}
