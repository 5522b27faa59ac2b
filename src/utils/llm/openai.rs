use anyhow::{anyhow, Result};
use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
                          ChatCompletionRequestMessageContentPart, ChatCompletionRequestMessageContentPartImageArgs,
                          ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
                          ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
                          CreateChatCompletionRequestArgs, ImageUrlArgs, ImageUrlDetail};
use async_trait::async_trait;
use futures::StreamExt;
use log::debug;

use crate::config::{Settings, DEEPSEEK_BASE_URL};
use crate::utils::llm::{ChatMessage, ChatModel, ConversationConfig, ImageDetail, Role, TextStream};

/// Chat model served by OpenAI or any server speaking its chat completions API (DeepSeek, Ollama, ...).
#[derive(Clone, Debug)]
pub struct OpenAIChat {
    pub client: Client<OpenAIConfig>,
    pub config: ConversationConfig,
}

impl OpenAIChat {
    pub fn new(api_key: impl Into<String>, config: ConversationConfig) -> Self {
        let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
        Self { client, config }
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>, config: ConversationConfig) -> Self {
        let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key).with_api_base(base_url));
        Self { client, config }
    }

    /// OpenAI, honouring `OPENAI_BASE_URL` when set.
    pub fn from_settings(settings: &Settings, config: ConversationConfig) -> Result<Self> {
        let api_key = settings.openai_api_key()?;
        Ok(match &settings.openai_base_url {
            Some(base_url) => Self::with_base_url(api_key, base_url.as_str(), config),
            None => Self::new(api_key, config),
        })
    }

    /// DeepSeek's OpenAI-compatible endpoint.
    pub fn deepseek(settings: &Settings, config: ConversationConfig) -> Result<Self> {
        Ok(Self::with_base_url(settings.deepseek_api_key()?, DEEPSEEK_BASE_URL, config))
    }

    /// A local Ollama server. Ollama ignores the API key.
    pub fn ollama(settings: &Settings, model: impl Into<String>) -> Self {
        Self::with_base_url("ollama", settings.ollama_base_url.as_str(), ConversationConfig::new(model))
    }

    fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
        let request_message: ChatCompletionRequestMessage = match message.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(message.content.as_str())
                .build()?
                .into(),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(message.content.as_str())
                .build()?
                .into(),
            Role::User if message.images.is_empty() => ChatCompletionRequestUserMessageArgs::default()
                .content(message.content.as_str())
                .build()?
                .into(),
            Role::User => {
                let mut parts = Vec::with_capacity(message.images.len() + 1);
                parts.push(ChatCompletionRequestMessageContentPart::Text(
                    ChatCompletionRequestMessageContentPartTextArgs::default()
                        .text(message.content.as_str())
                        .build()?
                ));
                for image in &message.images {
                    let detail = match image.detail {
                        ImageDetail::Auto => ImageUrlDetail::Auto,
                        ImageDetail::Low => ImageUrlDetail::Low,
                        ImageDetail::High => ImageUrlDetail::High,
                    };
                    let image_url = ImageUrlArgs::default()
                        .url(image.data_url.as_str())
                        .detail(detail)
                        .build()?;
                    parts.push(ChatCompletionRequestMessageContentPart::Image(
                        ChatCompletionRequestMessageContentPartImageArgs::default()
                            .image_url(image_url)
                            .build()?
                    ));
                }
                ChatCompletionRequestUserMessageArgs::default()
                    .content(parts)
                    .build()?
                    .into()
            }
        };
        Ok(request_message)
    }

    fn build_request(&self, messages: &[ChatMessage], stream: bool) -> Result<CreateChatCompletionRequest> {
        let messages = messages
            .iter()
            .map(Self::to_request_message)
            .collect::<Result<Vec<_>>>()?;
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.config.model.as_str()).messages(messages);
        if let Some(temperature) = self.config.temperature {
            args.temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            args.max_tokens(max_tokens);
        }
        if stream {
            args.stream(true);
        }
        Ok(args.build()?)
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = self.build_request(messages, false)?;
        debug!("sending {} messages to {}", messages.len(), self.config.model);
        let response = self.client.chat().create(request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("model {} returned no content", self.config.model))
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        let request = self.build_request(messages, true)?;
        debug!("streaming {} messages from {}", messages.len(), self.config.model);
        let stream = self.client.chat().create_stream(request).await?;
        Ok(stream
            .map(|chunk| -> Result<String> {
                let chunk = chunk?;
                Ok(chunk
                    .choices
                    .into_iter()
                    .filter_map(|choice| choice.delta.content)
                    .collect::<String>())
            })
            .boxed())
    }
}

#[cfg(test)]
mod test_openai {
    use super::OpenAIChat;
    use crate::utils::llm::{ChatMessage, ConversationConfig, ImageAttachment};

    #[test]
    fn test_build_request_keeps_order_and_options() {
        let model = OpenAIChat::new("sk-test", ConversationConfig::new("gpt-3.5-turbo").temperature(0.7).max_tokens(1000));
        let messages = vec![
            ChatMessage::system("You are an expert writer."),
            ChatMessage::user("Topic: rust"),
            ChatMessage::assistant("Outline"),
            ChatMessage::user("Describe").with_image(ImageAttachment::jpeg(b"img")),
        ];
        let request = model.build_request(&messages, false).unwrap();
        assert_eq!("gpt-3.5-turbo", request.model);
        assert_eq!(4, request.messages.len());
        assert_eq!(Some(0.7), request.temperature);
    }
}
