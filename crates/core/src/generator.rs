//! Script generation: prompt formatting, model call, text extraction.

use crate::prompt::{chat_prompt, ChatMessage, ChatPromptTemplate};
use crate::{Config, Error, ModelSettings, Result};
use std::sync::Arc;

/// A remote chat-completion service.
///
/// Implementations make exactly one request per call and keep no
/// conversation state between calls.
pub trait ChatModel {
    /// Send the rendered messages and return the assistant's reply.
    fn generate(&self, messages: &[ChatMessage], settings: &ModelSettings) -> Result<ChatMessage>;
}

impl<M: ChatModel + ?Sized> ChatModel for &M {
    fn generate(&self, messages: &[ChatMessage], settings: &ModelSettings) -> Result<ChatMessage> {
        (**self).generate(messages, settings)
    }
}

impl<M: ChatModel + ?Sized> ChatModel for Arc<M> {
    fn generate(&self, messages: &[ChatMessage], settings: &ModelSettings) -> Result<ChatMessage> {
        (**self).generate(messages, settings)
    }
}

impl<M: ChatModel + ?Sized> ChatModel for Box<M> {
    fn generate(&self, messages: &[ChatMessage], settings: &ModelSettings) -> Result<ChatMessage> {
        (**self).generate(messages, settings)
    }
}

/// Pulls plain text out of a model reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrOutputParser;

impl StrOutputParser {
    /// Return the reply content unchanged. A blank reply is an error.
    pub fn parse(&self, message: ChatMessage) -> Result<String> {
        if message.content.trim().is_empty() {
            return Err(Error::Generation("model returned an empty completion".to_string()));
        }
        Ok(message.content)
    }
}

/// The prompt, model and parser wired into one pipeline.
pub struct ScriptGenerator<M> {
    prompt: ChatPromptTemplate,
    model: M,
    settings: ModelSettings,
    parser: StrOutputParser,
}

impl<M: ChatModel> ScriptGenerator<M> {
    /// Bind a model to the configured model name and temperature.
    ///
    /// Nothing is sent over the network here.
    pub fn new(model: M, config: &Config) -> Self {
        Self {
            prompt: chat_prompt(),
            model,
            settings: config.model_settings(),
            parser: StrOutputParser,
        }
    }

    /// Settings every request is sent with.
    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Generate a script for `context` answering `question`.
    ///
    /// Any failure along the way is reported as [`Error::Generation`].
    pub fn generate_script(&self, context: &str, question: &str) -> Result<String> {
        self.run(context, question).map_err(|e| match e {
            Error::Generation(msg) => Error::Generation(msg),
            other => Error::Generation(other.to_string()),
        })
    }

    fn run(&self, context: &str, question: &str) -> Result<String> {
        let messages = self
            .prompt
            .format_messages(&[("context", context), ("question", question)])?;
        log::debug!(
            "Requesting script from {} (temperature {})",
            self.settings.model,
            self.settings.temperature
        );
        let reply = self.model.generate(&messages, &self.settings)?;
        self.parser.parse(reply)
    }
}
