//! Prompt templates for narration script generation.
//!
//! Templates use `{name}` slots. A doubled brace (`{{` or `}}`) renders as a
//! literal brace.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Instruction sent with every deck by both entry points.
pub const DEFAULT_QUESTION: &str = "For each PowerPoint slide provided above, write a 3-4 minute script \
that effectively conveys the key points. Ensure a smooth flow between slides, \
maintaining a clear and engaging narrative.";

const SYSTEM_TEMPLATE: &str = "You are a highly skilled assistant. Your task is to create a script \
based on the context extracted from a PowerPoint presentation. \
Ensure clarity, engagement, and continuity in the script.";

const HUMAN_TEMPLATE: &str = "Based on the context provided below, write a detailed, engaging script for each slide. \
Ensure the narrative flows smoothly and connects the key points.\n\n\
### Context:\n```{context}```\n\n### Question:\n```{question}```\n\n### Script:";

/// Who a chat message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    System,
    Human,
    Assistant,
}

/// A rendered chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// A single message template with named slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    role: Role,
    template: String,
}

impl MessageTemplate {
    /// Create a template for the given role.
    pub fn new(role: Role, template: impl Into<String>) -> Self {
        Self {
            role,
            template: template.into(),
        }
    }

    /// The role the rendered message will carry.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The raw template text.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Slot names in order of first appearance.
    pub fn variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        for segment in parse_segments(&self.template) {
            if let Segment::Slot(name) = segment {
                if !names.iter().any(|n: &String| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    /// Render the template, substituting every slot from `values`.
    pub fn format(&self, values: &[(&str, &str)]) -> Result<ChatMessage> {
        let mut content = String::with_capacity(self.template.len());
        for segment in parse_segments(&self.template) {
            match segment {
                Segment::Literal(text) => content.push_str(text),
                Segment::Brace(c) => content.push(c),
                Segment::Slot(name) => {
                    let value = values
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| {
                            Error::InvalidInput(format!("missing value for prompt variable '{}'", name))
                        })?;
                    content.push_str(value);
                }
            }
        }
        Ok(ChatMessage {
            role: self.role,
            content,
        })
    }
}

/// Ordered list of message templates rendered together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPromptTemplate {
    messages: Vec<MessageTemplate>,
}

impl ChatPromptTemplate {
    /// Combine templates in the given order.
    pub fn from_messages(messages: Vec<MessageTemplate>) -> Self {
        Self { messages }
    }

    /// The component templates.
    pub fn messages(&self) -> &[MessageTemplate] {
        &self.messages
    }

    /// Every slot name across all messages.
    pub fn input_variables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for message in &self.messages {
            for name in message.variables() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Render every message.
    pub fn format_messages(&self, values: &[(&str, &str)]) -> Result<Vec<ChatMessage>> {
        self.messages.iter().map(|m| m.format(values)).collect()
    }
}

/// The assistant role instruction.
pub fn system_prompt() -> MessageTemplate {
    MessageTemplate::new(Role::System, SYSTEM_TEMPLATE)
}

/// The per-request instruction with `context` and `question` slots.
pub fn human_prompt() -> MessageTemplate {
    MessageTemplate::new(Role::Human, HUMAN_TEMPLATE)
}

/// System prompt followed by human prompt.
pub fn chat_prompt() -> ChatPromptTemplate {
    ChatPromptTemplate::from_messages(vec![system_prompt(), human_prompt()])
}

enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Slot(&'a str),
}

/// Split a template into literal text, escaped braces and slots.
///
/// An unmatched `{` is kept as literal text.
fn parse_segments(template: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let bytes = template.as_bytes();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                if start < i {
                    segments.push(Segment::Literal(&template[start..i]));
                }
                segments.push(Segment::Brace(bytes[i] as char));
                i += 2;
                start = i;
            }
            b'{' => match template[i + 1..].find('}') {
                Some(len) if is_identifier(&template[i + 1..i + 1 + len]) => {
                    if start < i {
                        segments.push(Segment::Literal(&template[start..i]));
                    }
                    segments.push(Segment::Slot(&template[i + 1..i + 1 + len]));
                    i += len + 2;
                    start = i;
                }
                _ => i += 1,
            },
            _ => i += 1,
        }
    }

    if start < bytes.len() {
        segments.push(Segment::Literal(&template[start..]));
    }
    segments
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
