//! Core types, context building, prompts, and script generation for turning
//! PowerPoint decks into narration scripts.

pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod generator;
pub mod normalize;
pub mod prompt;
pub mod types;

pub use config::{Config, ModelSettings, DEFAULT_MODEL_NAME, DEFAULT_TEMPERATURE, SUPPORTED_MODELS};
pub use context::{build_context, build_context_from_value, ContextBuild, SkipReason, SkippedEntry};
pub use error::{Error, Result};
pub use extract::{ContentExtractor, DocumentLoader};
pub use generator::{ChatModel, ScriptGenerator, StrOutputParser};
pub use normalize::TextCleaner;
pub use prompt::{ChatMessage, ChatPromptTemplate, MessageTemplate, Role, DEFAULT_QUESTION};
pub use types::{Element, ElementCategory, LoadMode, PresentationFormat, SlideContentMap};
