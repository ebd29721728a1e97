//! AI service integration for plant analysis
//!
//! Provides the provider-neutral prompt representation and the trait the
//! analyzer calls to obtain a completion from a multimodal model.

pub mod mime;
pub mod mock;
pub mod openai;

pub use mock::MockCompletionClient;
pub use openai::OpenAiCompletionClient;

use crate::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

/// One piece of message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Text(String),
    /// `data:` URI or remote URL of an image.
    ImageUrl(String),
}

/// A role-tagged message, built fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl PromptMessage {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentBlock::Text(text.into())],
        }
    }
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends the messages in a single attempt and returns the model's raw reply
    /// text. Never retries.
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String>;
}
