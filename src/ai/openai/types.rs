//! OpenAI-compatible chat-completion payloads.

use crate::ai::{ContentBlock, PromptMessage};
use serde::{Deserialize, Serialize};

/// Request body for chat completions.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Message content union.
///
/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatMessageContent {
    Text(String),
    Parts(Vec<MessagePart>),
}

/// One content segment in multipart message input.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<ImageUrl>,
}

/// Image URL wrapper; carries either a `data:` URI or a remote URL.
#[derive(Debug, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Chat message object.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ChatMessageContent>,
}

impl From<&PromptMessage> for ChatMessage {
    fn from(message: &PromptMessage) -> Self {
        let content = match message.content.as_slice() {
            [ContentBlock::Text(text)] => ChatMessageContent::Text(text.clone()),
            blocks => ChatMessageContent::Parts(blocks.iter().map(MessagePart::from).collect()),
        };

        Self {
            role: message.role.as_str().to_string(),
            content: Some(content),
        }
    }
}

impl From<&ContentBlock> for MessagePart {
    fn from(block: &ContentBlock) -> Self {
        match block {
            ContentBlock::Text(text) => Self {
                part_type: "text".to_string(),
                text: Some(text.clone()),
                image_url: None,
            },
            ContentBlock::ImageUrl(url) => Self {
                part_type: "image_url".to_string(),
                text: None,
                image_url: Some(ImageUrl { url: url.clone() }),
            },
        }
    }
}

impl ChatMessageContent {
    /// Plain text of the content; multipart replies have their text parts
    /// concatenated. `None` when there is no text at all.
    pub fn into_text(self) -> Option<String> {
        match self {
            ChatMessageContent::Text(text) => Some(text),
            ChatMessageContent::Parts(parts) => {
                let texts: Vec<String> = parts.into_iter().filter_map(|p| p.text).collect();
                if texts.is_empty() {
                    None
                } else {
                    Some(texts.concat())
                }
            }
        }
    }
}

/// Top-level chat completion response.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// Single choice item returned by chat completions.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: Option<ChatMessage>,
    pub finish_reason: Option<String>,
}
