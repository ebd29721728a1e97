use super::client::OpenAiHttpClient;
use super::types::{ChatCompletionRequest, ChatMessage};
use crate::ai::{CompletionService, PromptMessage};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Multimodal completion client for an OpenAI-compatible chat endpoint.
pub struct OpenAiCompletionClient {
    http: OpenAiHttpClient,
    model: String,
}

impl OpenAiCompletionClient {
    pub fn new(api_key: Option<String>, base_url: String, model: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, base_url, model, timeout, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: Option<String>,
        base_url: String,
        model: String,
        timeout: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: OpenAiHttpClient::new_with_client(api_key, base_url, timeout, client),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletionClient {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages.iter().map(ChatMessage::from).collect(),
        };

        tracing::debug!(
            "Sending chat completion request ({} messages, model {})",
            request.messages.len(),
            self.model
        );
        let response = self.http.chat_completion(&request).await?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            Error::MalformedUpstreamResponse("no choices in completion".to_string())
        })?;
        if let Some(reason) = &choice.finish_reason {
            tracing::debug!("Completion finished: {}", reason);
        }

        choice
            .message
            .and_then(|message| message.content)
            .and_then(|content| content.into_text())
            .ok_or_else(|| {
                Error::MalformedUpstreamResponse("completion has no message content".to_string())
            })
    }
}
