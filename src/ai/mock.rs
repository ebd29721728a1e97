use super::{CompletionService, PromptMessage};
use crate::ai::openai::classify_failure;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Status(StatusCode),
    NotConfigured,
    MissingContent,
}

/// Scripted [`CompletionService`] that records what it was asked.
///
/// Replies cycle in insertion order; with no scripted replies it answers with
/// a minimal valid analysis. Clones share their script and history.
#[derive(Clone)]
pub struct MockCompletionClient {
    replies: Arc<Mutex<Vec<MockReply>>>,
    received: Arc<Mutex<Vec<Vec<PromptMessage>>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockCompletionClient {
    pub const DEFAULT_REPLY: &'static str =
        r#"{"plantName": "Unknown plant", "confidence": 0.1}"#;

    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            received: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push(MockReply::Text(reply.into()))
    }

    /// Fails the call as if the gateway answered with `status`.
    pub fn with_status(self, status: u16) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.push(MockReply::Status(status))
    }

    pub fn with_missing_key(self) -> Self {
        self.push(MockReply::NotConfigured)
    }

    pub fn with_missing_content(self) -> Self {
        self.push(MockReply::MissingContent)
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Messages passed to the most recent call.
    pub fn last_messages(&self) -> Option<Vec<PromptMessage>> {
        self.received.lock().unwrap().last().cloned()
    }

    fn push(self, reply: MockReply) -> Self {
        self.replies.lock().unwrap().push(reply);
        self
    }
}

impl Default for MockCompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionService for MockCompletionClient {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String> {
        let count = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };
        self.received.lock().unwrap().push(messages.to_vec());

        let reply = {
            let replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                MockReply::Text(Self::DEFAULT_REPLY.to_string())
            } else {
                replies[(count - 1) % replies.len()].clone()
            }
        };

        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Status(status) => Err(classify_failure(status)),
            MockReply::NotConfigured => Err(Error::NotConfigured),
            MockReply::MissingContent => Err(Error::MalformedUpstreamResponse(
                "completion has no message content".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Role;

    #[tokio::test]
    async fn test_mock_default_reply() {
        let client = MockCompletionClient::new();
        let reply = client.complete(&[]).await.unwrap();
        assert_eq!(reply, MockCompletionClient::DEFAULT_REPLY);
    }

    #[tokio::test]
    async fn test_mock_custom_replies_cycle() {
        let client = MockCompletionClient::new()
            .with_reply("first")
            .with_reply("second");

        assert_eq!(client.complete(&[]).await.unwrap(), "first");
        assert_eq!(client.complete(&[]).await.unwrap(), "second");
        // Should cycle back
        assert_eq!(client.complete(&[]).await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_mock_status_failures() {
        let client = MockCompletionClient::new()
            .with_status(429)
            .with_status(402)
            .with_status(500);

        assert!(matches!(client.complete(&[]).await, Err(Error::RateLimited)));
        assert!(matches!(client.complete(&[]).await, Err(Error::QuotaExceeded)));
        assert!(matches!(
            client.complete(&[]).await,
            Err(Error::Upstream { status: 500 })
        ));
    }

    #[tokio::test]
    async fn test_mock_records_messages_and_calls() {
        let client = MockCompletionClient::new();
        assert_eq!(client.get_call_count(), 0);
        assert!(client.last_messages().is_none());

        let messages = vec![PromptMessage::text(Role::System, "hello")];
        client.complete(&messages).await.unwrap();

        assert_eq!(client.get_call_count(), 1);
        assert_eq!(client.last_messages(), Some(messages));
    }
}
