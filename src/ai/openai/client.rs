use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::{Error, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Upstream statuses that carry their own meaning for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpstreamFailure {
    RateLimited,
    QuotaExceeded,
}

const STATUS_TABLE: &[(StatusCode, UpstreamFailure)] = &[
    (StatusCode::TOO_MANY_REQUESTS, UpstreamFailure::RateLimited),
    (StatusCode::PAYMENT_REQUIRED, UpstreamFailure::QuotaExceeded),
];

/// Maps a non-success upstream status to an error; anything not in the table
/// is a generic upstream failure.
pub fn classify_failure(status: StatusCode) -> Error {
    match STATUS_TABLE.iter().find(|(code, _)| *code == status) {
        Some((_, UpstreamFailure::RateLimited)) => Error::RateLimited,
        Some((_, UpstreamFailure::QuotaExceeded)) => Error::QuotaExceeded,
        None => Error::Upstream {
            status: status.as_u16(),
        },
    }
}

/// Bearer-authenticated client for an OpenAI-compatible gateway.
pub struct OpenAiHttpClient {
    pub(crate) client: Client,
    pub(crate) api_key: Option<String>,
    pub(crate) base_url: String,
    timeout: Duration,
}

impl OpenAiHttpClient {
    pub fn new_with_client(
        api_key: Option<String>,
        base_url: String,
        timeout: Duration,
        client: Client,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            tracing::error!("AI gateway API key not configured");
            Error::NotConfigured
        })?;

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to AI gateway: {}", e);
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("AI gateway error (status {}): {}", status, error_text);
            return Err(classify_failure(status));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse AI gateway response: {}\nBody: {}", e, body);
            Error::MalformedUpstreamResponse(format!("invalid completion payload: {}", e))
        })
    }

    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        self.post(CHAT_COMPLETIONS_PATH, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rate_limit() {
        assert!(matches!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS),
            Error::RateLimited
        ));
    }

    #[test]
    fn test_classify_quota() {
        assert!(matches!(
            classify_failure(StatusCode::PAYMENT_REQUIRED),
            Error::QuotaExceeded
        ));
    }

    #[test]
    fn test_classify_everything_else_as_upstream() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            match classify_failure(status) {
                Error::Upstream { status: code } => assert_eq!(code, status.as_u16()),
                other => panic!("unexpected classification for {}: {:?}", status, other),
            }
        }
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_sending() {
        // Unroutable base URL: reaching the network would surface as Error::Http.
        let http = OpenAiHttpClient::new_with_client(
            None,
            "http://127.0.0.1:1".to_string(),
            Duration::from_secs(1),
            Client::new(),
        );
        let request = ChatCompletionRequest {
            model: "m".to_string(),
            messages: Vec::new(),
        };

        let err = http.chat_completion(&request).await.unwrap_err();
        assert!(matches!(err, Error::NotConfigured));
    }
}
