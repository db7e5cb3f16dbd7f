//! Reqwest implementation of the backend contract.

use async_trait::async_trait;
use reqwest::Client;

use crate::{AdviceReply, AdviceRequest, BackendError, LegalBackend};

/// HTTP client for the remote chat endpoint.
///
/// One POST per request, JSON both ways. No per-request timeout is set: the
/// call resolves whenever the underlying transport resolves or errors.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    endpoint: String,
}

impl HttpBackend {
    /// Create a backend client for the given chat endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// The configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LegalBackend for HttpBackend {
    async fn ask(&self, request: &AdviceRequest) -> Result<AdviceReply, BackendError> {
        tracing::debug!(endpoint = %self.endpoint, text_len = request.text.len(), "Sending chat request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Chat request rejected");
            return Err(BackendError::Status(status.as_u16()));
        }

        let reply: AdviceReply = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        tracing::debug!(
            response_len = reply.response.len(),
            is_fallback = reply.is_fallback,
            "Chat reply received"
        );
        Ok(reply)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_keeps_endpoint() {
        let backend = HttpBackend::new("http://localhost:8080/api/chat");
        assert_eq!(backend.endpoint(), "http://localhost:8080/api/chat");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Nothing listens on this port; the connect fails before any status.
        let backend = HttpBackend::new("http://127.0.0.1:1/api/chat");
        let result = backend.ask(&AdviceRequest::new("hello")).await;
        match result {
            Err(BackendError::Transport(_)) => {}
            other => panic!("expected transport error, got {:?}", other.map(|r| r.response)),
        }
    }
}
