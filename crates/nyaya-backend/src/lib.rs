//! Outbound contract to the remote legal-inference backend.
//!
//! The backend is an external collaborator reached by a single HTTP POST;
//! this crate owns only the wire types, the [`LegalBackend`] trait seam, the
//! reqwest implementation, and a scripted double for tests.

pub mod http;
pub mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use nyaya_core::error::NyayaError;

pub use http::HttpBackend;
pub use scripted::ScriptedBackend;

/// Request body for the chat endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdviceRequest {
    /// Raw user text (topic prefix already applied by the caller).
    pub text: String,
}

impl AdviceRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Successful response body from the chat endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdviceReply {
    /// Assistant answer text.
    pub response: String,
    /// Server-side marker for a degraded/non-primary answer.
    #[serde(default)]
    pub is_fallback: bool,
}

/// Failures reaching or decoding the backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The transport failed before a status was received.
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered with a non-2xx status. The body is not inspected.
    #[error("backend returned status {0}")]
    Status(u16),
    /// A 2xx response body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<BackendError> for NyayaError {
    fn from(err: BackendError) -> Self {
        NyayaError::Backend(err.to_string())
    }
}

/// The remote inference backend, behind a seam so session logic can run
/// against a scripted double.
#[async_trait]
pub trait LegalBackend: Send + Sync {
    /// Issue one chat request and await its reply.
    async fn ask(&self, request: &AdviceRequest) -> Result<AdviceReply, BackendError>;
}

// =============================================================================
// Tests
// =============================================================================
