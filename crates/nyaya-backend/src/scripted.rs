//! Scripted backend double for deterministic session tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{AdviceReply, AdviceRequest, BackendError, LegalBackend};

/// In-memory backend replaying a queue of canned results.
///
/// An optional gate holds each `ask` until released, so tests can observe
/// the in-flight window of a send.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<AdviceReply, BackendError>>>,
    requests: Mutex<Vec<AdviceRequest>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scripted backend whose `ask` blocks until `gate` is notified.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Queue a successful reply.
    pub fn push_reply(&self, response: impl Into<String>, is_fallback: bool) {
        self.replies
            .lock()
            .expect("replies mutex poisoned")
            .push_back(Ok(AdviceReply {
                response: response.into(),
                is_fallback,
            }));
    }

    /// Queue a failure.
    pub fn push_failure(&self, error: BackendError) {
        self.replies
            .lock()
            .expect("replies mutex poisoned")
            .push_back(Err(error));
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<AdviceRequest> {
        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl LegalBackend for ScriptedBackend {
    async fn ask(&self, request: &AdviceRequest) -> Result<AdviceReply, BackendError> {
        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .push(request.clone());

        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }

        self.replies
            .lock()
            .expect("replies mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(BackendError::Transport(
                    "scripted backend exhausted".to_string(),
                ))
            })
    }
}

// =============================================================================
// Tests
// =============================================================================
