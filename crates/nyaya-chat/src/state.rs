//! Session state machines with validated transitions.
//!
//! The outbound-request lifecycle:
//! - Idle -> InFlight (send issued)
//! - InFlight -> Idle (response or failure)
//!
//! The recognition lifecycle:
//! - Idle -> Active (engine session started)
//! - Active -> Idle (engine end, engine error, or stop request)
//!
//! No other transitions exist; neither machine can be forced elsewhere.

use std::fmt;

/// Outbound chat request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingState {
    /// No request outstanding. Ready to send.
    Idle,
    /// Exactly one request awaiting a response.
    InFlight,
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingState::Idle => write!(f, "Idle"),
            ProcessingState::InFlight => write!(f, "InFlight"),
        }
    }
}

impl ProcessingState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &ProcessingState) -> bool {
        matches!(
            (self, target),
            (ProcessingState::Idle, ProcessingState::InFlight)
                | (ProcessingState::InFlight, ProcessingState::Idle)
        )
    }
}

/// Speech-recognition session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenState {
    /// No recognition session running.
    Idle,
    /// An engine session is live.
    Active,
}

impl fmt::Display for ListenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenState::Idle => write!(f, "Idle"),
            ListenState::Active => write!(f, "Active"),
        }
    }
}

impl ListenState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &ListenState) -> bool {
        matches!(
            (self, target),
            (ListenState::Idle, ListenState::Active)
                | (ListenState::Active, ListenState::Idle)
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
