//! Error types for the conversation session.

/// Errors returned to callers of the session manager.
///
/// Speech-subsystem failures are never surfaced here; they land in the
/// session's user-visible error slot instead.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("a request is already in flight")]
    Busy,
}
