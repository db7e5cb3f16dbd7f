//! Conversation session manager for Nyaya.
//!
//! Owns the ordered message log, the in-flight request state, the one-shot
//! legal-topic context, the speech input/output flags, and the last
//! user-visible speech error. Mediates between user input, the remote chat
//! endpoint, and the two injected speech capabilities.

pub mod citation;
pub mod error;
pub mod session;
pub mod state;
pub mod topics;

pub use citation::{highlight_spans, HighlightSpan, SpanKind};
pub use error::ChatError;
pub use session::{ConversationSession, MessageOrigin, SessionConfig, FALLBACK_TEXT};
pub use state::{ListenState, ProcessingState};
pub use topics::{compose_topic_input, suggested_questions, LEGAL_TOPICS, STARTER_QUESTIONS};
