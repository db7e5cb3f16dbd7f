//! Speech-recognition capability abstraction.
//!
//! Models one single-utterance engine session as an ordered sequence of
//! [`RecognitionEvent`]s, so session logic can be driven deterministically by
//! a scripted adapter instead of a live engine.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

/// Engine-reported failure reasons, mapped from the engine's fixed
/// error vocabulary.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionErrorReason {
    /// Engine needs network connectivity and has none.
    #[error("network")]
    Network,
    /// Microphone permission denied.
    #[error("not-allowed")]
    NotAllowed,
    /// No capture device, or the device is busy.
    #[error("audio-capture")]
    AudioCapture,
    /// The session ended without detecting speech.
    #[error("no-speech")]
    NoSpeech,
    /// Any other engine error.
    #[error("{0}")]
    Other(String),
}

/// One engine callback within a recognition session, in delivery order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// The engine began listening.
    Started,
    /// A finalized transcript (first alternative of the first result).
    Transcript(String),
    /// The engine reported an error; the session is over.
    Error(RecognitionErrorReason),
    /// The session ended (success, silence, or after an error).
    Ended,
}

/// The contract requested from the engine for one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognitionSettings {
    /// BCP 47 locale tag for the session.
    pub locale: String,
    /// Keep listening across utterances. Always false here.
    pub continuous: bool,
    /// Deliver partial hypotheses. Always false here.
    pub interim_results: bool,
    /// Number of alternatives to return per result.
    pub max_alternatives: u8,
}

impl RecognitionSettings {
    /// Settings for one single-utterance, non-interim session.
    pub fn single_utterance(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            continuous: false,
            interim_results: false,
            max_alternatives: 1,
        }
    }
}

/// A platform speech-recognition engine.
///
/// `recognize` runs one engine session and returns its callbacks in order.
/// Implementations that buffer a live engine's callbacks and ones that
/// replay a script look identical to callers.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Whether the capability exists on this platform.
    fn is_available(&self) -> bool;

    /// Run one single-utterance session and return its events in order.
    async fn recognize(&self, settings: &RecognitionSettings) -> Vec<RecognitionEvent>;

    /// Best-effort request to end an active session early.
    fn request_stop(&self);
}

/// Recognizer for platforms without a speech-recognition engine.
#[derive(Debug, Default)]
pub struct UnavailableRecognizer;

#[async_trait]
impl SpeechRecognizer for UnavailableRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    async fn recognize(&self, _settings: &RecognitionSettings) -> Vec<RecognitionEvent> {
        Vec::new()
    }

    fn request_stop(&self) {}
}

/// Scripted recognizer replaying preloaded event sequences.
///
/// Each call to `recognize` consumes the next scripted session. With the
/// script exhausted, a session that starts and ends in silence is returned.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    sessions: Mutex<VecDeque<Vec<RecognitionEvent>>>,
    stop_requests: AtomicUsize,
    last_settings: Mutex<Option<RecognitionSettings>>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one scripted session.
    pub fn push_session(&self, events: Vec<RecognitionEvent>) {
        self.sessions
            .lock()
            .expect("script mutex poisoned")
            .push_back(events);
    }

    /// Convenience: a session that starts, finalizes `transcript`, and ends.
    pub fn push_transcript(&self, transcript: impl Into<String>) {
        self.push_session(vec![
            RecognitionEvent::Started,
            RecognitionEvent::Transcript(transcript.into()),
            RecognitionEvent::Ended,
        ]);
    }

    /// Convenience: a session that starts, errors with `reason`, and ends.
    pub fn push_error(&self, reason: RecognitionErrorReason) {
        self.push_session(vec![
            RecognitionEvent::Started,
            RecognitionEvent::Error(reason),
            RecognitionEvent::Ended,
        ]);
    }

    /// How many times `request_stop` was called.
    pub fn stop_requests(&self) -> usize {
        self.stop_requests.load(Ordering::SeqCst)
    }

    /// The settings passed to the most recent `recognize` call.
    pub fn last_settings(&self) -> Option<RecognitionSettings> {
        self.last_settings
            .lock()
            .expect("settings mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    fn is_available(&self) -> bool {
        true
    }

    async fn recognize(&self, settings: &RecognitionSettings) -> Vec<RecognitionEvent> {
        *self
            .last_settings
            .lock()
            .expect("settings mutex poisoned") = Some(settings.clone());

        let next = self
            .sessions
            .lock()
            .expect("script mutex poisoned")
            .pop_front();

        match next {
            Some(events) => events,
            None => {
                tracing::debug!("Recognition script exhausted; returning silent session");
                vec![RecognitionEvent::Started, RecognitionEvent::Ended]
            }
        }
    }

    fn request_stop(&self) {
        self.stop_requests.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Tests
// =============================================================================
