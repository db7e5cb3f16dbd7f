//! The conversation session manager.
//!
//! An explicitly constructed session object: callers hold it behind an
//! `Arc` and every UI layer talks to the same instance. All state lives in
//! one lock-scoped container; suspension points (the outbound request, an
//! utterance playing) never hold the lock.

use std::sync::{Arc, Mutex, MutexGuard};

use nyaya_backend::{AdviceRequest, LegalBackend};
use nyaya_core::config::NyayaConfig;
use nyaya_core::types::Message;
use nyaya_speech::language::detect_locale;
use nyaya_speech::recognition::{
    RecognitionErrorReason, RecognitionEvent, RecognitionSettings, SpeechRecognizer,
};
use nyaya_speech::synthesis::{
    select_voice, SpeechSynthesizer, SynthesisErrorReason, SynthesisEvent, Utterance,
};

use crate::error::ChatError;
use crate::state::{ListenState, ProcessingState};
use crate::topics::compose_topic_input;

/// Assistant text substituted when the backend is unreachable or errors.
pub const FALLBACK_TEXT: &str = "Service temporarily unavailable. For legal advice in India:\n\n\u{2022} Visit https://nalsa.gov.in\n\u{2022} Contact a local attorney";

// Fixed user-facing strings for speech-subsystem failures. One string per
// engine reason; send failures never land here.
const ERR_RECOGNITION_NETWORK: &str = "Network connection required for speech recognition";
const ERR_RECOGNITION_NOT_ALLOWED: &str = "Please allow microphone access in your device settings";
const ERR_RECOGNITION_AUDIO_CAPTURE: &str = "No microphone detected or microphone is busy";
const ERR_RECOGNITION_NO_SPEECH: &str = "No speech was detected";
const ERR_RECOGNITION_UNSUPPORTED: &str = "Speech recognition is not supported on this device";
const ERR_RECOGNITION_FAILED: &str = "Speech recognition failed. Please try again.";
const ERR_VOICE_OUTPUT_FAILED: &str = "Voice output failed. Please try again.";

/// Where an outgoing message came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageOrigin {
    /// Typed into the input box.
    Typed,
    /// A finalized speech-recognition transcript.
    Voice,
}

/// Session-level settings resolved at construction.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Recognition locale for voice input.
    pub locale: String,
    /// Whether voice output starts enabled.
    pub voice_output_enabled: bool,
    /// Synthesis prosody.
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            locale: "en-IN".to_string(),
            voice_output_enabled: true,
            rate: 0.95,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

impl From<&NyayaConfig> for SessionConfig {
    fn from(config: &NyayaConfig) -> Self {
        Self {
            locale: config.recognition.locale.clone(),
            voice_output_enabled: config.synthesis.voice_output_enabled,
            rate: config.synthesis.rate,
            pitch: config.synthesis.pitch,
            volume: config.synthesis.volume,
        }
    }
}

/// Everything the session mutates, behind one lock.
#[derive(Debug)]
struct SessionState {
    /// Append-only during a session; emptied only by `clear_messages`.
    messages: Vec<Message>,
    processing: ProcessingState,
    listening: ListenState,
    speaking: bool,
    voice_output_enabled: bool,
    /// One-shot topic context, consumed by the next composed input.
    active_topic: Option<String>,
    /// Last user-visible speech-subsystem error.
    error: Option<String>,
}

/// The conversation session manager.
///
/// Mediates between user input, the remote chat endpoint, and the two
/// injected speech capabilities. Methods take `&self`; share the session
/// with `Arc`.
pub struct ConversationSession {
    state: Mutex<SessionState>,
    backend: Arc<dyn LegalBackend>,
    recognizer: Arc<dyn SpeechRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    config: SessionConfig,
}

impl ConversationSession {
    /// Create a session with injected collaborators.
    pub fn new(
        backend: Arc<dyn LegalBackend>,
        recognizer: Arc<dyn SpeechRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: SessionConfig,
    ) -> Self {
        let voice_output_enabled = config.voice_output_enabled;
        Self {
            state: Mutex::new(SessionState {
                messages: Vec::new(),
                processing: ProcessingState::Idle,
                listening: ListenState::Idle,
                speaking: false,
                voice_output_enabled,
                active_topic: None,
                error: None,
            }),
            backend,
            recognizer,
            synthesizer,
            config,
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().expect("session state mutex poisoned")
    }

    // -- Observers --

    /// A snapshot of the message log, in insertion order.
    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub fn is_processing(&self) -> bool {
        self.state().processing == ProcessingState::InFlight
    }

    pub fn is_listening(&self) -> bool {
        self.state().listening == ListenState::Active
    }

    pub fn is_speaking(&self) -> bool {
        self.state().speaking
    }

    pub fn is_voice_output_enabled(&self) -> bool {
        self.state().voice_output_enabled
    }

    /// Last user-visible speech-subsystem error, if any.
    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn active_topic(&self) -> Option<String> {
        self.state().active_topic.clone()
    }

    // -- Topic context --

    /// Set (or clear) the one-shot topic context for the next message.
    pub fn set_topic(&self, topic: Option<String>) {
        self.state().active_topic = topic;
    }

    /// Atomically take the topic context, leaving it absent.
    pub fn take_topic(&self) -> Option<String> {
        self.state().active_topic.take()
    }

    /// Apply the one-shot topic prefix to `input`, consuming the topic.
    ///
    /// Callers compose before sending, so the send path never sees topic
    /// state.
    pub fn compose_input(&self, input: &str) -> String {
        match self.take_topic() {
            Some(topic) => compose_topic_input(&topic, input),
            None => input.to_string(),
        }
    }

    // -- Sending --

    /// Send one message to the backend and append both turns to the log.
    ///
    /// The user turn is appended optimistically before the request is
    /// issued. On success the assistant turn carries the server's fallback
    /// marker; on any transport or status failure a fixed legal-aid fallback
    /// turn is appended instead and the failure is not surfaced as an error
    /// string. A send while another is in flight is rejected with
    /// [`ChatError::Busy`].
    pub async fn send_message(
        &self,
        text: &str,
        origin: MessageOrigin,
    ) -> Result<(), ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        {
            let mut state = self.state();
            if state.processing == ProcessingState::InFlight {
                return Err(ChatError::Busy);
            }
            transition_processing(&mut state, ProcessingState::InFlight);
            state.messages.push(Message::user(text));
            state.error = None;
        }

        tracing::info!(origin = ?origin, text_len = text.len(), "Sending message");
        let result = self.backend.ask(&AdviceRequest::new(text)).await;

        let (reply, voice_enabled) = {
            let mut state = self.state();
            let reply = match result {
                Ok(reply) => {
                    state
                        .messages
                        .push(Message::assistant(reply.response.clone(), reply.is_fallback));
                    Some(reply)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Chat request failed; substituting fallback");
                    state.messages.push(Message::fallback(FALLBACK_TEXT));
                    None
                }
            };
            transition_processing(&mut state, ProcessingState::Idle);
            (reply, state.voice_output_enabled)
        };

        if let Some(reply) = reply {
            if voice_enabled || origin == MessageOrigin::Voice {
                self.speak(&reply.response, text).await;
            }
        }

        Ok(())
    }

    // -- Voice input --

    /// Run one single-utterance recognition session.
    ///
    /// Failures surface through the session's error slot, never as a return
    /// value. A finalized non-empty transcript feeds the normal send path
    /// with the voice-origin flag set.
    pub async fn start_listening(&self) {
        if !self.recognizer.is_available() {
            tracing::warn!("Speech recognition unavailable on this device");
            self.state().error = Some(ERR_RECOGNITION_UNSUPPORTED.to_string());
            return;
        }

        let settings = RecognitionSettings::single_utterance(self.config.locale.clone());
        tracing::info!(locale = %settings.locale, "Starting recognition session");
        let events = self.recognizer.recognize(&settings).await;
        for event in events {
            self.apply_recognition_event(event).await;
        }
    }

    /// Best-effort request to end an active recognition session.
    ///
    /// The listening flag drops immediately; the engine may take longer to
    /// actually stop.
    pub fn stop_listening(&self) {
        self.recognizer.request_stop();
        let mut state = self.state();
        if state.listening == ListenState::Active {
            transition_listening(&mut state, ListenState::Idle);
        }
    }

    /// Apply one recognition-engine callback to the session.
    ///
    /// Public so tests and streaming adapters can drive the state machine
    /// without an engine.
    pub async fn apply_recognition_event(&self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Started => {
                let mut state = self.state();
                if state.listening == ListenState::Idle {
                    transition_listening(&mut state, ListenState::Active);
                }
                state.error = None;
            }
            RecognitionEvent::Transcript(transcript) => {
                if transcript.trim().is_empty() {
                    return;
                }
                if let Err(e) = self.send_message(&transcript, MessageOrigin::Voice).await {
                    tracing::warn!(error = %e, "Voice transcript was not sent");
                }
            }
            RecognitionEvent::Error(reason) => {
                tracing::warn!(reason = %reason, "Speech recognition error");
                let mut state = self.state();
                if state.listening == ListenState::Active {
                    transition_listening(&mut state, ListenState::Idle);
                }
                state.error = Some(recognition_error_message(&reason).to_string());
            }
            RecognitionEvent::Ended => {
                let mut state = self.state();
                if state.listening == ListenState::Active {
                    transition_listening(&mut state, ListenState::Idle);
                }
            }
        }
    }

    // -- Voice output --

    /// Flip the voice-output toggle, cancelling playback when disabling.
    ///
    /// Returns the new setting.
    pub fn toggle_voice_output(&self) -> bool {
        let mut state = self.state();
        state.voice_output_enabled = !state.voice_output_enabled;
        let enabled = state.voice_output_enabled;
        if !enabled {
            self.synthesizer.cancel();
            state.speaking = false;
        }
        tracing::debug!(enabled, "Voice output toggled");
        enabled
    }

    /// Speak `text`, choosing the voice from the script of `source_text`.
    ///
    /// No-op when voice output is disabled or the capability is absent. Any
    /// playing utterance is cancelled first.
    pub(crate) async fn speak(&self, text: &str, source_text: &str) {
        if !self.state().voice_output_enabled {
            return;
        }
        if !self.synthesizer.is_available() {
            return;
        }

        // At most one concurrent utterance.
        self.synthesizer.cancel();
        self.state().speaking = false;

        let basis = if source_text.trim().is_empty() {
            text
        } else {
            source_text
        };
        let locale = detect_locale(basis);

        let mut utterance = Utterance::new(text, locale.tag());
        utterance.voice = select_voice(locale.tag(), &self.synthesizer.voices());
        utterance.rate = self.config.rate;
        utterance.pitch = self.config.pitch;
        utterance.volume = self.config.volume;

        tracing::debug!(
            locale = %locale,
            voice = utterance.voice.as_ref().map(|v| v.name.as_str()).unwrap_or("default"),
            "Speaking response"
        );

        let events = self.synthesizer.speak(&utterance).await;
        for event in events {
            self.apply_synthesis_event(event);
        }
    }

    /// Apply one synthesis-engine callback to the session.
    ///
    /// An interruption is the manager's own cancel-then-restart and is
    /// swallowed; other errors surface the generic voice-output failure.
    pub fn apply_synthesis_event(&self, event: SynthesisEvent) {
        let mut state = self.state();
        match event {
            SynthesisEvent::Started => state.speaking = true,
            SynthesisEvent::Ended => state.speaking = false,
            SynthesisEvent::Error(SynthesisErrorReason::Interrupted) => {
                state.speaking = false;
            }
            SynthesisEvent::Error(reason) => {
                tracing::warn!(reason = %reason, "Speech synthesis error");
                state.speaking = false;
                state.error = Some(ERR_VOICE_OUTPUT_FAILED.to_string());
            }
        }
    }

    // -- Reset --

    /// Empty the log and the error slot, stopping any speech output.
    ///
    /// Leaves the voice-output toggle and the listening state untouched.
    pub fn clear_messages(&self) {
        let mut state = self.state();
        state.messages.clear();
        state.error = None;
        self.synthesizer.cancel();
        state.speaking = false;
        tracing::info!("Conversation cleared");
    }
}

fn transition_processing(state: &mut SessionState, target: ProcessingState) {
    debug_assert!(
        state.processing.can_transition_to(&target),
        "invalid processing transition: {} -> {}",
        state.processing,
        target
    );
    tracing::debug!("Processing state: {} -> {}", state.processing, target);
    state.processing = target;
}

fn transition_listening(state: &mut SessionState, target: ListenState) {
    debug_assert!(
        state.listening.can_transition_to(&target),
        "invalid listening transition: {} -> {}",
        state.listening,
        target
    );
    tracing::debug!("Listening state: {} -> {}", state.listening, target);
    state.listening = target;
}

/// The fixed user-facing string for an engine failure reason.
fn recognition_error_message(reason: &RecognitionErrorReason) -> &'static str {
    match reason {
        RecognitionErrorReason::Network => ERR_RECOGNITION_NETWORK,
        RecognitionErrorReason::NotAllowed => ERR_RECOGNITION_NOT_ALLOWED,
        RecognitionErrorReason::AudioCapture => ERR_RECOGNITION_AUDIO_CAPTURE,
        RecognitionErrorReason::NoSpeech => ERR_RECOGNITION_NO_SPEECH,
        RecognitionErrorReason::Other(_) => ERR_RECOGNITION_FAILED,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use nyaya_backend::{BackendError, ScriptedBackend};
    use nyaya_core::types::Sender;
    use nyaya_speech::recognition::{ScriptedRecognizer, UnavailableRecognizer};
    use nyaya_speech::synthesis::{ScriptedSynthesizer, UnavailableSynthesizer, Voice};
    use tokio::sync::Notify;

    struct Harness {
        backend: Arc<ScriptedBackend>,
        recognizer: Arc<ScriptedRecognizer>,
        synthesizer: Arc<ScriptedSynthesizer>,
        session: Arc<ConversationSession>,
    }

    fn harness() -> Harness {
        harness_with_config(SessionConfig::default())
    }

    fn harness_with_config(config: SessionConfig) -> Harness {
        let backend = Arc::new(ScriptedBackend::new());
        let recognizer = Arc::new(ScriptedRecognizer::new());
        let synthesizer = Arc::new(ScriptedSynthesizer::with_voices(vec![
            Voice::new("Lekha", "hi-IN"),
            Voice::new("Rishi", "en-IN"),
        ]));
        let session = Arc::new(ConversationSession::new(
            Arc::clone(&backend) as Arc<dyn LegalBackend>,
            Arc::clone(&recognizer) as Arc<dyn SpeechRecognizer>,
            Arc::clone(&synthesizer) as Arc<dyn SpeechSynthesizer>,
            config,
        ));
        Harness {
            backend,
            recognizer,
            synthesizer,
            session,
        }
    }

    fn muted_config() -> SessionConfig {
        SessionConfig {
            voice_output_enabled: false,
            ..SessionConfig::default()
        }
    }

    // ---- Initial state ----

    #[test]
    fn test_new_session_is_idle() {
        let h = harness();
        assert!(h.session.messages().is_empty());
        assert!(!h.session.is_processing());
        assert!(!h.session.is_listening());
        assert!(!h.session.is_speaking());
        assert!(h.session.is_voice_output_enabled());
        assert!(h.session.error().is_none());
        assert!(h.session.active_topic().is_none());
    }

    // ---- Sending: success path ----

    #[tokio::test]
    async fn test_send_success_appends_two_messages() {
        let h = harness();
        h.backend.push_reply("No, the minimum age is 18 for...", false);

        h.session
            .send_message("Can I drive a bike under 18 in India?", MessageOrigin::Typed)
            .await
            .unwrap();

        let messages = h.session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].text, "Can I drive a bike under 18 in India?");
        assert!(!messages[0].is_error);
        assert_eq!(messages[1].sender, Sender::Assistant);
        assert_eq!(messages[1].text, "No, the minimum age is 18 for...");
        assert!(!messages[1].is_fallback);
        assert!(!messages[1].is_error);
        assert!(!h.session.is_processing());
    }

    #[tokio::test]
    async fn test_send_forwards_raw_text() {
        let h = harness();
        h.backend.push_reply("ok", false);
        h.session
            .send_message("[Family Law] divorce process", MessageOrigin::Typed)
            .await
            .unwrap();

        let requests = h.backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].text, "[Family Law] divorce process");
    }

    #[tokio::test]
    async fn test_send_marks_server_fallback() {
        let h = harness();
        h.backend.push_reply("General guidance only.", true);
        h.session
            .send_message("obscure question", MessageOrigin::Typed)
            .await
            .unwrap();

        let messages = h.session.messages();
        assert!(messages[1].is_fallback);
        assert!(!messages[1].is_error);
    }

    // ---- Sending: failure path ----

    #[tokio::test]
    async fn test_send_failure_appends_fallback_message() {
        let h = harness();
        h.backend.push_failure(BackendError::Status(502));

        h.session
            .send_message("any text", MessageOrigin::Typed)
            .await
            .unwrap();

        let messages = h.session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1].sender, Sender::Assistant);
        assert!(messages[1].is_error);
        assert!(messages[1].is_fallback);
        assert_eq!(messages[1].text, FALLBACK_TEXT);
        assert!(messages[1].text.contains("nalsa.gov.in"));
        // Send failures never populate the error slot.
        assert!(h.session.error().is_none());
        assert!(!h.session.is_processing());
    }

    #[tokio::test]
    async fn test_transport_failure_same_as_status_failure() {
        let h = harness();
        h.backend
            .push_failure(BackendError::Transport("connection reset".to_string()));
        h.session
            .send_message("hello", MessageOrigin::Typed)
            .await
            .unwrap();

        let messages = h.session.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_error && messages[1].is_fallback);
    }

    #[tokio::test]
    async fn test_failure_does_not_speak() {
        let h = harness();
        h.backend.push_failure(BackendError::Status(500));
        h.session
            .send_message("hello", MessageOrigin::Voice)
            .await
            .unwrap();
        assert!(h.synthesizer.spoken().is_empty());
    }

    // ---- Sending: preconditions and concurrency ----

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let h = harness();
        let result = h.session.send_message("", MessageOrigin::Typed).await;
        assert!(matches!(result, Err(ChatError::EmptyMessage)));

        let result = h.session.send_message("   \n\t", MessageOrigin::Typed).await;
        assert!(matches!(result, Err(ChatError::EmptyMessage)));

        assert!(h.session.messages().is_empty());
        assert!(!h.session.is_processing());
    }

    #[tokio::test]
    async fn test_processing_spans_the_request_and_second_send_is_busy() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(ScriptedBackend::gated(Arc::clone(&gate)));
        backend.push_reply("answer", false);

        let session = Arc::new(ConversationSession::new(
            Arc::clone(&backend) as Arc<dyn LegalBackend>,
            Arc::new(ScriptedRecognizer::new()),
            Arc::new(ScriptedSynthesizer::new()),
            muted_config(),
        ));

        assert!(!session.is_processing());

        let task = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.send_message("first", MessageOrigin::Typed).await })
        };
        tokio::task::yield_now().await;

        // In flight: the optimistic user turn is visible and the flag holds.
        assert!(session.is_processing());
        assert_eq!(session.messages().len(), 1);

        // A concurrent send is rejected, not queued.
        let second = session.send_message("second", MessageOrigin::Typed).await;
        assert!(matches!(second, Err(ChatError::Busy)));

        gate.notify_one();
        task.await.unwrap().unwrap();

        assert!(!session.is_processing());
        assert_eq!(session.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_each_send_grows_log_by_exactly_two() {
        let h = harness();
        h.backend.push_reply("a1", false);
        h.backend.push_failure(BackendError::Status(500));
        h.backend.push_reply("a2", false);

        for (i, text) in ["q1", "q2", "q3"].iter().enumerate() {
            h.session
                .send_message(text, MessageOrigin::Typed)
                .await
                .unwrap();
            assert_eq!(h.session.messages().len(), 2 * (i + 1));
        }
    }

    #[tokio::test]
    async fn test_send_clears_prior_speech_error() {
        let h = harness();
        h.session
            .apply_recognition_event(RecognitionEvent::Error(RecognitionErrorReason::NoSpeech))
            .await;
        assert!(h.session.error().is_some());

        h.backend.push_reply("answer", false);
        h.session
            .send_message("hello", MessageOrigin::Typed)
            .await
            .unwrap();
        assert!(h.session.error().is_none());
    }

    // ---- Voice output on send ----

    #[tokio::test]
    async fn test_success_speaks_when_voice_output_enabled() {
        let h = harness();
        h.backend.push_reply("The helmet rule is mandatory.", false);
        h.session
            .send_message("helmet rule?", MessageOrigin::Typed)
            .await
            .unwrap();

        let spoken = h.synthesizer.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].text, "The helmet rule is mandatory.");
        assert!((spoken[0].rate - 0.95).abs() < f32::EPSILON);
        // Cancel-before-speak keeps the utterance queue at depth one.
        assert_eq!(h.synthesizer.cancel_count(), 1);
    }

    #[tokio::test]
    async fn test_no_speech_when_voice_output_disabled() {
        let h = harness_with_config(muted_config());
        h.backend.push_reply("answer", false);
        h.session
            .send_message("question", MessageOrigin::Typed)
            .await
            .unwrap();
        assert!(h.synthesizer.spoken().is_empty());
    }

    #[tokio::test]
    async fn test_voice_origin_does_not_override_disabled_output() {
        // The trigger condition is (enabled OR voice origin), but speak
        // itself is a no-op while output is disabled.
        let h = harness_with_config(muted_config());
        h.backend.push_reply("answer", false);
        h.session
            .send_message("question", MessageOrigin::Voice)
            .await
            .unwrap();
        assert!(h.synthesizer.spoken().is_empty());
    }

    #[tokio::test]
    async fn test_speak_selects_voice_from_source_script() {
        let h = harness();
        h.backend.push_reply("This is the English answer.", false);
        // Hindi question: the voice follows the question's script.
        h.session
            .send_message(
                "\u{0915}\u{093e}\u{0928}\u{0942}\u{0928} \u{0915}\u{094d}\u{092f}\u{093e} \u{0939}\u{0948}?",
                MessageOrigin::Typed,
            )
            .await
            .unwrap();

        let spoken = h.synthesizer.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].locale, "hi-IN");
        assert_eq!(spoken[0].voice.as_ref().unwrap().name, "Lekha");
    }

    #[tokio::test]
    async fn test_speak_defaults_to_english_voice() {
        let h = harness();
        h.backend.push_reply("answer", false);
        h.session
            .send_message("plain English question", MessageOrigin::Typed)
            .await
            .unwrap();

        let spoken = h.synthesizer.spoken();
        assert_eq!(spoken[0].locale, "en-IN");
        assert_eq!(spoken[0].voice.as_ref().unwrap().name, "Rishi");
    }

    #[tokio::test]
    async fn test_speak_noop_when_capability_absent() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_reply("answer", false);
        let session = ConversationSession::new(
            Arc::clone(&backend) as Arc<dyn LegalBackend>,
            Arc::new(UnavailableRecognizer),
            Arc::new(UnavailableSynthesizer),
            SessionConfig::default(),
        );
        session
            .send_message("question", MessageOrigin::Typed)
            .await
            .unwrap();
        assert!(!session.is_speaking());
    }

    #[tokio::test]
    async fn test_synthesis_natural_end_clears_speaking() {
        let h = harness();
        h.backend.push_reply("answer", false);
        h.session
            .send_message("question", MessageOrigin::Typed)
            .await
            .unwrap();
        // Scripted playback runs Started then Ended within the send.
        assert!(!h.session.is_speaking());
        assert!(h.session.error().is_none());
    }

    #[tokio::test]
    async fn test_synthesis_interrupted_is_swallowed() {
        let h = harness();
        h.synthesizer.push_playback(vec![
            SynthesisEvent::Started,
            SynthesisEvent::Error(SynthesisErrorReason::Interrupted),
        ]);
        h.backend.push_reply("answer", false);
        h.session
            .send_message("question", MessageOrigin::Typed)
            .await
            .unwrap();
        assert!(!h.session.is_speaking());
        assert!(h.session.error().is_none());
    }

    #[tokio::test]
    async fn test_synthesis_failure_sets_generic_error() {
        let h = harness();
        h.synthesizer.push_playback(vec![
            SynthesisEvent::Started,
            SynthesisEvent::Error(SynthesisErrorReason::Other("synthesis-failed".to_string())),
        ]);
        h.backend.push_reply("answer", false);
        h.session
            .send_message("question", MessageOrigin::Typed)
            .await
            .unwrap();
        assert!(!h.session.is_speaking());
        assert_eq!(
            h.session.error().unwrap(),
            "Voice output failed. Please try again."
        );
    }

    // ---- Voice output toggle ----

    #[test]
    fn test_toggle_voice_output_flips() {
        let h = harness();
        assert!(h.session.is_voice_output_enabled());
        assert!(!h.session.toggle_voice_output());
        assert!(!h.session.is_voice_output_enabled());
        assert!(h.session.toggle_voice_output());
        assert!(h.session.is_voice_output_enabled());
    }

    #[test]
    fn test_toggle_off_cancels_playback_synchronously() {
        let h = harness();
        h.session.apply_synthesis_event(SynthesisEvent::Started);
        assert!(h.session.is_speaking());

        h.session.toggle_voice_output();
        assert!(!h.session.is_speaking());
        assert_eq!(h.synthesizer.cancel_count(), 1);
    }

    #[test]
    fn test_toggle_on_does_not_cancel() {
        let h = harness_with_config(muted_config());
        h.session.toggle_voice_output(); // off -> on
        assert_eq!(h.synthesizer.cancel_count(), 0);
    }

    // ---- Topic context ----

    #[test]
    fn test_topic_is_consumed_once() {
        let h = harness();
        h.session.set_topic(Some("Family Law".to_string()));
        assert_eq!(h.session.active_topic().as_deref(), Some("Family Law"));

        let composed = h.session.compose_input("how long does divorce take");
        assert_eq!(composed, "[Family Law] how long does divorce take");
        assert!(h.session.active_topic().is_none());

        // Absent for all later sends until set again.
        let composed = h.session.compose_input("and child custody?");
        assert_eq!(composed, "and child custody?");
    }

    #[test]
    fn test_take_topic_atomic() {
        let h = harness();
        h.session.set_topic(Some("Employment".to_string()));
        assert_eq!(h.session.take_topic().as_deref(), Some("Employment"));
        assert_eq!(h.session.take_topic(), None);
    }

    #[test]
    fn test_set_topic_none_clears() {
        let h = harness();
        h.session.set_topic(Some("Traffic Laws".to_string()));
        h.session.set_topic(None);
        assert!(h.session.active_topic().is_none());
    }

    // ---- Voice input ----

    #[tokio::test]
    async fn test_voice_flow_sends_transcript() {
        let h = harness();
        h.recognizer.push_transcript("what is an FIR");
        h.backend.push_reply("An FIR is a First Information Report.", false);

        h.session.start_listening().await;

        let messages = h.session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "what is an FIR");
        assert!(!h.session.is_listening());
        // Voice-origin success speaks (output enabled by default).
        assert_eq!(h.synthesizer.spoken().len(), 1);

        // The engine contract was requested correctly.
        let settings = h.recognizer.last_settings().unwrap();
        assert_eq!(settings.locale, "en-IN");
        assert!(!settings.continuous);
        assert!(!settings.interim_results);
        assert_eq!(settings.max_alternatives, 1);
    }

    #[tokio::test]
    async fn test_empty_transcript_not_sent() {
        let h = harness();
        h.recognizer.push_session(vec![
            RecognitionEvent::Started,
            RecognitionEvent::Transcript("   ".to_string()),
            RecognitionEvent::Ended,
        ]);
        h.session.start_listening().await;
        assert!(h.session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_silent_session_returns_to_idle() {
        let h = harness();
        h.recognizer.push_session(vec![
            RecognitionEvent::Started,
            RecognitionEvent::Ended,
        ]);
        h.session.start_listening().await;
        assert!(!h.session.is_listening());
        assert!(h.session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_not_allowed_error_sets_permission_message() {
        let h = harness();
        h.recognizer.push_error(RecognitionErrorReason::NotAllowed);
        h.session.start_listening().await;

        assert!(!h.session.is_listening());
        assert_eq!(
            h.session.error().unwrap(),
            "Please allow microphone access in your device settings"
        );
    }

    #[tokio::test]
    async fn test_recognition_error_messages_are_cause_specific() {
        let cases = [
            (
                RecognitionErrorReason::Network,
                "Network connection required for speech recognition",
            ),
            (
                RecognitionErrorReason::AudioCapture,
                "No microphone detected or microphone is busy",
            ),
            (
                RecognitionErrorReason::NoSpeech,
                "No speech was detected",
            ),
            (
                RecognitionErrorReason::Other("aborted".to_string()),
                "Speech recognition failed. Please try again.",
            ),
        ];

        for (reason, expected) in cases {
            let h = harness();
            h.recognizer.push_error(reason);
            h.session.start_listening().await;
            assert_eq!(h.session.error().unwrap(), expected);
            assert!(!h.session.is_listening());
        }
    }

    #[tokio::test]
    async fn test_unsupported_platform_sets_error() {
        let backend = Arc::new(ScriptedBackend::new());
        let session = ConversationSession::new(
            backend as Arc<dyn LegalBackend>,
            Arc::new(UnavailableRecognizer),
            Arc::new(ScriptedSynthesizer::new()),
            SessionConfig::default(),
        );
        session.start_listening().await;
        assert_eq!(
            session.error().unwrap(),
            "Speech recognition is not supported on this device"
        );
        assert!(!session.is_listening());
    }

    #[tokio::test]
    async fn test_started_event_clears_error_and_activates() {
        let h = harness();
        h.session
            .apply_recognition_event(RecognitionEvent::Error(RecognitionErrorReason::NoSpeech))
            .await;
        assert!(h.session.error().is_some());

        h.session
            .apply_recognition_event(RecognitionEvent::Started)
            .await;
        assert!(h.session.is_listening());
        assert!(h.session.error().is_none());

        h.session
            .apply_recognition_event(RecognitionEvent::Ended)
            .await;
        assert!(!h.session.is_listening());
    }

    #[tokio::test]
    async fn test_stop_listening_flips_immediately() {
        let h = harness();
        h.session
            .apply_recognition_event(RecognitionEvent::Started)
            .await;
        assert!(h.session.is_listening());

        h.session.stop_listening();
        assert!(!h.session.is_listening());
        assert_eq!(h.recognizer.stop_requests(), 1);
    }

    #[test]
    fn test_stop_listening_when_idle_is_harmless() {
        let h = harness();
        h.session.stop_listening();
        assert!(!h.session.is_listening());
    }

    // ---- Clearing ----

    #[tokio::test]
    async fn test_clear_messages_resets_log_and_error() {
        let h = harness();
        h.backend.push_reply("answer", false);
        h.session
            .send_message("question", MessageOrigin::Typed)
            .await
            .unwrap();
        h.session
            .apply_recognition_event(RecognitionEvent::Error(RecognitionErrorReason::NoSpeech))
            .await;

        h.session.clear_messages();
        assert!(h.session.messages().is_empty());
        assert!(h.session.error().is_none());
    }

    #[test]
    fn test_clear_messages_cancels_speech() {
        let h = harness();
        h.session.apply_synthesis_event(SynthesisEvent::Started);
        assert!(h.session.is_speaking());

        h.session.clear_messages();
        assert!(!h.session.is_speaking());
        assert!(h.synthesizer.cancel_count() >= 1);
    }

    #[tokio::test]
    async fn test_clear_messages_keeps_toggle_and_listening() {
        let h = harness_with_config(muted_config());
        h.session
            .apply_recognition_event(RecognitionEvent::Started)
            .await;

        h.session.clear_messages();
        assert!(!h.session.is_voice_output_enabled());
        assert!(h.session.is_listening());
    }

    #[test]
    fn test_clear_on_fresh_session() {
        let h = harness();
        h.session.clear_messages();
        assert!(h.session.messages().is_empty());
        assert!(h.session.error().is_none());
    }

    // ---- Config plumbing ----

    #[test]
    fn test_session_config_from_nyaya_config() {
        let mut config = NyayaConfig::default();
        config.recognition.locale = "hi-IN".to_string();
        config.synthesis.voice_output_enabled = false;
        config.synthesis.rate = 1.2;

        let session_config = SessionConfig::from(&config);
        assert_eq!(session_config.locale, "hi-IN");
        assert!(!session_config.voice_output_enabled);
        assert!((session_config.rate - 1.2).abs() < f32::EPSILON);
    }
}
