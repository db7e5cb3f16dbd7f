//! Speech-synthesis capability abstraction.
//!
//! The manager enforces an utterance queue of depth one: a new `speak`
//! always follows a `cancel` of whatever is playing. Engine callbacks are
//! modeled as ordered [`SynthesisEvent`]s.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

/// A synthesis voice offered by the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Voice {
    /// Platform voice name.
    pub name: String,
    /// BCP 47 locale tag (e.g. "hi-IN").
    pub locale: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locale: locale.into(),
        }
    }
}

/// One unit of synthesized speech output, cancelable as a whole.
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// Locale tag selected for this utterance.
    pub locale: String,
    /// Explicit voice, or `None` for the platform default.
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            locale: locale.into(),
            voice: None,
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// Engine-reported synthesis failure reasons.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisErrorReason {
    /// The utterance was cut off by a cancel. Self-caused when the manager
    /// cancels before starting a new utterance.
    #[error("interrupted")]
    Interrupted,
    /// Any other engine error.
    #[error("{0}")]
    Other(String),
}

/// One engine callback while an utterance plays, in delivery order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SynthesisEvent {
    /// Playback began.
    Started,
    /// Playback reached its natural end.
    Ended,
    /// Playback failed or was interrupted.
    Error(SynthesisErrorReason),
}

/// A platform speech-synthesis engine.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Whether the capability exists on this platform.
    fn is_available(&self) -> bool;

    /// Enumerate the voices the platform offers.
    fn voices(&self) -> Vec<Voice>;

    /// Play one utterance and return its callbacks in order.
    async fn speak(&self, utterance: &Utterance) -> Vec<SynthesisEvent>;

    /// Synchronously and immediately stop any playing utterance.
    fn cancel(&self);
}

/// Pick a voice for `locale` from the platform's offering.
///
/// Precedence: exact locale-tag match, then any voice sharing the primary
/// language subtag, then `None` (platform default voice).
pub fn select_voice(locale: &str, voices: &[Voice]) -> Option<Voice> {
    if let Some(exact) = voices.iter().find(|v| v.locale == locale) {
        return Some(exact.clone());
    }
    let primary = locale.split('-').next().unwrap_or(locale);
    voices
        .iter()
        .find(|v| v.locale.split('-').next().unwrap_or(&v.locale) == primary)
        .cloned()
}

/// Synthesizer for platforms without a speech-synthesis engine.
#[derive(Debug, Default)]
pub struct UnavailableSynthesizer;

#[async_trait]
impl SpeechSynthesizer for UnavailableSynthesizer {
    fn is_available(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    async fn speak(&self, _utterance: &Utterance) -> Vec<SynthesisEvent> {
        Vec::new()
    }

    fn cancel(&self) {}
}

/// Scripted synthesizer recording utterances and replaying preloaded events.
///
/// With no script queued, each `speak` plays through naturally
/// (Started, Ended).
#[derive(Debug, Default)]
pub struct ScriptedSynthesizer {
    platform_voices: Vec<Voice>,
    script: Mutex<VecDeque<Vec<SynthesisEvent>>>,
    spoken: Mutex<Vec<Utterance>>,
    cancels: AtomicUsize,
}

impl ScriptedSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scripted synthesizer advertising the given voices.
    pub fn with_voices(voices: Vec<Voice>) -> Self {
        Self {
            platform_voices: voices,
            ..Self::default()
        }
    }

    /// Queue the event sequence for the next utterance.
    pub fn push_playback(&self, events: Vec<SynthesisEvent>) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(events);
    }

    /// Every utterance passed to `speak`, in order.
    pub fn spoken(&self) -> Vec<Utterance> {
        self.spoken.lock().expect("spoken mutex poisoned").clone()
    }

    /// How many times `cancel` was called.
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSynthesizer {
    fn is_available(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<Voice> {
        self.platform_voices.clone()
    }

    async fn speak(&self, utterance: &Utterance) -> Vec<SynthesisEvent> {
        self.spoken
            .lock()
            .expect("spoken mutex poisoned")
            .push(utterance.clone());

        let next = self
            .script
            .lock()
            .expect("script mutex poisoned")
            .pop_front();

        match next {
            Some(events) => events,
            None => vec![SynthesisEvent::Started, SynthesisEvent::Ended],
        }
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_voices() -> Vec<Voice> {
        vec![
            Voice::new("Lekha", "hi-IN"),
            Voice::new("Valluvar", "ta-IN"),
            Voice::new("Rishi", "en-IN"),
            Voice::new("Daniel", "en-GB"),
        ]
    }

    #[test]
    fn test_select_voice_exact_match() {
        let v = select_voice("hi-IN", &sample_voices()).unwrap();
        assert_eq!(v.name, "Lekha");
    }

    #[test]
    fn test_select_voice_primary_subtag_fallback() {
        // No kn-IN voice; no kn voice at all -> None.
        assert!(select_voice("kn-IN", &sample_voices()).is_none());

        // No en-US voice, but en-IN shares the primary subtag and is listed
        // first among the English voices.
        let v = select_voice("en-US", &sample_voices()).unwrap();
        assert_eq!(v.locale, "en-IN");
    }

    #[test]
    fn test_select_voice_empty_platform() {
        assert!(select_voice("en-IN", &[]).is_none());
    }

    #[test]
    fn test_utterance_defaults() {
        let u = Utterance::new("hello", "en-IN");
        assert_eq!(u.text, "hello");
        assert_eq!(u.locale, "en-IN");
        assert!(u.voice.is_none());
        assert!((u.rate - 1.0).abs() < f32::EPSILON);
        assert!((u.pitch - 1.0).abs() < f32::EPSILON);
        assert!((u.volume - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_error_reason_display() {
        assert_eq!(SynthesisErrorReason::Interrupted.to_string(), "interrupted");
        assert_eq!(
            SynthesisErrorReason::Other("synthesis-failed".to_string()).to_string(),
            "synthesis-failed"
        );
    }

    #[test]
    fn test_unavailable_synthesizer() {
        let synth = UnavailableSynthesizer;
        assert!(!synth.is_available());
        assert!(synth.voices().is_empty());
        synth.cancel(); // no-op
    }

    #[tokio::test]
    async fn test_unavailable_synthesizer_emits_nothing() {
        let synth = UnavailableSynthesizer;
        let events = synth.speak(&Utterance::new("hello", "en-IN")).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_scripted_records_utterances() {
        let synth = ScriptedSynthesizer::new();
        let mut u = Utterance::new("first answer", "en-IN");
        u.rate = 0.95;
        synth.speak(&u).await;
        synth.speak(&Utterance::new("second answer", "hi-IN")).await;

        let spoken = synth.spoken();
        assert_eq!(spoken.len(), 2);
        assert_eq!(spoken[0].text, "first answer");
        assert!((spoken[0].rate - 0.95).abs() < f32::EPSILON);
        assert_eq!(spoken[1].locale, "hi-IN");
    }

    #[tokio::test]
    async fn test_scripted_default_playback_is_natural() {
        let synth = ScriptedSynthesizer::new();
        let events = synth.speak(&Utterance::new("hello", "en-IN")).await;
        assert_eq!(
            events,
            vec![SynthesisEvent::Started, SynthesisEvent::Ended]
        );
    }

    #[tokio::test]
    async fn test_scripted_playback_script() {
        let synth = ScriptedSynthesizer::new();
        synth.push_playback(vec![
            SynthesisEvent::Started,
            SynthesisEvent::Error(SynthesisErrorReason::Interrupted),
        ]);
        let events = synth.speak(&Utterance::new("cut off", "en-IN")).await;
        assert_eq!(
            events[1],
            SynthesisEvent::Error(SynthesisErrorReason::Interrupted)
        );
    }

    #[test]
    fn test_scripted_cancel_count() {
        let synth = ScriptedSynthesizer::new();
        assert_eq!(synth.cancel_count(), 0);
        synth.cancel();
        assert_eq!(synth.cancel_count(), 1);
    }

    #[test]
    fn test_scripted_advertises_voices() {
        let synth = ScriptedSynthesizer::with_voices(sample_voices());
        assert_eq!(synth.voices().len(), 4);
        assert!(synth.is_available());
    }
}
