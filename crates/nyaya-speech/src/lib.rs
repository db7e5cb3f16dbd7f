//! Speech capability layer for Nyaya.
//!
//! Abstracts the platform's speech-recognition and speech-synthesis engines
//! behind injectable traits, with event vocabularies mirroring the engine
//! callbacks (start, end, error, result). Ships scripted implementations for
//! deterministic testing and unavailable variants for platforms without the
//! capability.

pub mod language;
pub mod recognition;
pub mod synthesis;

pub use language::{detect_locale, SpeechLocale};
pub use recognition::{
    RecognitionErrorReason, RecognitionEvent, RecognitionSettings, ScriptedRecognizer,
    SpeechRecognizer, UnavailableRecognizer,
};
pub use synthesis::{
    select_voice, ScriptedSynthesizer, SpeechSynthesizer, SynthesisErrorReason, SynthesisEvent,
    UnavailableSynthesizer, Utterance, Voice,
};
