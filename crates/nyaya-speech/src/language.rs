//! Output-locale detection from Unicode script ranges.
//!
//! The synthesis voice is chosen from the script of the text being answered,
//! so a Hindi question gets a Hindi voice even when the platform default is
//! English.

use std::fmt;

/// Speech output locale, selected by script detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpeechLocale {
    /// Tamil (ta-IN).
    Tamil,
    /// Telugu (te-IN).
    Telugu,
    /// Hindi (hi-IN).
    Hindi,
    /// Kannada (kn-IN).
    Kannada,
    /// Indian English (en-IN). Default when no other script is present.
    EnglishIndia,
}

impl SpeechLocale {
    /// The BCP 47 tag for this locale.
    pub fn tag(&self) -> &'static str {
        match self {
            SpeechLocale::Tamil => "ta-IN",
            SpeechLocale::Telugu => "te-IN",
            SpeechLocale::Hindi => "hi-IN",
            SpeechLocale::Kannada => "kn-IN",
            SpeechLocale::EnglishIndia => "en-IN",
        }
    }

    /// The primary language subtag (e.g. "ta").
    pub fn primary_subtag(&self) -> &'static str {
        match self {
            SpeechLocale::Tamil => "ta",
            SpeechLocale::Telugu => "te",
            SpeechLocale::Hindi => "hi",
            SpeechLocale::Kannada => "kn",
            SpeechLocale::EnglishIndia => "en",
        }
    }
}

impl fmt::Display for SpeechLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Detect the output locale from the Unicode script ranges present in `text`.
///
/// Scripts are checked in a fixed order: Tamil, Telugu, Devanagari (Hindi),
/// Kannada. The first script with any character present wins; text with none
/// of them falls back to Indian English.
pub fn detect_locale(text: &str) -> SpeechLocale {
    if text.chars().any(|c| ('\u{0B80}'..='\u{0BFF}').contains(&c)) {
        return SpeechLocale::Tamil;
    }
    if text.chars().any(|c| ('\u{0C00}'..='\u{0C7F}').contains(&c)) {
        return SpeechLocale::Telugu;
    }
    if text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c)) {
        return SpeechLocale::Hindi;
    }
    if text.chars().any(|c| ('\u{0C80}'..='\u{0CFF}').contains(&c)) {
        return SpeechLocale::Kannada;
    }
    SpeechLocale::EnglishIndia
}

// =============================================================================
// Tests
// =============================================================================
