//! Legal topic catalog and conversation starters.
//!
//! A selected topic biases the backend by prefixing exactly one outgoing
//! message; the session clears it after that single use.

/// Topics offered for one-shot context selection.
pub const LEGAL_TOPICS: [&str; 6] = [
    "Criminal Law",
    "Property Rights",
    "Family Law",
    "Employment",
    "Consumer Rights",
    "Traffic Laws",
];

/// Starter questions shown before the first message.
pub const STARTER_QUESTIONS: [&str; 12] = [
    "Can I drive a bike under 18 in India?",
    "What are my rights if stopped by police in India?",
    "How do I file a consumer complaint in India?",
    "What is the process for divorce under Hindu Marriage Act?",
    "Is recording conversations legal in India?",
    "What are tenant rights regarding rent increases in India?",
    "How to register a property in Maharashtra?",
    "What constitutes sexual harassment at workplace under Indian law?",
    "Can I be arrested without warrant in India?",
    "What are the legal working hours in India?",
    "How to file an RTI application in India?",
    "What are the penalties for drunk driving in India?",
];

/// Starter questions for the current topic, capped at `limit`.
///
/// With a topic set, only questions mentioning it are offered.
pub fn suggested_questions(topic: Option<&str>, limit: usize) -> Vec<&'static str> {
    STARTER_QUESTIONS
        .iter()
        .filter(|q| topic.map_or(true, |t| q.contains(t)))
        .take(limit)
        .copied()
        .collect()
}

/// Prefix `input` with the topic tag the backend recognizes.
pub fn compose_topic_input(topic: &str, input: &str) -> String {
    format!("[{}] {}", topic, input)
}

// =============================================================================
// Tests
// =============================================================================
