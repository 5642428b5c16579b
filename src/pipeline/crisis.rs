//! Crisis gate: safety short-circuit for self-harm signals.
//!
//! Keyword matching, not a classifier. When a query matches, the run emits
//! a single crisis event and makes zero collaborator calls.

/// Indicator phrases checked against the lowercased query.
const CRISIS_KEYWORDS: &[&str] = &[
    "kill myself",
    "suicide",
    "end my life",
    "want to die",
    "self-harm",
    "hurt myself",
    "cutting",
    "suicidal",
];

/// Fixed resource message shown on crisis detection. Tradition-independent.
const CRISIS_MESSAGE: &str = "I'm deeply concerned about what you're going through. \
Please reach out for immediate support:\n\n\
• **National Suicide Prevention Lifeline**: 988 (24/7)\n\
• **Crisis Text Line**: Text HOME to 741741\n\
• **International Association for Suicide Prevention**: \
https://www.iasp.info/resources/Crisis_Centres/\n\n\
Your life has immeasurable value. Please don't face this alone—trained \
counselors are ready to help right now.";

/// Scan a normalized query for crisis indicators. Case-insensitive
/// substring match; returns the fixed resource message on a hit.
#[must_use]
pub fn check(query: &str) -> Option<&'static str> {
    let lowered = query.to_lowercase();
    if CRISIS_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        Some(CRISIS_MESSAGE)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_crisis_phrases() {
        assert!(check("I want to die").is_some());
        assert!(check("thinking about SUICIDE lately").is_some());
        assert!(check("I might hurt myself").is_some());
    }

    #[test]
    fn test_case_insensitive() {
        assert!(check("I Want To Die").is_some());
        assert!(check("SELF-HARM").is_some());
    }

    #[test]
    fn test_clean_queries_pass() {
        assert!(check("I'm anxious about work").is_none());
        assert!(check("my dog died and I'm grieving").is_none());
        assert!(check("I feel so alone").is_none());
    }

    #[test]
    fn test_message_carries_hotline() {
        let msg = check("suicidal thoughts").unwrap();
        assert!(msg.contains("988"));
        assert!(msg.contains("741741"));
        assert!(msg.contains("iasp.info"));
    }
}
