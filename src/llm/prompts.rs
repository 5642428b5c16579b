//! Prompt composition: tradition-keyed templates grounding the generated
//! explanation in the selected passages. Pure, no I/O.

use crate::models::Passage;
use crate::models::Tradition;

/// Passage text is trimmed to this many characters inside prompts to keep
/// prompt size stable.
const PASSAGE_PROMPT_CHARS: usize = 300;

/// System/user prompt pair ready for the completion collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub system: String,
    pub user: String,
}

const CHRISTIAN_SYSTEM: &str = "You are a compassionate, non-denominational Christian guide \
helping people find comfort and encouragement through Scripture. Your responses should be:\n\n\
- Warm, empathetic, and personal (use \"you\" language)\n\
- Non-judgmental and supportive\n\
- Focused on hope, comfort, and God's love\n\
- 2-4 paragraphs, roughly 200-300 words\n\
- Cite the verse references naturally in your response\n\
- Avoid theological jargon or denominational teachings\n\n\
Ground everything you say in the passages provided; never invent new references.";

const JEWISH_SYSTEM: &str = "You are a warm, thoughtful guide helping people find comfort \
in the Hebrew Bible. Your responses should be:\n\n\
- Empathetic and personal (use \"you\" language)\n\
- Rooted in the Tanakh passages provided, cited naturally by reference\n\
- Respectful of Jewish textual tradition; avoid Christian framing or terminology\n\
- 2-4 paragraphs, roughly 200-300 words\n\n\
Ground everything you say in the passages provided; never invent new references.";

const HARRY_POTTER_SYSTEM: &str = "You are a warm, encouraging guide who draws comfort and \
courage from the Harry Potter books. Your responses should be:\n\n\
- Empathetic and personal (use \"you\" language)\n\
- Built on the passages provided, referring to the scenes and characters in them\n\
- Entirely secular: use no religious or spiritual language of any kind\n\
- 2-4 paragraphs, roughly 200-300 words\n\n\
Ground everything you say in the passages provided; never invent new quotes or scenes.";

const SOCIAL_MEDIA_SYSTEM: &str = "You are a friendly, grounded guide summarizing what real \
people online have said about a struggle like this one. Your responses should be:\n\n\
- Empathetic and personal (use \"you\" language)\n\
- Built on the posts provided, mentioning the usernames or sources you quote\n\
- Conversational, never clinical or preachy\n\
- 2-4 paragraphs, roughly 200-300 words\n\n\
Only discuss the posts provided; never invent posts, usernames, or quotes.";

/// Select the system template for a tradition.
#[must_use]
pub fn system_prompt(tradition: Tradition) -> &'static str {
    match tradition {
        Tradition::Christian => CHRISTIAN_SYSTEM,
        Tradition::Jewish => JEWISH_SYSTEM,
        Tradition::HarryPotter => HARRY_POTTER_SYSTEM,
        Tradition::SocialMedia => SOCIAL_MEDIA_SYSTEM,
    }
}

fn passages_block(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| {
            let text: String = p.text.chars().take(PASSAGE_PROMPT_CHARS).collect();
            format!("**{}** ({})\n\"{}\"", p.reference, p.translation, text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the prompt pair for a run. The user content embeds the query
/// verbatim plus each passage's reference and text.
#[must_use]
pub fn compose(tradition: Tradition, query: &str, passages: &[Passage]) -> ComposedPrompt {
    let user = format!(
        "A person shared: \"{query}\"\n\n\
         Here are the most relevant passages:\n\n\
         {}\n\n\
         Write a compassionate response that:\n\
         1. Acknowledges their concern with empathy\n\
         2. Explains how these passages speak to their situation\n\
         3. Offers hope and encouragement\n\
         4. Naturally references the passages by name\n\n\
         Remember: be warm and personal, and focus on comfort rather than advice.",
        passages_block(passages)
    );

    ComposedPrompt {
        system: system_prompt(tradition).to_string(),
        user,
    }
}

/// Rephrase the user content for the single moderation retry. The passages
/// and the query are preserved; only the explanatory instruction phrasing
/// is softened.
#[must_use]
pub fn soften(tradition: Tradition, query: &str, passages: &[Passage]) -> ComposedPrompt {
    let user = format!(
        "Someone is going through a hard time and wrote: \"{query}\"\n\n\
         These passages were selected for them:\n\n\
         {}\n\n\
         Please write a gentle, supportive reflection on how these passages \
         might comfort them. Keep it warm and encouraging.",
        passages_block(passages)
    );

    ComposedPrompt {
        system: system_prompt(tradition).to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(reference: &str, text: &str) -> Passage {
        Passage {
            reference: reference.to_string(),
            text: text.to_string(),
            translation: "WEB".to_string(),
            score: 0.9,
            url: None,
        }
    }

    #[test]
    fn test_each_tradition_has_distinct_template() {
        let templates: Vec<&str> = [
            Tradition::Christian,
            Tradition::Jewish,
            Tradition::HarryPotter,
            Tradition::SocialMedia,
        ]
        .iter()
        .map(|t| system_prompt(*t))
        .collect();
        for (i, a) in templates.iter().enumerate() {
            for b in &templates[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_harry_potter_avoids_religious_register() {
        let system = system_prompt(Tradition::HarryPotter);
        assert!(system.contains("no religious"));
        assert!(!system.contains("Scripture"));
    }

    #[test]
    fn test_user_content_embeds_query_and_passages() {
        let prompt = compose(
            Tradition::Christian,
            "I'm anxious about work",
            &[passage("Philippians 4:6-7", "Be anxious for nothing")],
        );
        assert!(prompt.user.contains("I'm anxious about work"));
        assert!(prompt.user.contains("Philippians 4:6-7"));
        assert!(prompt.user.contains("Be anxious for nothing"));
    }

    #[test]
    fn test_long_passage_text_is_trimmed() {
        let long_text = "x".repeat(1000);
        let prompt = compose(Tradition::Jewish, "grief", &[passage("Psalm 34:18", &long_text)]);
        assert!(!prompt.user.contains(&long_text));
        assert!(prompt.user.contains(&"x".repeat(PASSAGE_PROMPT_CHARS)));
    }

    #[test]
    fn test_soften_preserves_passages_and_query() {
        let passages = vec![passage("Psalm 23:1", "The Lord is my shepherd")];
        let original = compose(Tradition::Christian, "I feel lost", &passages);
        let softened = soften(Tradition::Christian, "I feel lost", &passages);
        assert_ne!(original.user, softened.user);
        assert_eq!(original.system, softened.system);
        assert!(softened.user.contains("I feel lost"));
        assert!(softened.user.contains("Psalm 23:1"));
    }
}
