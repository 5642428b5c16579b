//! Core data model: traditions, retrieval candidates, passages, and the
//! pipeline event stream.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

/// Textual tradition selected by the caller. Governs both the retrieval
/// filter and the tone of the generated explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tradition {
    #[default]
    Christian,
    Jewish,
    HarryPotter,
    SocialMedia,
}

impl Tradition {
    /// Resolve the retrieval filter for this tradition.
    ///
    /// This is the single tradition-to-behavior dispatch point; no other
    /// stage branches on the tradition except the prompt composer.
    #[must_use]
    pub fn filter_spec(self) -> FilterSpec {
        match self {
            Self::Christian => FilterSpec::Partitions(vec![
                SourcePartition::OldTestament,
                SourcePartition::NewTestament,
            ]),
            Self::Jewish => FilterSpec::Partitions(vec![SourcePartition::OldTestament]),
            Self::HarryPotter => FilterSpec::Partitions(vec![SourcePartition::HarryPotter]),
            Self::SocialMedia => FilterSpec::WebSearch,
        }
    }

    /// Translation or corpus label shown on passages from this tradition.
    #[must_use]
    pub fn translation_label(self) -> &'static str {
        match self {
            Self::Christian | Self::Jewish => "WEB",
            Self::HarryPotter => "HP",
            Self::SocialMedia => "social",
        }
    }
}

impl fmt::Display for Tradition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Christian => "christian",
            Self::Jewish => "jewish",
            Self::HarryPotter => "harry_potter",
            Self::SocialMedia => "social_media",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Tradition {
    type Err = crate::SolaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "christian" => Ok(Self::Christian),
            "jewish" => Ok(Self::Jewish),
            "harry_potter" => Ok(Self::HarryPotter),
            "social_media" => Ok(Self::SocialMedia),
            other => Err(crate::SolaceError::InvalidInput(format!(
                "unknown tradition: {other}"
            ))),
        }
    }
}

/// Source partition of the passage index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourcePartition {
    #[serde(rename = "OT")]
    OldTestament,
    #[serde(rename = "NT")]
    NewTestament,
    #[serde(rename = "HP")]
    HarryPotter,
}

impl SourcePartition {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OldTestament => "OT",
            Self::NewTestament => "NT",
            Self::HarryPotter => "HP",
        }
    }
}

/// Retrieval filter resolved once per run from the tradition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    /// Restrict the semantic index search to the given partitions
    Partitions(Vec<SourcePartition>),
    /// Route retrieval to the web-search collaborator instead
    WebSearch,
}

/// Raw retrieval result, before reranking and diversity selection.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    /// Book or handle this candidate came from (e.g. "Psalms", "@user")
    pub source_label: String,
    pub text: String,
    pub origin_tag: String,
    /// Similarity reported by the retrieval collaborator. Opaque beyond
    /// ordering; never compare with rerank scores.
    pub raw_score: f32,
    pub url: Option<String>,
}

/// Candidate re-scored by the cross-encoder collaborator.
#[derive(Debug, Clone)]
pub struct RerankedCandidate {
    pub candidate: Candidate,
    pub rerank_score: f32,
}

/// Outcome of the rerank stage. Rerank failures degrade to the raw
/// retrieval ordering instead of failing the run.
#[derive(Debug, Clone)]
pub enum Ranking {
    Reranked(Vec<RerankedCandidate>),
    Unreranked(Vec<Candidate>),
}

impl Ranking {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Reranked(v) => v.len(),
            Self::Unreranked(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Final user-visible supporting text unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    #[serde(rename = "ref")]
    pub reference: String,
    pub text: String,
    pub translation: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Ordered event emitted by a pipeline run. Exactly one terminal event
/// (crisis, done, or error) per run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Crisis(String),
    Verses(Vec<Passage>),
    ExplanationChunk(String),
    Done,
    Error(String),
}

impl PipelineEvent {
    /// Whether this event terminates the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Crisis(_) | Self::Done | Self::Error(_))
    }

    /// Wire representation per the event-stream contract. Error frames are
    /// bare `{"error": ...}` objects; everything else carries a `type` tag.
    #[must_use]
    pub fn wire_json(&self) -> serde_json::Value {
        match self {
            Self::Crisis(content) => json!({"type": "crisis", "content": content}),
            Self::Verses(verses) => json!({"type": "verses", "verses": verses}),
            Self::ExplanationChunk(content) => {
                json!({"type": "explanation_chunk", "content": content})
            }
            Self::Done => json!({"type": "done"}),
            Self::Error(message) => json!({"error": message}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tradition_filter_specs() {
        assert_eq!(
            Tradition::Christian.filter_spec(),
            FilterSpec::Partitions(vec![
                SourcePartition::OldTestament,
                SourcePartition::NewTestament
            ])
        );
        assert_eq!(
            Tradition::Jewish.filter_spec(),
            FilterSpec::Partitions(vec![SourcePartition::OldTestament])
        );
        assert_eq!(Tradition::SocialMedia.filter_spec(), FilterSpec::WebSearch);
    }

    #[test]
    fn test_tradition_round_trip() {
        for t in [
            Tradition::Christian,
            Tradition::Jewish,
            Tradition::HarryPotter,
            Tradition::SocialMedia,
        ] {
            assert_eq!(t.to_string().parse::<Tradition>().unwrap(), t);
        }
    }

    #[test]
    fn test_tradition_deserializes_snake_case() {
        let t: Tradition = serde_json::from_str("\"harry_potter\"").unwrap();
        assert_eq!(t, Tradition::HarryPotter);
    }

    #[test]
    fn test_event_wire_shapes() {
        let done = PipelineEvent::Done.wire_json();
        assert_eq!(done, serde_json::json!({"type": "done"}));

        let err = PipelineEvent::Error("boom".into()).wire_json();
        assert_eq!(err, serde_json::json!({"error": "boom"}));
        assert!(err.get("type").is_none());

        let chunk = PipelineEvent::ExplanationChunk("hi".into()).wire_json();
        assert_eq!(chunk["type"], "explanation_chunk");
        assert_eq!(chunk["content"], "hi");
    }

    #[test]
    fn test_passage_serializes_ref_and_omits_missing_url() {
        let passage = Passage {
            reference: "Psalm 23:1".into(),
            text: "The Lord is my shepherd".into(),
            translation: "WEB".into(),
            score: 0.91,
            url: None,
        };
        let value = serde_json::to_value(&passage).unwrap();
        assert_eq!(value["ref"], "Psalm 23:1");
        assert!(value.get("url").is_none());
    }

    #[test]
    fn test_terminal_events() {
        assert!(PipelineEvent::Done.is_terminal());
        assert!(PipelineEvent::Crisis(String::new()).is_terminal());
        assert!(PipelineEvent::Error(String::new()).is_terminal());
        assert!(!PipelineEvent::Verses(vec![]).is_terminal());
        assert!(!PipelineEvent::ExplanationChunk(String::new()).is_terminal());
    }
}
