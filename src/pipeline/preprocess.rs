//! Query preprocessing: validation, normalization, and tradition
//! resolution. No side effects.

use crate::models::FilterSpec;
use crate::models::Tradition;
use crate::Result;
use crate::SolaceError;

/// A validated query with its resolved retrieval filter. Immutable once
/// accepted; the filter is derived exactly once per run.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub text: String,
    pub tradition: Tradition,
    pub filter: FilterSpec,
}

/// Validate and normalize a raw query.
///
/// The length bound is enforced both for cost control on downstream paid
/// APIs and for prompt-size stability.
///
/// # Errors
/// - `InvalidInput("empty input")` when the trimmed query is empty
/// - `InvalidInput("too long")` when it exceeds `max_chars` characters
pub fn preprocess(raw: &str, tradition: Tradition, max_chars: usize) -> Result<PreparedQuery> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SolaceError::InvalidInput("empty input".to_string()));
    }
    if trimmed.chars().count() > max_chars {
        return Err(SolaceError::InvalidInput("too long".to_string()));
    }

    Ok(PreparedQuery {
        text: trimmed.to_string(),
        tradition,
        filter: tradition.filter_spec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourcePartition;

    const MAX: usize = 500;

    #[test]
    fn test_rejects_empty_input() {
        let err = preprocess("", Tradition::Christian, MAX).unwrap_err();
        assert!(matches!(err, SolaceError::InvalidInput(ref m) if m == "empty input"));

        let err = preprocess("   \n\t ", Tradition::Christian, MAX).unwrap_err();
        assert!(matches!(err, SolaceError::InvalidInput(ref m) if m == "empty input"));
    }

    #[test]
    fn test_length_boundary() {
        let exactly_500 = "a".repeat(500);
        assert!(preprocess(&exactly_500, Tradition::Christian, MAX).is_ok());

        let over = "a".repeat(501);
        let err = preprocess(&over, Tradition::Christian, MAX).unwrap_err();
        assert!(matches!(err, SolaceError::InvalidInput(ref m) if m == "too long"));
    }

    #[test]
    fn test_trims_before_measuring() {
        // 500 payload chars surrounded by whitespace is still valid
        let padded = format!("  {}  ", "a".repeat(500));
        let prepared = preprocess(&padded, Tradition::Jewish, MAX).unwrap();
        assert_eq!(prepared.text.len(), 500);
    }

    #[test]
    fn test_resolves_filter_once() {
        let prepared = preprocess("I feel lost", Tradition::Jewish, MAX).unwrap();
        assert_eq!(
            prepared.filter,
            FilterSpec::Partitions(vec![SourcePartition::OldTestament])
        );

        let prepared = preprocess("I feel lost", Tradition::SocialMedia, MAX).unwrap();
        assert_eq!(prepared.filter, FilterSpec::WebSearch);
    }
}
