//! Diversity selection: reduce the ranked candidate list to the final
//! passage set under a per-source uniqueness constraint.

use std::collections::HashSet;

use tracing::debug;

use crate::models::Candidate;
use crate::models::Passage;
use crate::models::Ranking;

/// Normalize a cross-encoder score into 0..1 so passage scores have a
/// stable scale regardless of which ranking path produced them.
/// Cross-encoder output is roughly -10..10, higher is better.
fn normalize_rerank_score(score: f32) -> f32 {
    if score < 0.0 {
        1.0 / (1.0 + score.abs())
    } else {
        (score / 10.0).min(1.0)
    }
}

/// Scored candidate in final display order.
struct Scored {
    candidate: Candidate,
    score: f32,
}

fn scored_list(ranking: Ranking) -> Vec<Scored> {
    match ranking {
        Ranking::Reranked(items) => items
            .into_iter()
            .map(|r| Scored {
                score: normalize_rerank_score(r.rerank_score),
                candidate: r.candidate,
            })
            .collect(),
        Ranking::Unreranked(items) => items
            .into_iter()
            .map(|c| Scored {
                score: c.raw_score,
                candidate: c,
            })
            .collect(),
    }
}

/// Select up to `n` passages from the ranked pool.
///
/// First pass: greedy in score order, at most one passage per distinct
/// source label. Second pass: if fewer than `n` were accepted, fill the
/// remaining slots by score order allowing repeated sources, so the output
/// has exactly `n` passages whenever the pool holds at least `n`
/// candidates. Applied identically to reranked and unreranked input; an
/// all-from-one-source result is a relevance failure independent of
/// whether reranking succeeded.
#[must_use]
pub fn select(ranking: Ranking, n: usize, translation: &str) -> Vec<Passage> {
    let pool = scored_list(ranking);

    let mut accepted: Vec<usize> = Vec::with_capacity(n);
    let mut seen_sources: HashSet<String> = HashSet::new();

    // Pass 1: one per source, score order
    for (idx, entry) in pool.iter().enumerate() {
        if accepted.len() == n {
            break;
        }
        if seen_sources.insert(entry.candidate.source_label.clone()) {
            accepted.push(idx);
        }
    }

    // Pass 2: fill remaining slots by score order, repeats permitted
    if accepted.len() < n {
        debug!(
            "Diversity pool exhausted at {} distinct sources, filling to {} with repeats",
            accepted.len(),
            n
        );
        for idx in 0..pool.len() {
            if accepted.len() == n {
                break;
            }
            if !accepted.contains(&idx) {
                accepted.push(idx);
            }
        }
        // Preserve score order within the final set
        accepted.sort_unstable();
    }

    accepted
        .into_iter()
        .map(|idx| {
            let entry = &pool[idx];
            Passage {
                reference: entry.candidate.source_label.clone(),
                text: entry.candidate.text.clone(),
                translation: if entry.candidate.origin_tag == "social" {
                    "social".to_string()
                } else {
                    translation.to_string()
                },
                score: entry.score,
                url: entry.candidate.url.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RerankedCandidate;

    fn candidate(id: &str, source: &str, score: f32) -> Candidate {
        Candidate {
            id: id.to_string(),
            source_label: source.to_string(),
            text: format!("text of {id}"),
            origin_tag: "scripture".to_string(),
            raw_score: score,
            url: None,
        }
    }

    #[test]
    fn test_distinct_sources_preferred() {
        let pool = Ranking::Unreranked(vec![
            candidate("1", "Psalms", 0.9),
            candidate("2", "Psalms", 0.8),
            candidate("3", "Matthew", 0.7),
            candidate("4", "Isaiah", 0.6),
        ]);
        let passages = select(pool, 3, "WEB");
        assert_eq!(passages.len(), 3);
        let sources: Vec<&str> = passages.iter().map(|p| p.reference.as_str()).collect();
        assert_eq!(sources, vec!["Psalms", "Matthew", "Isaiah"]);
    }

    #[test]
    fn test_single_source_pool_still_fills() {
        let pool = Ranking::Unreranked(vec![
            candidate("1", "Psalms", 0.9),
            candidate("2", "Psalms", 0.8),
            candidate("3", "Psalms", 0.7),
            candidate("4", "Psalms", 0.6),
        ]);
        let passages = select(pool, 3, "WEB");
        assert_eq!(passages.len(), 3);
        // Best three by score, repeats allowed as last resort
        assert!((passages[0].score - 0.9).abs() < f32::EPSILON);
        assert!((passages[2].score - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pool_smaller_than_n() {
        let pool = Ranking::Unreranked(vec![
            candidate("1", "Psalms", 0.9),
            candidate("2", "Matthew", 0.8),
        ]);
        let passages = select(pool, 3, "WEB");
        assert_eq!(passages.len(), 2);
    }

    #[test]
    fn test_two_distinct_plus_repeat_keeps_score_order() {
        let pool = Ranking::Unreranked(vec![
            candidate("1", "Psalms", 0.9),
            candidate("2", "Psalms", 0.8),
            candidate("3", "Matthew", 0.7),
        ]);
        let passages = select(pool, 3, "WEB");
        assert_eq!(passages.len(), 3);
        let scores: Vec<f32> = passages.iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![0.9, 0.8, 0.7]);
    }

    #[test]
    fn test_rerank_scores_normalized() {
        let pool = Ranking::Reranked(vec![
            RerankedCandidate {
                candidate: candidate("1", "Psalms", 0.1),
                rerank_score: 8.0,
            },
            RerankedCandidate {
                candidate: candidate("2", "Matthew", 0.2),
                rerank_score: -2.0,
            },
        ]);
        let passages = select(pool, 2, "WEB");
        assert!((passages[0].score - 0.8).abs() < 1e-6);
        assert!((passages[1].score - (1.0 / 3.0)).abs() < 1e-6);
        // Normalized into 0..1 either way
        assert!(passages.iter().all(|p| (0.0..=1.0).contains(&p.score)));
    }

    #[test]
    fn test_social_candidates_keep_social_label_and_url() {
        let mut c = candidate("1", "@seeker", 0.5);
        c.origin_tag = "social".to_string();
        c.url = Some("https://example.com/post/1".to_string());
        let passages = select(Ranking::Unreranked(vec![c]), 3, "WEB");
        assert_eq!(passages[0].translation, "social");
        assert_eq!(passages[0].url.as_deref(), Some("https://example.com/post/1"));
    }
}
