use tracing::debug;

use crate::corpus::Corpus;
use crate::embed::{ensure_finite, EmbeddingProvider};
use crate::error::{FaqError, Result};
use crate::model::RankedAnswer;

/// Cosine similarity of two equal-length vectors. A zero-norm operand scores
/// 0.0 rather than NaN. Sums are accumulated in f64 so large finite
/// components do not overflow.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(FaqError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let (dot, na, nb) = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (f64::from(*x), f64::from(*y)))
        .fold((0.0f64, 0.0f64, 0.0f64), |(d, aa, bb), (x, y)| {
            (d + (x * y), aa + (x * x), bb + (y * y))
        });

    if na == 0.0 || nb == 0.0 {
        return Ok(0.0);
    }

    let score = (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0) as f32;
    Ok(if score.is_finite() { score } else { 0.0 })
}

fn check_request(corpus: &Corpus, k: usize) -> Result<()> {
    if corpus.is_empty() {
        return Err(FaqError::InvalidInput("corpus is empty".to_string()));
    }
    if k < 1 {
        return Err(FaqError::InvalidInput(format!("k must be >= 1, got {k}")));
    }
    Ok(())
}

/// Score an already-embedded query against every entry and return the best
/// `min(k, corpus.len())` by descending score. Ties keep corpus order.
pub fn rank_vector(query_vec: &[f32], corpus: &Corpus, k: usize) -> Result<Vec<RankedAnswer>> {
    check_request(corpus, k)?;
    if query_vec.len() != corpus.dim() {
        return Err(FaqError::DimensionMismatch {
            expected: corpus.dim(),
            actual: query_vec.len(),
        });
    }

    let mut scored = Vec::with_capacity(corpus.len());
    for entry in corpus.iter() {
        scored.push((entry, cosine_similarity(query_vec, &entry.embedding)?));
    }

    // sort_by is stable, which gives the insertion-order tie break
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(scored
        .into_iter()
        .take(k)
        .map(|(entry, score)| RankedAnswer {
            question: entry.question.clone(),
            answer: entry.answer.clone(),
            score,
        })
        .collect())
}

/// Embed `query` and rank the corpus against it.
pub fn rank<E>(query: &str, corpus: &Corpus, embedder: &E, k: usize) -> Result<Vec<RankedAnswer>>
where
    E: EmbeddingProvider + ?Sized,
{
    if query.trim().is_empty() {
        return Err(FaqError::InvalidInput("query is empty".to_string()));
    }
    // fail on an empty corpus before paying for the embedding call
    check_request(corpus, k)?;

    let query_vec = embedder.embed(query)?;
    ensure_finite(&query_vec, query)?;

    let ranked = rank_vector(&query_vec, corpus, k)?;
    debug!(
        k,
        results = ranked.len(),
        top_score = ranked.first().map(|r| r.score),
        "ranked query"
    );
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::build_index;
    use crate::embed::HashEmbeddingProvider;
    use crate::model::{FaqEntry, FaqPair};

    /// One-hot vector for the first topic with a keyword in the text;
    /// text matching no topic maps to the zero vector.
    struct TopicProvider {
        topics: Vec<Vec<&'static str>>,
    }

    impl EmbeddingProvider for TopicProvider {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lowered = text.to_lowercase();
            let mut v = vec![0.0; self.topics.len()];
            if let Some(i) = self
                .topics
                .iter()
                .position(|keywords| keywords.iter().any(|k| lowered.contains(k)))
            {
                v[i] = 1.0;
            }
            Ok(v)
        }
    }

    fn mk_entry(answer: &str, emb: Vec<f32>) -> FaqEntry {
        FaqEntry {
            question: format!("question-{answer}"),
            answer: answer.to_string(),
            embedding: emb,
        }
    }

    fn corpus(entries: Vec<FaqEntry>) -> Corpus {
        Corpus::from_entries(entries).unwrap()
    }

    #[test]
    fn cosine_works_for_unit_vectors() {
        let a = [1.0, 0.0, 0.0];
        let b = [1.0, 0.0, 0.0];
        let c = [0.0, 1.0, 0.0];
        let d = [-1.0, 0.0, 0.0];

        assert!((cosine_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &c).unwrap().abs() < 1e-6);
        assert!((cosine_similarity(&a, &d).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        let score = cosine_similarity(&[0.0, 0.0], &[0.3, 0.4]).unwrap();
        assert_eq!(score, 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn cosine_of_large_components_stays_finite() {
        let score = cosine_similarity(&[1e20, 0.0], &[1e20, 0.0]).unwrap();
        assert!((score - 1.0).abs() < 1e-6, "got {score}");

        let score = cosine_similarity(&[3e38, 3e38], &[3e38, -3e38]).unwrap();
        assert!(score.is_finite());
        assert!(score.abs() < 1e-6, "got {score}");
    }

    #[test]
    fn large_components_rank_aligned_entry_first() {
        let c = corpus(vec![
            mk_entry("small", vec![0.0, 1.0]),
            mk_entry("big", vec![1e20, 0.0]),
        ]);

        let ranked = rank_vector(&[1e20, 0.0], &c, 2).unwrap();
        assert!(ranked.iter().all(|r| r.score.is_finite()));
        assert_eq!(ranked[0].answer, "big");
        assert!((ranked[0].score - 1.0).abs() < 1e-6);
        assert_eq!(ranked[1].score, 0.0);
    }

    #[test]
    fn cosine_rejects_length_mismatch() {
        let err = cosine_similarity(&[1.0], &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, FaqError::DimensionMismatch { .. }));
    }

    #[test]
    fn results_are_sorted_and_truncated() {
        let c = corpus(vec![
            mk_entry("a", vec![0.0, 1.0]),
            mk_entry("b", vec![1.0, 0.0]),
            mk_entry("c", vec![1.0, 1.0]),
        ]);

        let ranked = rank_vector(&[1.0, 0.1], &c, 2).unwrap();
        let answers: Vec<&str> = ranked.iter().map(|r| r.answer.as_str()).collect();
        assert_eq!(answers, vec!["b", "c"]);
        assert!(ranked[0].score >= ranked[1].score);

        let all = rank_vector(&[1.0, 0.1], &c, 10).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn ties_keep_insertion_order_and_are_repeatable() {
        let c = corpus(vec![
            mk_entry("first", vec![1.0, 0.0]),
            mk_entry("other", vec![0.0, 1.0]),
            mk_entry("second", vec![2.0, 0.0]),
            mk_entry("third", vec![0.5, 0.0]),
        ]);

        let once = rank_vector(&[1.0, 0.0], &c, 3).unwrap();
        let twice = rank_vector(&[1.0, 0.0], &c, 3).unwrap();

        let answers: Vec<&str> = once.iter().map(|r| r.answer.as_str()).collect();
        assert_eq!(answers, vec!["first", "second", "third"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn zero_vector_entry_scores_zero() {
        let c = corpus(vec![
            mk_entry("zero", vec![0.0, 0.0]),
            mk_entry("x", vec![1.0, 0.0]),
        ]);
        let ranked = rank_vector(&[0.0, 1.0], &c, 2).unwrap();
        assert!(ranked.iter().all(|r| r.score == 0.0));
        assert_eq!(ranked[0].answer, "zero");
    }

    #[test]
    fn mismatched_query_vector_fails() {
        let c = corpus(vec![mk_entry("a", vec![1.0, 0.0])]);
        let err = rank_vector(&[1.0, 0.0, 0.0], &c, 1).unwrap_err();
        assert!(matches!(
            err,
            FaqError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn invalid_requests_fail() {
        let provider = HashEmbeddingProvider::new(16);
        let empty = Corpus::default();
        let err = rank("hello", &empty, &provider, 1).unwrap_err();
        assert!(matches!(err, FaqError::InvalidInput(_)));

        let c = corpus(vec![mk_entry("a", provider.embed("a").unwrap())]);
        assert!(matches!(
            rank("hello", &c, &provider, 0).unwrap_err(),
            FaqError::InvalidInput(_)
        ));
        assert!(matches!(
            rank("   ", &c, &provider, 1).unwrap_err(),
            FaqError::InvalidInput(_)
        ));
    }

    #[test]
    fn answer_text_ranks_its_own_entry_first() {
        let provider = HashEmbeddingProvider::new(256);
        let pairs = vec![
            FaqPair::new("Refunds?", "Refunds are issued within 14 days"),
            FaqPair::new("Shipping?", "We ship worldwide with tracked delivery"),
            FaqPair::new("Support?", "Contact support by email at any time"),
        ];
        let c = build_index(pairs, &provider).unwrap();

        for entry in c.iter() {
            let top = &rank(&entry.answer, &c, &provider, 1).unwrap()[0];
            assert_eq!(top.answer, entry.answer);
            assert!((top.score - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn opening_hours_query_finds_hours_answer() {
        let provider = TopicProvider {
            topics: vec![vec!["9am", "open", "hours"], vec!["downtown", "located"]],
        };
        let pairs = vec![
            FaqPair::new("What are your hours?", "9am-5pm"),
            FaqPair::new("Where are you located?", "Downtown"),
        ];
        let c = build_index(pairs, &provider).unwrap();

        let ranked = rank("What time do you open?", &c, &provider, 1).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].answer, "9am-5pm");
        assert_eq!(ranked[0].question, "What are your hours?");
    }
}
