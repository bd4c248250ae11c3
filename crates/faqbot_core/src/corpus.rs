use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::embed::{ensure_finite, EmbeddingProvider};
use crate::error::{FaqError, Result};
use crate::model::{FaqEntry, FaqPair};

/// Immutable, ordered collection of indexed FAQ entries sharing one
/// embedding dimensionality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    entries: Vec<FaqEntry>,
    dim: usize,
}

impl Corpus {
    /// Wrap already-embedded entries, checking that all embeddings are finite
    /// and share the first entry's dimensionality.
    pub fn from_entries(entries: Vec<FaqEntry>) -> Result<Self> {
        let dim = entries.first().map_or(0, |e| e.embedding.len());

        for entry in &entries {
            if entry.embedding.len() != dim {
                return Err(FaqError::DimensionMismatch {
                    expected: dim,
                    actual: entry.embedding.len(),
                });
            }
            ensure_finite(&entry.embedding, &entry.answer)?;
        }

        Ok(Self { entries, dim })
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FaqEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding dimensionality; 0 for an empty corpus.
    pub fn dim(&self) -> usize {
        self.dim
    }
}

/// Embed every answer once and collect the results into a [`Corpus`].
///
/// Pairs with an empty (or whitespace-only) answer are skipped with a
/// warning. Embedding calls run in parallel; the corpus keeps input order.
/// A provider failure or a non-finite embedding fails the whole batch.
pub fn build_index<E>(pairs: Vec<FaqPair>, embedder: &E) -> Result<Corpus>
where
    E: EmbeddingProvider + ?Sized,
{
    let total = pairs.len();
    let kept: Vec<FaqPair> = pairs
        .into_iter()
        .enumerate()
        .filter_map(|(row, pair)| {
            if pair.answer.trim().is_empty() {
                warn!(row, question = %pair.question, "skipping FAQ row with empty answer");
                None
            } else {
                Some(pair)
            }
        })
        .collect();

    debug!(entries = kept.len(), "embedding FAQ answers");
    let entries = kept
        .into_par_iter()
        .map(|pair| {
            let embedding = embedder.embed(&pair.answer)?;
            Ok(FaqEntry {
                question: pair.question,
                answer: pair.answer,
                embedding,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let corpus = Corpus::from_entries(entries)?;
    info!(
        indexed = corpus.len(),
        skipped = total - corpus.len(),
        dim = corpus.dim(),
        "built FAQ index"
    );
    Ok(corpus)
}
