use crate::corpus::{build_index, Corpus};
use crate::embed::EmbeddingProvider;
use crate::error::{FaqError, Result};
use crate::model::{FaqPair, RankedAnswer};
use crate::retrieval::rank;

/// A query-serving session: one embedder and the corpus it indexed.
pub struct FaqSession<E> {
    embedder: E,
    corpus: Corpus,
}

impl<E: EmbeddingProvider> FaqSession<E> {
    /// The corpus must have been embedded with `embedder`.
    pub fn new(embedder: E, corpus: Corpus) -> Self {
        Self { embedder, corpus }
    }

    pub fn build(pairs: Vec<FaqPair>, embedder: E) -> Result<Self> {
        let corpus = build_index(pairs, &embedder)?;
        Ok(Self { embedder, corpus })
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn ask(&self, query: &str, k: usize) -> Result<Vec<RankedAnswer>> {
        rank(query, &self.corpus, &self.embedder, k)
    }

    pub fn best_answer(&self, query: &str) -> Result<RankedAnswer> {
        self.ask(query, 1)?
            .into_iter()
            .next()
            .ok_or_else(|| FaqError::InvalidInput("corpus is empty".to_string()))
    }
}
