use crate::error::{FaqError, Result};

/// Turns text into a fixed-length vector. Implementations must be
/// deterministic and return the same dimensionality for every input.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

impl EmbeddingProvider for Box<dyn EmbeddingProvider> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }
}

/// Rejects vectors with NaN or infinite components.
pub fn ensure_finite(embedding: &[f32], text: &str) -> Result<()> {
    match embedding.iter().position(|x| !x.is_finite()) {
        None => Ok(()),
        Some(i) => Err(FaqError::Embedding(format!(
            "non-finite component at index {i} for text {:?}",
            preview(text)
        ))),
    }
}

fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 40;
    if text.chars().count() <= MAX_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_CHARS).collect();
        format!("{head}...")
    }
}

/// Feature-hashing embedder: every lowercase alphanumeric token is hashed
/// (FNV-1a) into one of `dim` buckets and the counts are L2-normalized.
/// Needs no model files, which makes it the offline default.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dim: usize,
}

impl HashEmbeddingProvider {
    pub const MIN_DIM: usize = 8;

    pub fn new(dim: usize) -> Self {
        Self {
            dim: dim.max(Self::MIN_DIM),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn bucket(&self, token: &str) -> usize {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        for b in token.bytes() {
            h ^= u64::from(b);
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
        (h % self.dim as u64) as usize
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dim];

        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            v[self.bucket(token)] += 1.0;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }

        Ok(v)
    }
}
