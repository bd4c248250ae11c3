use std::path::Path;

use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Embedding, LayerNorm, Linear, VarBuilder};
use tracing::debug;

use crate::embed::EmbeddingProvider;
use crate::error::{FaqError, Result};

/// Output dimensionality of all-MiniLM-L6-v2.
pub const MINILM_DIM: usize = 384;

// Hyperparameters of sentence-transformers/all-MiniLM-L6-v2.
const VOCAB_SIZE: usize = 30522;
const MAX_POSITIONS: usize = 512;
/// Token limit sentence-transformers applies to this model.
pub const MAX_SEQ_LEN: usize = 256;
const TYPE_VOCAB_SIZE: usize = 2;
const NUM_LAYERS: usize = 6;
const NUM_HEADS: usize = 12;
const INTERMEDIATE_SIZE: usize = 1536;
const LAYER_NORM_EPS: f64 = 1e-12;

struct EncoderLayer {
    query: Linear,
    key: Linear,
    value: Linear,
    attention_out: Linear,
    attention_norm: LayerNorm,
    intermediate: Linear,
    output: Linear,
    output_norm: LayerNorm,
}

impl EncoderLayer {
    fn load(vb: VarBuilder) -> candle_core::Result<Self> {
        let h = MINILM_DIM;
        let attn = vb.pp("attention");
        Ok(Self {
            query: candle_nn::linear(h, h, attn.pp("self.query"))?,
            key: candle_nn::linear(h, h, attn.pp("self.key"))?,
            value: candle_nn::linear(h, h, attn.pp("self.value"))?,
            attention_out: candle_nn::linear(h, h, attn.pp("output.dense"))?,
            attention_norm: candle_nn::layer_norm(h, LAYER_NORM_EPS, attn.pp("output.LayerNorm"))?,
            intermediate: candle_nn::linear(h, INTERMEDIATE_SIZE, vb.pp("intermediate.dense"))?,
            output: candle_nn::linear(INTERMEDIATE_SIZE, h, vb.pp("output.dense"))?,
            output_norm: candle_nn::layer_norm(h, LAYER_NORM_EPS, vb.pp("output.LayerNorm"))?,
        })
    }

    /// (batch, seq, hidden) -> (batch, heads, seq, head_dim)
    fn split_heads(x: &Tensor) -> candle_core::Result<Tensor> {
        let (batch, seq_len, _) = x.dims3()?;
        x.reshape((batch, seq_len, NUM_HEADS, MINILM_DIM / NUM_HEADS))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn self_attention(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let (batch, seq_len, _) = x.dims3()?;
        let q = Self::split_heads(&self.query.forward(x)?)?;
        let k = Self::split_heads(&self.key.forward(x)?)?;
        let v = Self::split_heads(&self.value.forward(x)?)?;

        let scale = 1.0 / ((MINILM_DIM / NUM_HEADS) as f64).sqrt();
        let scores = q.matmul(&k.t()?.contiguous()?)?.affine(scale, 0.0)?;
        let weights = candle_nn::ops::softmax_last_dim(&scores)?;

        let context = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, seq_len, MINILM_DIM))?;
        self.attention_out.forward(&context)
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let attended = self.self_attention(x)?;
        let x = self.attention_norm.forward(&(x + attended)?)?;

        let ff = self.intermediate.forward(&x)?.gelu_erf()?;
        let ff = self.output.forward(&ff)?;
        self.output_norm.forward(&(x + ff)?)
    }
}

/// BERT encoder with mean pooling over the token states.
struct MiniLmEncoder {
    word_embeddings: Embedding,
    position_embeddings: Embedding,
    token_type_embeddings: Embedding,
    embedding_norm: LayerNorm,
    layers: Vec<EncoderLayer>,
    device: Device,
}

impl MiniLmEncoder {
    fn load(path: &Path, device: Device) -> candle_core::Result<Self> {
        // Safety: the weights file is mapped read-only and must not be
        // modified while the provider is alive.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, &device)? };

        let emb = vb.pp("embeddings");
        let word_embeddings = candle_nn::embedding(VOCAB_SIZE, MINILM_DIM, emb.pp("word_embeddings"))?;
        let position_embeddings =
            candle_nn::embedding(MAX_POSITIONS, MINILM_DIM, emb.pp("position_embeddings"))?;
        let token_type_embeddings =
            candle_nn::embedding(TYPE_VOCAB_SIZE, MINILM_DIM, emb.pp("token_type_embeddings"))?;
        let embedding_norm = candle_nn::layer_norm(MINILM_DIM, LAYER_NORM_EPS, emb.pp("LayerNorm"))?;

        let layers = (0..NUM_LAYERS)
            .map(|i| EncoderLayer::load(vb.pp(format!("encoder.layer.{i}"))))
            .collect::<candle_core::Result<Vec<_>>>()?;

        Ok(Self {
            word_embeddings,
            position_embeddings,
            token_type_embeddings,
            embedding_norm,
            layers,
            device,
        })
    }

    fn forward(&self, token_ids: &[u32]) -> candle_core::Result<Vec<f32>> {
        let seq_len = token_ids.len();
        let ids = Tensor::new(token_ids, &self.device)?.unsqueeze(0)?;
        let positions = Tensor::arange(0u32, seq_len as u32, &self.device)?.unsqueeze(0)?;
        let token_types = Tensor::zeros((1, seq_len), DType::U32, &self.device)?;

        let hidden = ((self.word_embeddings.forward(&ids)?
            + self.position_embeddings.forward(&positions)?)?
            + self.token_type_embeddings.forward(&token_types)?)?;
        let mut hidden = self.embedding_norm.forward(&hidden)?;

        for layer in &self.layers {
            hidden = layer.forward(&hidden)?;
        }

        hidden.mean(1)?.squeeze(0)?.to_vec1::<f32>()
    }
}

/// all-MiniLM-L6-v2 sentence embeddings computed locally on the CPU.
/// Vectors are L2-normalized and have [`MINILM_DIM`] components.
pub struct MiniLmEmbeddingProvider {
    encoder: MiniLmEncoder,
    tokenizer: tokenizers::Tokenizer,
}

impl MiniLmEmbeddingProvider {
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        let encoder = MiniLmEncoder::load(model_path, Device::Cpu).map_err(|e| {
            FaqError::Embedding(format!("load model {}: {e}", model_path.display()))
        })?;
        let tokenizer = tokenizers::Tokenizer::from_file(tokenizer_path).map_err(|e| {
            FaqError::Embedding(format!("load tokenizer {}: {e}", tokenizer_path.display()))
        })?;
        debug!(model = %model_path.display(), "loaded MiniLM encoder");

        Ok(Self { encoder, tokenizer })
    }

    fn token_ids(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| FaqError::Embedding(format!("tokenize: {e}")))?;
        Ok(truncate_ids(encoding.get_ids().to_vec()))
    }
}

/// Cut to [`MAX_SEQ_LEN`] tokens, keeping the trailing [SEP].
fn truncate_ids(mut ids: Vec<u32>) -> Vec<u32> {
    if ids.len() > MAX_SEQ_LEN {
        let last = ids[ids.len() - 1];
        ids.truncate(MAX_SEQ_LEN - 1);
        ids.push(last);
    }
    ids
}

impl EmbeddingProvider for MiniLmEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let ids = self.token_ids(text)?;
        if ids.is_empty() {
            return Ok(vec![0.0; MINILM_DIM]);
        }

        let mut pooled = self.encoder.forward(&ids)?;
        let norm = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            pooled.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(pooled)
    }
}
