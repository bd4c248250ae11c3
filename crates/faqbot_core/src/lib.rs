pub mod chat;
pub mod corpus;
pub mod embed;
pub mod error;
pub mod loader;
pub mod minilm_embed;
pub mod model;
pub mod retrieval;
pub mod session;

pub use chat::{is_exit_command, run_chat, separator, BufReadSource, LineSource};
pub use corpus::{build_index, Corpus};
pub use embed::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{FaqError, Result};
pub use loader::{load_faq_csv, read_faq_pairs};
pub use minilm_embed::{MiniLmEmbeddingProvider, MINILM_DIM};
pub use model::{FaqEntry, FaqPair, RankedAnswer};
pub use retrieval::{cosine_similarity, rank, rank_vector};
pub use session::FaqSession;
