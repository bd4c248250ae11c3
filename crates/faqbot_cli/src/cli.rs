use std::path::PathBuf;

use clap::{Parser, ValueEnum};

pub const DEFAULT_DATA_PATH: &str = "data/marketing_faq.csv";
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "faqbot",
    version,
    about = "Answer questions from a FAQ table by embedding similarity"
)]
pub struct Cli {
    #[arg(help = "Question to answer (omit for interactive mode)")]
    pub question: Option<String>,

    #[arg(short, long, env = "FAQBOT_DATA", default_value = DEFAULT_DATA_PATH)]
    pub data: PathBuf,

    #[arg(long, env = "FAQBOT_DELIMITER", default_value_t = ',')]
    pub delimiter: char,

    #[arg(short = 'k', long = "top-k", env = "FAQBOT_TOP_K", default_value_t = 1)]
    pub top_k: usize,

    #[arg(short = 'o', long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// all-MiniLM-L6-v2 weights (.safetensors). Needs --tokenizer-path.
    #[arg(long, env = "FAQBOT_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    #[arg(long, env = "FAQBOT_TOKENIZER_PATH")]
    pub tokenizer_path: Option<PathBuf>,

    /// Dimension of the hashing embedder used when no model is given.
    #[arg(long, env = "FAQBOT_EMBEDDING_DIM", default_value_t = DEFAULT_EMBEDDING_DIM)]
    pub embedding_dim: usize,
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        if self.top_k == 0 {
            return Err("top-k must be >= 1".to_string());
        }

        if !self.delimiter.is_ascii() {
            return Err(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            ));
        }

        if self.model_path.is_some() != self.tokenizer_path.is_some() {
            return Err("--model-path and --tokenizer-path must both be provided".to_string());
        }

        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }
}
