mod cli;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use faqbot_core::{
    load_faq_csv, run_chat, separator, EmbeddingProvider, FaqSession, HashEmbeddingProvider,
    LineSource, MiniLmEmbeddingProvider, RankedAnswer,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, OutputFormat};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn make_embedder(cli: &Cli) -> Result<Box<dyn EmbeddingProvider>> {
    match (&cli.model_path, &cli.tokenizer_path) {
        (Some(model), Some(tokenizer)) => {
            info!(model = %model.display(), "loading MiniLM model");
            let provider = MiniLmEmbeddingProvider::load(model, tokenizer)
                .context("load embedding model")?;
            Ok(Box::new(provider))
        }
        _ => {
            info!(dim = cli.embedding_dim, "using hashing embedder");
            Ok(Box::new(HashEmbeddingProvider::new(cli.embedding_dim)))
        }
    }
}

fn print_answers(answers: &[RankedAnswer], cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(answers)?);
        }
        OutputFormat::Text => {
            for (i, answer) in answers.iter().enumerate() {
                if cli.top_k > 1 {
                    println!(
                        "[{}] score={:.4} question={}",
                        i + 1,
                        answer.score,
                        answer.question
                    );
                }
                println!("{}", answer.answer);
                println!("{}", separator());
            }
        }
    }
    Ok(())
}

/// rustyline-backed input for the interactive loop.
struct EditorSource {
    editor: DefaultEditor,
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> faqbot_core::Result<Option<String>> {
        loop {
            match self.editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        self.editor.add_history_entry(line.as_str()).ok();
                    }
                    return Ok(Some(line));
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => return Ok(None),
                Err(ReadlineError::Io(e)) => return Err(e.into()),
                Err(e) => return Err(io::Error::other(e.to_string()).into()),
            }
        }
    }
}

fn run_repl<E: EmbeddingProvider>(session: &FaqSession<E>) -> Result<()> {
    let mut source = EditorSource {
        editor: DefaultEditor::new().context("start line editor")?,
    };
    let answered = run_chat(session, &mut source, &mut io::stdout())?;
    info!(answered, "chat session ended");
    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.validate().map_err(anyhow::Error::msg)?;
    init_tracing();

    let embedder = make_embedder(&cli)?;
    let pairs = load_faq_csv(&cli.data, cli.delimiter_byte()).context("load FAQ data")?;
    let session = FaqSession::build(pairs, embedder).context("build FAQ index")?;

    match &cli.question {
        Some(question) => {
            let answers = session.ask(question, cli.top_k)?;
            print_answers(&answers, &cli)
        }
        None => run_repl(&session),
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
