use std::io::{BufRead, Write};

use tracing::warn;

use crate::embed::EmbeddingProvider;
use crate::error::Result;
use crate::session::FaqSession;

pub const PROMPT: &str = "You: ";
pub const WELCOME: &str = "Welcome to Marketing FAQ Chatbot! Type 'exit' to quit.";
pub const GOODBYE: &str = "Goodbye!";
pub const SEPARATOR_WIDTH: usize = 50;

pub fn separator() -> String {
    "-".repeat(SEPARATOR_WIDTH)
}

pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// Where the chat loop gets its input from. `Ok(None)` means end of input.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Reads lines from any buffered reader; the prompt is not echoed.
pub struct BufReadSource<R> {
    reader: R,
}

impl<R: BufRead> BufReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for BufReadSource<R> {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Answer queries from `source` with the session's top match until an exit
/// command or end of input. Returns the number of queries answered.
///
/// A query that fails is reported inline and the loop keeps going.
pub fn run_chat<E, S, W>(session: &FaqSession<E>, source: &mut S, out: &mut W) -> Result<usize>
where
    E: EmbeddingProvider,
    S: LineSource + ?Sized,
    W: Write + ?Sized,
{
    writeln!(out, "{WELCOME}")?;
    let mut answered = 0;

    while let Some(line) = source.read_line(PROMPT)? {
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if is_exit_command(query) {
            writeln!(out, "{GOODBYE}")?;
            break;
        }

        match session.best_answer(query) {
            Ok(best) => {
                writeln!(out, "Bot:")?;
                writeln!(out, "{}", best.answer)?;
                answered += 1;
            }
            Err(err) => {
                warn!(error = %err, "query failed");
                writeln!(out, "Bot: sorry, {err}")?;
            }
        }
        writeln!(out, "{}", separator())?;
        out.flush()?;
    }

    Ok(answered)
}
