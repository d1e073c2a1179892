//! Char-ngrams command implementation.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use ahash::AHashMap;
use anyhow::{bail, Context, Result as AnyhowResult};
use clap::Parser;
use compact_str::CompactString;

use super::{open_input, open_output};

/// Char-ngrams command arguments.
#[derive(Parser)]
pub struct CharNgramsCommand {
    /// Vocabulary file ranking tokens from most to least frequent
    #[arg(long, value_name = "PATH")]
    pub vocab: PathBuf,

    /// Tokens ranked at or above this position stay whole
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub shortlist: usize,

    /// Number of characters per n-gram
    #[arg(short, long, default_value_t = 2, value_name = "N")]
    pub n: usize,

    /// Separator appended to every n-gram of a token except its last
    #[arg(short, long, default_value = "@@")]
    pub separator: String,

    /// Input text, "-" for stdin
    #[arg(short, long, value_name = "PATH", default_value = "-")]
    pub input: String,

    /// Output text, "-" for stdout
    #[arg(short, long, value_name = "PATH", default_value = "-")]
    pub output: String,
}

pub fn run(cmd: CharNgramsCommand) -> AnyhowResult<()> {
    if cmd.n == 0 {
        bail!("n-gram size must be at least 1");
    }

    let vocab_reader = BufReader::new(
        File::open(&cmd.vocab)
            .with_context(|| format!("cannot open vocabulary file {}", cmd.vocab.display()))?,
    );
    let ranks = load_ranks(vocab_reader)?;

    let reader = open_input(&cmd.input)?;
    let mut writer = open_output(&cmd.output)?;
    for line in reader.lines() {
        let line = line?;
        for word in line.split_whitespace() {
            match ranks.get(word) {
                Some(&rank) if rank <= cmd.shortlist => write!(writer, "{} ", word)?,
                _ => write_ngrams(&mut writer, word, cmd.n, &cmd.separator)?,
            }
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads token ranks from a vocabulary file; rank is the line position
/// and lines that are not `<token> <count>` are skipped.
fn load_ranks<R: BufRead>(reader: R) -> AnyhowResult<AHashMap<CompactString, usize>> {
    let mut ranks = AHashMap::new();
    let mut rank = 0;
    for line in reader.lines() {
        let line = line?;
        let mut fields = line.split_whitespace();
        if let (Some(token), Some(_), None) = (fields.next(), fields.next(), fields.next()) {
            ranks.insert(CompactString::from(token), rank);
            rank += 1;
        }
    }
    Ok(ranks)
}

/// Writes a token as n-sized character chunks, each followed by a
/// space, the separator in between.
fn write_ngrams<W: Write>(
    writer: &mut W,
    word: &str,
    n: usize,
    separator: &str,
) -> AnyhowResult<()> {
    let chars: Vec<char> = word.chars().collect();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + n).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        write!(writer, "{}", chunk)?;
        start = end;
        if start < chars.len() {
            write!(writer, "{}", separator)?;
        }
        write!(writer, " ")?;
    }
    Ok(())
}
