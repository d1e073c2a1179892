//! Get-vocab command implementation.

use std::io::{BufRead, Write};

use ahash::AHashMap;
use anyhow::Result as AnyhowResult;
use clap::Parser;

use super::{open_input, open_output};

/// Get-vocab command arguments.
#[derive(Parser)]
pub struct GetVocabCommand {
    /// Corpus to count, "-" for stdin
    #[arg(short, long, value_name = "PATH", default_value = "-")]
    pub input: String,

    /// Vocabulary file to write, "-" for stdout
    #[arg(short, long, value_name = "PATH", default_value = "-")]
    pub output: String,
}

pub fn run(cmd: GetVocabCommand) -> AnyhowResult<()> {
    let reader = open_input(&cmd.input)?;
    let mut writer = open_output(&cmd.output)?;
    for (token, count) in sorted_counts(count_tokens(reader)?) {
        writer.write_all(&token)?;
        writeln!(writer, " {}", count)?;
    }
    writer.flush()?;
    Ok(())
}

/// ASCII whitespace, the token boundary set.
fn is_boundary(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c')
}

/// Counts whitespace-separated tokens byte-wise, remembering the order
/// of first appearance. Byte-wise counting serves text and byte-mode
/// corpora alike.
fn count_tokens<R: BufRead>(mut reader: R) -> AnyhowResult<AHashMap<Vec<u8>, (u64, usize)>> {
    let mut counts: AHashMap<Vec<u8>, (u64, usize)> = AHashMap::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        for token in line.split(|&b| is_boundary(b)) {
            if token.is_empty() {
                continue;
            }
            let order = counts.len();
            counts.entry(token.to_vec()).or_insert((0, order)).0 += 1;
        }
    }
    Ok(counts)
}

/// Orders counted tokens by count descending, ties by first appearance.
pub(crate) fn sorted_counts<K>(counts: AHashMap<K, (u64, usize)>) -> Vec<(K, u64)> {
    let mut entries: Vec<(K, (u64, usize))> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    entries
        .into_iter()
        .map(|(token, (count, _))| (token, count))
        .collect()
}
