//! Joint-vocab command implementation.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use ahash::AHashMap;
use anyhow::{bail, Context, Result as AnyhowResult};
use clap::Parser;

use bpeel_core::{sniff_byte_mode, trim_line, ByteMode, MergeTable, Mode, TextMode, WordEncoder};
use bpeel_segmenter::Segmenter;

use super::get_vocab::sorted_counts;

/// Joint-vocab command arguments.
#[derive(Parser)]
pub struct JointVocabCommand {
    /// Merge table produced by joint learning
    #[arg(short, long, value_name = "PATH")]
    pub codes: PathBuf,

    /// One corpus per side of the parallel data
    #[arg(short, long, value_name = "PATH", num_args(1..), required = true)]
    pub input: Vec<PathBuf>,

    /// One vocabulary file per corpus, in the same order
    #[arg(long, value_name = "PATH", num_args(1..), required = true)]
    pub vocab_output: Vec<PathBuf>,

    /// Separator appended to every piece of a token except its last
    #[arg(short, long, default_value = "@@")]
    pub separator: String,
}

pub fn run(cmd: JointVocabCommand) -> AnyhowResult<()> {
    if cmd.input.len() != cmd.vocab_output.len() {
        bail!(
            "got {} input files but {} vocabulary outputs; counts must match",
            cmd.input.len(),
            cmd.vocab_output.len()
        );
    }
    if sniff_byte_mode(&cmd.codes)? {
        run_mode::<ByteMode>(&cmd)
    } else {
        run_mode::<TextMode>(&cmd)
    }
}

fn run_mode<M: Mode>(cmd: &JointVocabCommand) -> AnyhowResult<()> {
    let table = MergeTable::<M>::from_path(&cmd.codes, None)?;
    log::info!(
        "loaded {} merge rules (version {}) from {}",
        table.len(),
        table.version(),
        cmd.codes.display()
    );
    let encoder = WordEncoder::new(table, M::sym_from_str(&cmd.separator));
    let mut segmenter = Segmenter::new(encoder);

    for (input, output) in cmd.input.iter().zip(&cmd.vocab_output) {
        let reader = BufReader::new(
            File::open(input).with_context(|| format!("opening corpus {}", input.display()))?,
        );
        let counts = count_pieces(&mut segmenter, reader)?;
        log::info!(
            "{}: {} distinct pieces",
            input.display(),
            counts.len()
        );

        let mut writer = BufWriter::new(
            File::create(output)
                .with_context(|| format!("creating vocabulary {}", output.display()))?,
        );
        for (piece, count) in sorted_counts(counts) {
            writer.write_all(M::sym_bytes(&piece))?;
            writeln!(writer, " {}", count)?;
        }
        writer.flush()?;
    }
    Ok(())
}

/// Segments every token of the corpus and counts the resulting pieces,
/// remembering the order of first appearance.
fn count_pieces<M: Mode, R: BufRead>(
    segmenter: &mut Segmenter<M>,
    mut reader: R,
) -> AnyhowResult<AHashMap<M::Sym, (u64, usize)>> {
    let mut counts: AHashMap<M::Sym, (u64, usize)> = AHashMap::new();
    let mut line = Vec::new();
    let mut tokens = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        tokens.clear();
        for raw in trim_line(&line).split(|&b| b == b' ') {
            if raw.is_empty() {
                continue;
            }
            tokens.push(M::parse_sym(raw)?);
        }
        for piece in segmenter.segment_tokens(&tokens) {
            let order = counts.len();
            counts.entry(piece).or_insert((0, order)).0 += 1;
        }
    }
    Ok(counts)
}
