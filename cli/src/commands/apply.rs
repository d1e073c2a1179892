//! Apply command implementation.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{bail, Result as AnyhowResult};
use clap::Parser;

use bpeel_core::{
    sniff_byte_mode, ByteMode, Glossaries, MergeTable, Mode, TextMode, Vocabulary, WordEncoder,
};
use bpeel_segmenter::{segment_file, Segmenter};

use super::{open_input, open_output};

/// Apply command arguments.
#[derive(Parser)]
pub struct ApplyCommand {
    /// Path to the learned merge table
    #[arg(short, long, value_name = "PATH")]
    pub codes: PathBuf,

    /// Input text, "-" for stdin
    #[arg(short, long, value_name = "PATH", default_value = "-")]
    pub input: String,

    /// Output text, "-" for stdout
    #[arg(short, long, value_name = "PATH", default_value = "-")]
    pub output: String,

    /// Separator appended to every piece of a token except its last
    #[arg(short, long, default_value = "@@")]
    pub separator: String,

    /// Use only the first N merge operations of the table
    #[arg(short, long, value_name = "N")]
    pub merges: Option<usize>,

    /// Vocabulary file of `<token> <count>` lines; output pieces are
    /// restricted to it
    #[arg(long, value_name = "PATH")]
    pub vocabulary: Option<PathBuf>,

    /// Drop vocabulary entries with a count below this value
    #[arg(long, value_name = "N")]
    pub vocabulary_threshold: Option<i64>,

    /// Regex patterns whose matches pass through unsegmented, in
    /// priority order
    #[arg(long, value_name = "REGEX", num_args(1..))]
    pub glossaries: Vec<String>,

    /// Probability of dropping each merge candidate (BPE-dropout)
    #[arg(long, value_name = "P", default_value_t = 0.0)]
    pub dropout: f32,

    /// Seed for the dropout random stream
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Worker count for file input; 0 selects the available cores
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub num_workers: usize,
}

pub fn run(cmd: ApplyCommand) -> AnyhowResult<()> {
    if !(0.0..=1.0).contains(&cmd.dropout) {
        bail!("dropout must be within [0, 1], got {}", cmd.dropout);
    }

    // the codes file itself declares whether it holds text or bytes
    if sniff_byte_mode(&cmd.codes)? {
        run_mode::<ByteMode>(&cmd)
    } else {
        run_mode::<TextMode>(&cmd)
    }
}

fn run_mode<M: Mode>(cmd: &ApplyCommand) -> AnyhowResult<()> {
    let table = MergeTable::<M>::from_path(&cmd.codes, cmd.merges)?;
    log::info!(
        "loaded {} merge rules (version {})",
        table.len(),
        table.version()
    );

    let mut encoder = WordEncoder::new(table, M::sym_from_str(&cmd.separator));
    if let Some(path) = &cmd.vocabulary {
        let vocab = Vocabulary::from_path(path, cmd.vocabulary_threshold)?;
        log::info!("restricting output to {} vocabulary pieces", vocab.len());
        encoder = encoder.with_vocabulary(vocab);
    }
    if !cmd.glossaries.is_empty() {
        encoder = encoder.with_glossaries(Glossaries::new(&cmd.glossaries)?);
    }
    let segmenter = Segmenter::new(encoder).with_dropout(cmd.dropout, cmd.seed);

    let mut workers = cmd.num_workers;
    if workers == 0 {
        workers = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    }

    let mut output = open_output(&cmd.output)?;
    if cmd.input == "-" {
        if workers > 1 {
            log::warn!("parallel mode needs file input, falling back to a single worker");
        }
        let mut segmenter = segmenter;
        segmenter.segment_stream(open_input(&cmd.input)?, &mut output)?;
    } else if workers > 1 {
        segment_file(&segmenter, Path::new(&cmd.input), &mut output, workers)?;
    } else {
        let mut segmenter = segmenter;
        segmenter.segment_stream(open_input(&cmd.input)?, &mut output)?;
    }
    Ok(())
}
