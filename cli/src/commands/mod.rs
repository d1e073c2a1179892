//! CLI commands for the bpeel segmenter.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use anyhow::{Context, Result};

pub mod apply;
pub mod char_ngrams;
pub mod chrf;
pub mod get_vocab;
pub mod joint_vocab;

pub use apply::ApplyCommand;
pub use char_ngrams::CharNgramsCommand;
pub use chrf::ChrfCommand;
pub use get_vocab::GetVocabCommand;
pub use joint_vocab::JointVocabCommand;

/// Opens a buffered reader over a file path, or stdin for `-`.
pub(crate) fn open_input(path: &str) -> Result<Box<dyn BufRead>> {
    if path == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        let file =
            File::open(path).with_context(|| format!("cannot open input file {}", path))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Opens a buffered writer over a file path, or stdout for `-`.
pub(crate) fn open_output(path: &str) -> Result<Box<dyn Write>> {
    if path == "-" {
        Ok(Box::new(BufWriter::new(io::stdout())))
    } else {
        let file =
            File::create(path).with_context(|| format!("cannot create output file {}", path))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}
