//! Output-piece vocabulary with frequency thresholding.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str;

use ahash::AHashSet;

use crate::error::{Result, SegmentError};
use crate::mode::{trim_line, Mode};

/// The set of allowed output pieces.
///
/// Read from `<token> <count>` lines; merged pieces that are not in the
/// set are recursively re-split at segmentation time.
#[derive(Debug, Clone)]
pub struct Vocabulary<M: Mode> {
    pieces: AHashSet<M::Sym>,
}

impl<M: Mode> Vocabulary<M> {
    /// Builds a vocabulary from pieces directly.
    pub fn from_pieces<I>(pieces: I) -> Self
    where
        I: IntoIterator<Item = M::Sym>,
    {
        Self {
            pieces: pieces.into_iter().collect(),
        }
    }

    /// Reads a vocabulary, keeping entries with a count of at least
    /// `threshold` when one is given.
    pub fn from_reader<R: BufRead>(mut reader: R, threshold: Option<i64>) -> Result<Self> {
        let mut pieces = AHashSet::new();
        let mut buf = Vec::new();
        let mut line_no = 0;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_no += 1;
            let trimmed = trim_line(&buf);
            let malformed = || SegmentError::VocabLine {
                line: line_no,
                content: String::from_utf8_lossy(trimmed).into_owned(),
            };

            let mut fields = trimmed.split(|&b| b == b' ');
            let (token, count) = match (fields.next(), fields.next(), fields.next()) {
                (Some(token), Some(count), None) => (token, count),
                _ => return Err(malformed()),
            };
            let piece = M::parse_sym(token)
                .map_err(|err| SegmentError::VocabUtf8 { line: line_no, err })?;
            let count: i64 = str::from_utf8(count)
                .ok()
                .and_then(|c| c.parse().ok())
                .ok_or_else(malformed)?;

            if threshold.map_or(true, |t| count >= t) {
                pieces.insert(piece);
            }
        }
        Ok(Self { pieces })
    }

    /// Reads a vocabulary file from disk.
    pub fn from_path(path: &Path, threshold: Option<i64>) -> Result<Self> {
        let file = File::open(path).map_err(|err| SegmentError::Io {
            path: path.to_path_buf(),
            err,
        })?;
        Self::from_reader(BufReader::new(file), threshold)
    }

    /// Whether `piece` is an allowed output piece.
    #[inline]
    pub fn contains(&self, piece: &M::Sym) -> bool {
        self.pieces.contains(piece)
    }

    /// Number of allowed pieces.
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}
