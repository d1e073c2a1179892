//! Error types for the segmentation library.

use std::path::PathBuf;
use std::str::Utf8Error;

use thiserror::Error;

/// Main error type for loading resources and segmenting text.
#[derive(Error, Debug)]
pub enum SegmentError {
    /// I/O error with file context
    #[error("I/O error for {path}: {err}")]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// I/O error on a stream without file context
    #[error("I/O error: {0}")]
    Stream(#[from] std::io::Error),

    /// Merge table line that is not two space-separated symbols
    #[error("invalid line {line} in codes file: '{content}' (expected exactly two symbols separated by a space)")]
    MergeLine { line: usize, content: String },

    /// Merge table line that is not valid UTF-8 in text mode
    #[error("invalid UTF-8 on line {line} of codes file")]
    CodesUtf8 {
        line: usize,
        #[source]
        err: Utf8Error,
    },

    /// Version header naming an unknown end-of-word convention
    #[error("unknown codes file version: {0}")]
    UnknownVersion(String),

    /// Vocabulary line that is not `<token> <count>`
    #[error("invalid line {line} in vocabulary file: '{content}' (expected '<token> <count>')")]
    VocabLine { line: usize, content: String },

    /// Vocabulary line that is not valid UTF-8 in text mode
    #[error("invalid UTF-8 on line {line} of vocabulary file")]
    VocabUtf8 {
        line: usize,
        #[source]
        err: Utf8Error,
    },

    /// Glossary entry that does not compile as a regular expression
    #[error("invalid glossary pattern '{pattern}': {err}")]
    GlossaryPattern {
        pattern: String,
        #[source]
        err: regex::Error,
    },

    /// Input line that is not valid UTF-8 in text mode
    #[error("input line is not valid UTF-8: {0}")]
    LineUtf8(#[from] Utf8Error),
}

/// Result type alias for segmentation operations.
pub type Result<T> = std::result::Result<T, SegmentError>;
