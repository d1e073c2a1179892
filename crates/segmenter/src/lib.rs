//! Bpeel-segmenter - whitespace handling and I/O drivers
//!
//! This crate turns the single-token engine of `bpeel-core` into a
//! line-oriented pipeline: splitting lines into tokens around literal
//! spaces, reattaching boundary whitespace verbatim, and driving whole
//! files either sequentially or across parallel workers on line-aligned
//! byte ranges.

pub mod parallel;
pub mod segmenter;

pub use parallel::segment_file;
pub use segmenter::Segmenter;
