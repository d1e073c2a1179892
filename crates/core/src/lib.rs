//! Bpeel-core - ranked subword merging over text or bytes
//!
//! This crate provides the apply-side machinery of byte-pair encoding
//! subword segmentation: loading a learned merge table, greedily
//! replaying its merges on single tokens, and the surrounding concerns
//! of glossary protection, vocabulary-restricted output, and merge
//! dropout.
//!
//! # Features
//!
//! - One engine over two modes: UTF-8 text and raw bytes
//! - Glossary patterns whose matches pass through segmentation whole
//! - Recursive merge reversal for pieces outside a fixed vocabulary
//! - Seedable merge dropout for segmentation-time regularization
//!
//! # Example
//!
//! ```rust
//! use bpeel_core::{Cache, MergeTable, TextMode, Version, WordEncoder};
//! use compact_str::CompactString;
//!
//! let pairs = [
//!     (CompactString::from("c"), CompactString::from("e")),
//!     (CompactString::from("ce"), CompactString::from("m")),
//! ];
//! let table = MergeTable::<TextMode>::from_pairs(pairs, Version::V0_2);
//! let encoder = WordEncoder::new(table, CompactString::from("@@"));
//!
//! let mut cache = Cache::new();
//! let pieces = encoder.encode(&CompactString::from("cem"), &mut cache, None);
//! assert_eq!(pieces, vec![CompactString::from("ce"), CompactString::from("m")]);
//! ```

pub mod error;
pub use error::{Result, SegmentError};

// Processing modes and shared line handling
pub mod mode;
pub use mode::{trim_line, ByteMode, Mode, TextMode, EOW, STRIP_CHARS};

// Merge table loading and indexing
pub mod codes;
pub use codes::{sniff_byte_mode, MergeTable, ReverseMergeIndex, Version};

// Segmentation-time concerns around the merge loop
pub mod cache;
pub mod encoder;
pub mod fallback;
pub mod glossary;
pub mod vocab;
pub use cache::{Cache, CacheStats};
pub use encoder::{MergeDropout, WordEncoder};
pub use fallback::check_vocab_and_split;
pub use glossary::{Glossaries, Span};
pub use vocab::Vocabulary;
