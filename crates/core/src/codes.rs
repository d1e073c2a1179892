//! Merge table loading and rank lookup.
//!
//! A codes file holds one learned merge per line, two symbols separated
//! by a single space, ordered from most to least frequent. Text files
//! may start with a `#version:` header selecting the end-of-word
//! convention; byte files always start with a header line ending in
//! `byte` and always use the suffix convention.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str;

use ahash::AHashMap;

use crate::error::{Result, SegmentError};
use crate::mode::{trim_line, Mode};

/// End-of-word convention of a merge table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// `0.1`: the marker is a standalone symbol appended to the word.
    V0_1,
    /// `0.2`: the marker is a suffix on the word's final unit.
    V0_2,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Version::V0_1 => "0.1",
            Version::V0_2 => "0.2",
        })
    }
}

/// An ordered merge table with O(1) rank lookup.
///
/// Ranks are the zero-based position of each rule in the source;
/// duplicate rules keep their first position, so ranks may have gaps.
#[derive(Debug, Clone)]
pub struct MergeTable<M: Mode> {
    rules: Vec<(M::Sym, M::Sym)>,
    ranks: AHashMap<(M::Sym, M::Sym), u32>,
    version: Version,
}

impl<M: Mode> MergeTable<M> {
    /// Builds a table from rules in priority order.
    ///
    /// The rank of a rule is its position in `pairs`; repeated rules
    /// keep the rank of their first occurrence.
    pub fn from_pairs<I>(pairs: I, version: Version) -> Self
    where
        I: IntoIterator<Item = (M::Sym, M::Sym)>,
    {
        let mut rules = Vec::new();
        let mut ranks = AHashMap::new();
        for (idx, pair) in pairs.into_iter().enumerate() {
            if !ranks.contains_key(&pair) {
                ranks.insert(pair.clone(), idx as u32);
                rules.push(pair);
            }
        }
        Self {
            rules,
            ranks,
            version,
        }
    }

    /// Reads a codes file, keeping at most `limit` rules when given.
    ///
    /// In byte mode the first line is the marker header and is
    /// discarded. In text mode a leading `#version:` line selects the
    /// convention; without one the file is read as version 0.1.
    pub fn from_reader<R: BufRead>(mut reader: R, limit: Option<usize>) -> Result<Self> {
        let mut first = Vec::new();
        reader.read_until(b'\n', &mut first)?;

        let mut header = true;
        let version = if M::IS_BYTES {
            Version::V0_2
        } else if first.starts_with(b"#version:") {
            parse_version(&first)?
        } else {
            header = false;
            Version::V0_1
        };

        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        if !header {
            first.extend_from_slice(&data);
            data = first;
        }
        let offset = if header { 2 } else { 1 };

        let trailing = data.iter().rev().take_while(|&&b| b == b'\n').count();
        let body = &data[..data.len() - trailing];

        let mut pairs = Vec::new();
        for (idx, line) in body.split(|&b| b == b'\n').enumerate() {
            if limit.is_some_and(|n| idx >= n) {
                break;
            }
            let trimmed = trim_line(line);
            let mut fields = trimmed.split(|&b| b == b' ');
            let (left, right) = match (fields.next(), fields.next(), fields.next()) {
                (Some(left), Some(right), None) => (left, right),
                _ => {
                    return Err(SegmentError::MergeLine {
                        line: idx + offset,
                        content: String::from_utf8_lossy(trimmed).into_owned(),
                    })
                }
            };
            let utf8 = |err| SegmentError::CodesUtf8 {
                line: idx + offset,
                err,
            };
            pairs.push((
                M::parse_sym(left).map_err(utf8)?,
                M::parse_sym(right).map_err(utf8)?,
            ));
        }
        Ok(Self::from_pairs(pairs, version))
    }

    /// Reads a codes file from disk.
    pub fn from_path(path: &Path, limit: Option<usize>) -> Result<Self> {
        let file = File::open(path).map_err(|err| SegmentError::Io {
            path: path.to_path_buf(),
            err,
        })?;
        Self::from_reader(BufReader::new(file), limit)
    }

    /// Rank of a pair, if it is a learned merge.
    #[inline]
    pub fn rank(&self, left: &M::Sym, right: &M::Sym) -> Option<u32> {
        self.ranks.get(&(left.clone(), right.clone())).copied()
    }

    /// The end-of-word convention.
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Distinct rules, in rank order.
    pub fn rules(&self) -> &[(M::Sym, M::Sym)] {
        &self.rules
    }

    /// Number of distinct rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Maps each merged symbol back to the pair that produced it.
///
/// When two rules produce the same concatenation the lowest-rank split
/// is the one recovered; existing merge tables depend on that choice
/// through OOV-fallback output.
#[derive(Debug, Clone)]
pub struct ReverseMergeIndex<M: Mode> {
    parts: AHashMap<M::Sym, (M::Sym, M::Sym)>,
}

impl<M: Mode> ReverseMergeIndex<M> {
    /// Builds the index over every rule of `table`; on collision the
    /// first rule in rank order is kept.
    pub fn from_table(table: &MergeTable<M>) -> Self {
        let mut parts = AHashMap::with_capacity(table.len());
        for (left, right) in table.rules() {
            let merged = M::concat(left, right);
            if !parts.contains_key(&merged) {
                parts.insert(merged, (left.clone(), right.clone()));
            }
        }
        Self { parts }
    }

    /// The pair that merges into `merged`, if any rule does.
    #[inline]
    pub fn get(&self, merged: &M::Sym) -> Option<&(M::Sym, M::Sym)> {
        self.parts.get(merged)
    }

    /// Number of distinct merged symbols.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Whether the codes file at `path` declares byte mode.
///
/// Byte-mode files are written with a first line ending in `byte`.
pub fn sniff_byte_mode(path: &Path) -> Result<bool> {
    let file = File::open(path).map_err(|err| SegmentError::Io {
        path: path.to_path_buf(),
        err,
    })?;
    let mut reader = BufReader::new(file);
    let mut first = Vec::new();
    reader.read_until(b'\n', &mut first)?;
    Ok(first.ends_with(b"byte\n"))
}

/// Parses a `#version:` header line.
///
/// The tag is the last whitespace-separated field; redundant trailing
/// `.0` groups are ignored, so `0.2.0` reads as `0.2`.
fn parse_version(line: &[u8]) -> Result<Version> {
    let text = str::from_utf8(line).map_err(|err| SegmentError::CodesUtf8 { line: 1, err })?;
    let tag = text.split_whitespace().last().unwrap_or("");

    let mut trimmed = tag;
    while let Some(pos) = trimmed.rfind('.') {
        let rest = &trimmed[pos + 1..];
        if rest.is_empty() || !rest.bytes().all(|b| b == b'0') {
            break;
        }
        trimmed = &trimmed[..pos];
    }

    let parts: std::result::Result<Vec<u32>, _> =
        trimmed.split('.').map(str::parse::<u32>).collect();
    match parts.as_deref() {
        Ok([0, 1]) => Ok(Version::V0_1),
        Ok([0, 2]) => Ok(Version::V0_2),
        _ => Err(SegmentError::UnknownVersion(tag.to_string())),
    }
}
