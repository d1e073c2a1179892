//! Text and byte processing modes.
//!
//! A merge table either holds UTF-8 text (atomic units are Unicode
//! scalar values) or raw bytes (atomic units are single bytes). The
//! [`Mode`] trait abstracts over the two so the merge engine, glossary
//! isolation, and vocabulary filtering are written once.

use std::fmt;
use std::hash::Hash;
use std::str::{self, Utf8Error};

use compact_str::{CompactString, ToCompactString};

/// Characters stripped from line boundaries: space, CR, LF.
pub const STRIP_CHARS: &[u8] = b"\r\n ";

/// End-of-word marker appended before merging.
pub const EOW: &str = "</w>";

/// Returns `bytes` with leading and trailing [`STRIP_CHARS`] removed.
pub fn trim_line(bytes: &[u8]) -> &[u8] {
    let lead = bytes
        .iter()
        .take_while(|b| STRIP_CHARS.contains(b))
        .count();
    let trail = bytes[lead..]
        .iter()
        .rev()
        .take_while(|b| STRIP_CHARS.contains(b))
        .count();
    &bytes[lead..bytes.len() - trail]
}

/// A processing mode: the symbol representation plus the handful of
/// primitives whose implementation differs between text and bytes.
pub trait Mode: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Owned subword symbol.
    type Sym: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;
    /// Compiled glossary pattern.
    type Regex: Clone + fmt::Debug + Send + Sync + 'static;

    /// Whether merge table and input are treated as raw bytes.
    const IS_BYTES: bool;

    /// Parses a symbol from raw bytes, validating UTF-8 in text mode.
    fn parse_sym(bytes: &[u8]) -> Result<Self::Sym, Utf8Error>;

    /// Builds a symbol from a string.
    fn sym_from_str(s: &str) -> Self::Sym;

    /// The raw bytes of a symbol.
    fn sym_bytes(sym: &Self::Sym) -> &[u8];

    /// Splits a word into its atomic units.
    fn atoms(word: &Self::Sym) -> Vec<Self::Sym>;

    /// Number of atomic units in a word.
    fn unit_count(word: &Self::Sym) -> usize;

    /// Concatenation of two symbols.
    fn concat(left: &Self::Sym, right: &Self::Sym) -> Self::Sym;

    /// The end-of-word marker as a symbol.
    fn eow() -> Self::Sym;

    /// Removes a trailing end-of-word marker, if present.
    fn strip_eow(sym: &Self::Sym) -> Option<Self::Sym>;

    /// Compiles a glossary pattern.
    fn compile(pattern: &str) -> Result<Self::Regex, regex::Error>;

    /// Whether the pattern matches anywhere in the word.
    fn is_match(re: &Self::Regex, word: &Self::Sym) -> bool;

    /// Byte ranges of all non-overlapping matches, leftmost first.
    fn find_ranges(re: &Self::Regex, word: &Self::Sym) -> Vec<(usize, usize)>;

    /// The sub-symbol spanning the byte range `start..end`.
    fn slice(word: &Self::Sym, start: usize, end: usize) -> Self::Sym;
}

/// UTF-8 text mode. Symbols are strings and atomic units are Unicode
/// scalar values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextMode;

impl Mode for TextMode {
    type Sym = CompactString;
    type Regex = regex::Regex;

    const IS_BYTES: bool = false;

    fn parse_sym(bytes: &[u8]) -> Result<CompactString, Utf8Error> {
        str::from_utf8(bytes).map(CompactString::from)
    }

    fn sym_from_str(s: &str) -> CompactString {
        CompactString::from(s)
    }

    #[inline]
    fn sym_bytes(sym: &CompactString) -> &[u8] {
        sym.as_bytes()
    }

    fn atoms(word: &CompactString) -> Vec<CompactString> {
        word.chars().map(|c| c.to_compact_string()).collect()
    }

    #[inline]
    fn unit_count(word: &CompactString) -> usize {
        word.chars().count()
    }

    fn concat(left: &CompactString, right: &CompactString) -> CompactString {
        let mut out = left.clone();
        out.push_str(right);
        out
    }

    fn eow() -> CompactString {
        CompactString::from(EOW)
    }

    fn strip_eow(sym: &CompactString) -> Option<CompactString> {
        sym.strip_suffix(EOW).map(CompactString::from)
    }

    fn compile(pattern: &str) -> Result<regex::Regex, regex::Error> {
        regex::Regex::new(pattern)
    }

    #[inline]
    fn is_match(re: &regex::Regex, word: &CompactString) -> bool {
        re.is_match(word.as_str())
    }

    fn find_ranges(re: &regex::Regex, word: &CompactString) -> Vec<(usize, usize)> {
        re.find_iter(word.as_str())
            .map(|m| (m.start(), m.end()))
            .collect()
    }

    fn slice(word: &CompactString, start: usize, end: usize) -> CompactString {
        CompactString::from(&word.as_str()[start..end])
    }
}

/// Raw byte mode. Symbols are byte strings and atomic units are single
/// bytes; input never fails UTF-8 validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteMode;

impl Mode for ByteMode {
    type Sym = Vec<u8>;
    type Regex = regex::bytes::Regex;

    const IS_BYTES: bool = true;

    fn parse_sym(bytes: &[u8]) -> Result<Vec<u8>, Utf8Error> {
        Ok(bytes.to_vec())
    }

    fn sym_from_str(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    #[inline]
    fn sym_bytes(sym: &Vec<u8>) -> &[u8] {
        sym
    }

    fn atoms(word: &Vec<u8>) -> Vec<Vec<u8>> {
        word.iter().map(|&b| vec![b]).collect()
    }

    #[inline]
    fn unit_count(word: &Vec<u8>) -> usize {
        word.len()
    }

    fn concat(left: &Vec<u8>, right: &Vec<u8>) -> Vec<u8> {
        let mut out = left.clone();
        out.extend_from_slice(right);
        out
    }

    fn eow() -> Vec<u8> {
        EOW.as_bytes().to_vec()
    }

    fn strip_eow(sym: &Vec<u8>) -> Option<Vec<u8>> {
        sym.strip_suffix(EOW.as_bytes()).map(<[u8]>::to_vec)
    }

    fn compile(pattern: &str) -> Result<regex::bytes::Regex, regex::Error> {
        regex::bytes::Regex::new(pattern)
    }

    #[inline]
    fn is_match(re: &regex::bytes::Regex, word: &Vec<u8>) -> bool {
        re.is_match(word)
    }

    fn find_ranges(re: &regex::bytes::Regex, word: &Vec<u8>) -> Vec<(usize, usize)> {
        re.find_iter(word)
            .map(|m| (m.start(), m.end()))
            .collect()
    }

    fn slice(word: &Vec<u8>, start: usize, end: usize) -> Vec<u8> {
        word[start..end].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_line() {
        assert_eq!(trim_line(b"  a b \r\n"), b"a b");
        assert_eq!(trim_line(b"word"), b"word");
        assert_eq!(trim_line(b" \r\n "), b"");
        assert_eq!(trim_line(b""), b"");
        assert_eq!(trim_line(b"\ta\t"), b"\ta\t");
    }

    #[test]
    fn test_text_atoms_are_scalar_values() {
        let word = CompactString::from("καφέ");
        let atoms = TextMode::atoms(&word);
        assert_eq!(atoms.len(), 4);
        assert_eq!(atoms[0], "κ");
        assert_eq!(atoms[3], "έ");
        assert_eq!(TextMode::unit_count(&word), 4);
    }

    #[test]
    fn test_byte_atoms_are_single_bytes() {
        let word = "né".as_bytes().to_vec();
        let atoms = ByteMode::atoms(&word);
        assert_eq!(atoms.len(), 3);
        assert_eq!(atoms[0], b"n");
        assert_eq!(ByteMode::unit_count(&word), 3);
    }

    #[test]
    fn test_parse_sym_rejects_invalid_utf8_in_text_mode() {
        assert!(TextMode::parse_sym(&[0xFF, 0x61]).is_err());
        assert!(ByteMode::parse_sym(&[0xFF, 0x61]).is_ok());
    }

    #[test]
    fn test_concat_and_strip_eow() {
        let sym = TextMode::concat(&"low".into(), &TextMode::eow());
        assert_eq!(sym, "low</w>");
        assert_eq!(TextMode::strip_eow(&sym), Some("low".into()));
        assert_eq!(TextMode::strip_eow(&"low".into()), None);

        let sym = ByteMode::concat(&b"low".to_vec(), &ByteMode::eow());
        assert_eq!(sym, b"low</w>");
        assert_eq!(ByteMode::strip_eow(&sym), Some(b"low".to_vec()));
    }

    #[test]
    fn test_find_ranges_returns_byte_offsets() {
        let re = TextMode::compile("USA").unwrap();
        let word = CompactString::from("1934USABUSA");
        assert_eq!(TextMode::find_ranges(&re, &word), vec![(4, 7), (8, 11)]);
        assert_eq!(TextMode::slice(&word, 4, 7), "USA");
    }
}
