//! The ranked merge engine.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cache::Cache;
use crate::codes::{MergeTable, ReverseMergeIndex, Version};
use crate::fallback::check_vocab_and_split;
use crate::glossary::Glossaries;
use crate::mode::Mode;
use crate::vocab::Vocabulary;

/// Stochastic merge suppression (BPE-dropout, Provilkov et al. 2019).
///
/// Each merge candidate is independently discarded with probability `p`
/// before rank selection, re-rolled on every pass. Segmentation under
/// dropout is non-deterministic unless seeded.
#[derive(Debug, Clone)]
pub struct MergeDropout {
    p: f32,
    rng: StdRng,
    seed: Option<u64>,
}

impl MergeDropout {
    /// Creates a dropout with probability `p` and an entropy-seeded
    /// random stream.
    ///
    /// # Panics
    ///
    /// Panics if `p` is not within `[0, 1]`.
    pub fn new(p: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&p),
            "dropout probability must be in [0, 1], got {}",
            p
        );
        Self {
            p,
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    /// Creates a dropout with probability `p` and a fixed seed.
    ///
    /// # Panics
    ///
    /// Panics if `p` is not within `[0, 1]`.
    pub fn with_seed(p: f32, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&p),
            "dropout probability must be in [0, 1], got {}",
            p
        );
        Self {
            p,
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// The drop probability.
    #[inline]
    pub fn p(&self) -> f32 {
        self.p
    }

    /// A dropout with the same probability and a stream derived for
    /// worker `index`: seed plus index when seeded, fresh entropy
    /// otherwise.
    pub fn fork(&self, index: u64) -> Self {
        match self.seed {
            Some(seed) => Self::with_seed(self.p, seed.wrapping_add(index)),
            None => Self::new(self.p),
        }
    }

    #[inline]
    fn discard(&mut self) -> bool {
        self.rng.gen::<f32>() < self.p
    }
}

/// Applies ranked merges to single tokens.
///
/// The encoder owns the read-only tables. Mutable per-run state, the
/// cache and the dropout stream, is passed into [`encode`] so workers
/// can share one encoder clone while keeping private state.
///
/// [`encode`]: WordEncoder::encode
#[derive(Debug, Clone)]
pub struct WordEncoder<M: Mode> {
    merges: MergeTable<M>,
    reverse: ReverseMergeIndex<M>,
    vocab: Option<Vocabulary<M>>,
    glossaries: Option<Glossaries<M>>,
    separator: M::Sym,
    eow: M::Sym,
}

impl<M: Mode> WordEncoder<M> {
    /// Creates an encoder over a loaded merge table.
    pub fn new(merges: MergeTable<M>, separator: M::Sym) -> Self {
        let reverse = ReverseMergeIndex::from_table(&merges);
        Self {
            merges,
            reverse,
            vocab: None,
            glossaries: None,
            separator,
            eow: M::eow(),
        }
    }

    /// Restricts output pieces to `vocab`; pieces outside it are
    /// recursively re-split.
    pub fn with_vocabulary(mut self, vocab: Vocabulary<M>) -> Self {
        self.vocab = Some(vocab);
        self
    }

    /// Protects glossary matches from merging.
    pub fn with_glossaries(mut self, glossaries: Glossaries<M>) -> Self {
        self.glossaries = Some(glossaries);
        self
    }

    /// The merge table.
    pub fn merges(&self) -> &MergeTable<M> {
        &self.merges
    }

    /// The end-of-word convention in effect.
    #[inline]
    pub fn version(&self) -> Version {
        self.merges.version()
    }

    /// The separator appended to non-final pieces.
    #[inline]
    pub fn separator(&self) -> &M::Sym {
        &self.separator
    }

    /// The configured glossaries, if any.
    pub fn glossaries(&self) -> Option<&Glossaries<M>> {
        self.glossaries.as_ref()
    }

    /// Encodes one token into subword pieces.
    ///
    /// Concatenating the pieces reconstructs the token exactly. Results
    /// are served from and recorded in `cache`, except under dropout
    /// where both directions are skipped.
    pub fn encode(
        &self,
        token: &M::Sym,
        cache: &mut Cache<M>,
        mut dropout: Option<&mut MergeDropout>,
    ) -> Vec<M::Sym> {
        if dropout.is_none() {
            if let Some(pieces) = cache.get(token) {
                return pieces.to_vec();
            }
        }

        if let Some(glossaries) = &self.glossaries {
            if glossaries.matches_token(token) {
                let pieces = vec![token.clone()];
                cache.insert(token.clone(), pieces.clone());
                return pieces;
            }
        }

        if M::unit_count(token) <= 1 {
            return vec![token.clone()];
        }

        let mut word = M::atoms(token);
        match self.merges.version() {
            Version::V0_1 => word.push(self.eow.clone()),
            Version::V0_2 => {
                let last = word.len() - 1;
                word[last] = M::concat(&word[last], &self.eow);
            }
        }

        // (rank, position) of every surviving adjacent pair, rebuilt
        // each pass; dropout re-rolls every candidate.
        let mut candidates: Vec<(u32, usize)> = Vec::new();
        while word.len() > 1 {
            candidates.clear();
            for i in 0..word.len() - 1 {
                if let Some(d) = dropout.as_deref_mut() {
                    if d.discard() {
                        continue;
                    }
                }
                if let Some(rank) = self.merges.rank(&word[i], &word[i + 1]) {
                    candidates.push((rank, i));
                }
            }
            let Some(best) = candidates.iter().map(|&(rank, _)| rank).min() else {
                break;
            };

            // merge every surviving occurrence left to right, skipping
            // overlaps with a just-merged pair
            let mut merged: Option<M::Sym> = None;
            let mut next = Vec::with_capacity(word.len());
            let mut from = 0;
            for &(rank, at) in &candidates {
                if rank != best || at < from {
                    continue;
                }
                next.extend_from_slice(&word[from..at]);
                let sym = merged.get_or_insert_with(|| M::concat(&word[at], &word[at + 1]));
                next.push(sym.clone());
                from = at + 2;
            }
            next.extend_from_slice(&word[from..]);
            word = next;
        }

        if word.last() == Some(&self.eow) {
            word.pop();
        } else if let Some(stripped) = word.last().and_then(M::strip_eow) {
            let last = word.len() - 1;
            word[last] = stripped;
        }

        if let Some(vocab) = &self.vocab {
            word = check_vocab_and_split(&word, &self.reverse, vocab, &self.separator, &self.eow);
        }

        if dropout.is_none() {
            cache.insert(token.clone(), word.clone());
        }
        word
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{ByteMode, TextMode};
    use compact_str::CompactString;

    fn s(text: &str) -> CompactString {
        CompactString::from(text)
    }

    fn pieces(words: &[&str]) -> Vec<CompactString> {
        words.iter().map(|w| s(w)).collect()
    }

    fn table(rules: &[(&str, &str)], version: Version) -> MergeTable<TextMode> {
        MergeTable::from_pairs(
            rules.iter().map(|&(l, r)| (s(l), s(r))),
            version,
        )
    }

    fn encoder(rules: &[(&str, &str)], version: Version) -> WordEncoder<TextMode> {
        WordEncoder::new(table(rules, version), s("@@"))
    }

    #[test]
    fn test_lowest_rank_merges_first() {
        // "cement" resolves to the canonical "cem ent" split
        let enc = encoder(
            &[
                ("e", "n"),
                ("en", "t</w>"),
                ("c", "e"),
                ("ce", "m"),
            ],
            Version::V0_2,
        );
        let mut cache = Cache::new();
        assert_eq!(enc.encode(&s("cement"), &mut cache, None), pieces(&["cem", "ent"]));
    }

    #[test]
    fn test_version_0_1_appends_standalone_marker() {
        // under 0.1 the marker is its own symbol; ("n", "</w>") can fire
        let enc = encoder(&[("o", "n"), ("on", "</w>")], Version::V0_1);
        let mut cache = Cache::new();
        assert_eq!(enc.encode(&s("on"), &mut cache, None), pieces(&["on"]));
        // unmerged marker is dropped from the output
        let enc = encoder(&[("i", "r")], Version::V0_1);
        assert_eq!(enc.encode(&s("iron"), &mut cache, None), pieces(&["ir", "o", "n"]));
    }

    #[test]
    fn test_version_0_2_suffixes_final_unit() {
        let enc = encoder(&[("o", "n</w>")], Version::V0_2);
        let mut cache = Cache::new();
        assert_eq!(enc.encode(&s("iron"), &mut cache, None), pieces(&["i", "r", "on"]));
        // a plain ("o", "n") rule does not match the suffixed unit
        let enc = encoder(&[("o", "n")], Version::V0_2);
        let mut cache = Cache::new();
        assert_eq!(enc.encode(&s("iron"), &mut cache, None), pieces(&["i", "r", "o", "n"]));
    }

    #[test]
    fn test_single_unit_token_is_returned_whole() {
        let enc = encoder(&[("a", "b")], Version::V0_2);
        let mut cache = Cache::new();
        assert_eq!(enc.encode(&s("a"), &mut cache, None), pieces(&["a"]));
        assert_eq!(enc.encode(&s("é"), &mut cache, None), pieces(&["é"]));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_all_occurrences_merge_in_one_pass() {
        let enc = encoder(&[("a", "b")], Version::V0_2);
        let mut cache = Cache::new();
        assert_eq!(
            enc.encode(&s("ababab"), &mut cache, None),
            pieces(&["ab", "ab", "a", "b"])
        );
    }

    #[test]
    fn test_overlapping_occurrences_keep_left_bias() {
        // candidates at 0, 1, 2; position 1 overlaps the merge at 0
        let enc = encoder(&[("a", "a")], Version::V0_2);
        let mut cache = Cache::new();
        assert_eq!(
            enc.encode(&s("aaaa"), &mut cache, None),
            pieces(&["aa", "a", "a"])
        );
    }

    #[test]
    fn test_round_trip_reconstruction() {
        let enc = encoder(
            &[("l", "o"), ("lo", "w"), ("e", "r</w>")],
            Version::V0_2,
        );
        let mut cache = Cache::new();
        for token in ["lower", "lowest", "low", "l"] {
            let out = enc.encode(&s(token), &mut cache, None);
            let joined: String = out.iter().map(|p| p.as_str()).collect();
            assert_eq!(joined, token);
        }
    }

    #[test]
    fn test_repeated_encodes_hit_the_cache() {
        let enc = encoder(&[("l", "o")], Version::V0_2);
        let mut cache = Cache::new();
        let first = enc.encode(&s("low"), &mut cache, None);
        let second = enc.encode(&s("low"), &mut cache, None);
        assert_eq!(first, second);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn test_glossary_full_match_passes_through() {
        let glossaries = Glossaries::new(&["USA"]).unwrap();
        let enc = encoder(&[("U", "S")], Version::V0_2).with_glossaries(glossaries);
        let mut cache = Cache::new();
        assert_eq!(enc.encode(&s("USA"), &mut cache, None), pieces(&["USA"]));
        // full matches are deterministic and stay cached
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_byte_mode_merges_single_bytes() {
        let rules = [
            (b"a".to_vec(), b"b".to_vec()),
            (b"ab".to_vec(), b"c</w>".to_vec()),
        ];
        let table = MergeTable::<ByteMode>::from_pairs(rules, Version::V0_2);
        let enc = WordEncoder::new(table, b"@@".to_vec());
        let mut cache = Cache::new();
        assert_eq!(
            enc.encode(&b"abc".to_vec(), &mut cache, None),
            vec![b"abc".to_vec()]
        );
        // invalid UTF-8 is just another byte; the final byte is
        // suffixed, so the plain ("a", "b") rule cannot fire
        assert_eq!(
            enc.encode(&vec![0xFF, b'a', b'b'], &mut cache, None),
            vec![vec![0xFF], b"a".to_vec(), b"b".to_vec()]
        );
    }

    #[test]
    fn test_dropout_one_atomizes() {
        let enc = encoder(&[("l", "o"), ("lo", "w</w>")], Version::V0_2);
        let mut cache = Cache::new();
        let mut dropout = MergeDropout::with_seed(1.0, 7);
        assert_eq!(
            enc.encode(&s("low"), &mut cache, Some(&mut dropout)),
            pieces(&["l", "o", "w"])
        );
    }

    #[test]
    fn test_dropout_zero_matches_plain_encoding() {
        let enc = encoder(&[("l", "o"), ("lo", "w</w>")], Version::V0_2);
        let mut cache = Cache::new();
        let mut dropout = MergeDropout::with_seed(0.0, 7);
        let with = enc.encode(&s("low"), &mut cache, Some(&mut dropout));
        let without = enc.encode(&s("low"), &mut cache, None);
        assert_eq!(with, without);
    }

    #[test]
    fn test_dropout_skips_the_cache() {
        let enc = encoder(&[("l", "o")], Version::V0_2);
        let mut cache = Cache::new();
        cache.insert(s("low"), pieces(&["WRONG"]));
        let mut dropout = MergeDropout::with_seed(0.0, 7);
        // neither served from the stale entry nor overwriting it
        let out = enc.encode(&s("low"), &mut cache, Some(&mut dropout));
        assert_eq!(out, pieces(&["lo", "w"]));
        assert_eq!(cache.get(&s("low")), Some(&pieces(&["WRONG"])[..]));
    }

    #[test]
    fn test_seeded_dropout_is_reproducible() {
        let enc = encoder(
            &[("a", "b"), ("ab", "a"), ("aba", "b</w>")],
            Version::V0_2,
        );
        let mut first = Vec::new();
        let mut second = Vec::new();
        for (out, seed) in [(&mut first, 42), (&mut second, 42)] {
            let mut cache = Cache::new();
            let mut dropout = MergeDropout::with_seed(0.5, seed);
            for _ in 0..20 {
                out.push(enc.encode(&s("abab"), &mut cache, Some(&mut dropout)));
            }
        }
        assert_eq!(first, second);
    }

    #[test]
    fn test_fork_with_seed_offsets_the_stream() {
        let base = MergeDropout::with_seed(0.5, 100);
        let mut fork0 = base.fork(0);
        let mut fork0_again = base.fork(0);
        let mut fork1 = base.fork(1);
        let a: Vec<bool> = (0..32).map(|_| fork0.discard()).collect();
        let b: Vec<bool> = (0..32).map(|_| fork0_again.discard()).collect();
        let c: Vec<bool> = (0..32).map(|_| fork1.discard()).collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    #[should_panic(expected = "dropout probability must be in [0, 1]")]
    fn test_out_of_range_probability_panics() {
        MergeDropout::new(1.5);
    }
}
