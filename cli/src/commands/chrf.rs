//! Chrf command implementation.
//!
//! Character n-gram F-score for machine translation evaluation
//! (Popović, 2015). Precision and recall are averaged over all n-gram
//! orders up to the maximum, then combined with recall weighted by
//! beta squared.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use ahash::AHashMap;
use anyhow::{bail, Context, Result as AnyhowResult};
use clap::Parser;
use compact_str::CompactString;

use super::open_input;

/// Chrf command arguments.
#[derive(Parser)]
pub struct ChrfCommand {
    /// Reference file
    #[arg(short = 'r', long = "ref", value_name = "PATH")]
    pub reference: PathBuf,

    /// Hypothesis file, "-" for stdin
    #[arg(long, value_name = "PATH", default_value = "-")]
    pub hyp: String,

    /// Weight of recall relative to precision
    #[arg(short, long, default_value_t = 3.0, value_name = "FLOAT")]
    pub beta: f64,

    /// Maximum n-gram length
    #[arg(short, long, default_value_t = 6, value_name = "INT")]
    pub ngram: usize,

    /// Keep spaces as characters instead of removing them
    #[arg(short, long)]
    pub space: bool,

    /// Also report precision
    #[arg(long)]
    pub precision: bool,

    /// Also report recall
    #[arg(long)]
    pub recall: bool,
}

/// N-gram counts bucketed by length; index i holds (i+1)-grams.
type NgramCounts = Vec<AHashMap<CompactString, u64>>;

pub fn run(cmd: ChrfCommand) -> AnyhowResult<()> {
    if cmd.ngram == 0 {
        bail!("n-gram order must be at least 1");
    }

    let reference = BufReader::new(
        File::open(&cmd.reference)
            .with_context(|| format!("cannot open reference file {}", cmd.reference.display()))?,
    );
    let mut hyp = open_input(&cmd.hyp)?;

    let mut correct = vec![0u64; cmd.ngram];
    let mut total_hyp = vec![0u64; cmd.ngram];
    let mut total_ref = vec![0u64; cmd.ngram];

    let mut hyp_line = String::new();
    for ref_line in reference.lines() {
        let ref_line = ref_line?;
        hyp_line.clear();
        hyp.read_line(&mut hyp_line)?;

        let ref_counts = extract_ngrams(&ref_line, cmd.ngram, cmd.space);
        let hyp_counts = extract_ngrams(&hyp_line, cmd.ngram, cmd.space);
        accumulate(&ref_counts, &hyp_counts, &mut correct, &mut total_hyp);
        for (rank, bucket) in ref_counts.iter().enumerate() {
            for &count in bucket.values() {
                total_ref[rank] += count;
            }
        }
    }

    let (score, precision, recall) = f_score(&correct, &total_hyp, &total_ref, cmd.beta);
    println!("chrF3: {:.4}", score);
    if cmd.precision {
        println!("chrPrec: {:.4}", precision);
    }
    if cmd.recall {
        println!("chrRec: {:.4}", recall);
    }
    Ok(())
}

/// Counts the character n-grams of a line, for all lengths up to
/// `max_len`. Whitespace is removed unless `spaces` is set, in which
/// case only boundary whitespace is trimmed.
fn extract_ngrams(line: &str, max_len: usize, spaces: bool) -> NgramCounts {
    let chars: Vec<char> = if spaces {
        line.trim().chars().collect()
    } else {
        line.split_whitespace().collect::<String>().chars().collect()
    };

    let mut counts: NgramCounts = vec![AHashMap::new(); max_len];
    for (len, bucket) in counts.iter_mut().enumerate() {
        for window in chars.windows(len + 1) {
            let key: CompactString = window.iter().collect();
            *bucket.entry(key).or_insert(0) += 1;
        }
    }
    counts
}

/// Adds one sentence pair to the running totals: every hypothesis
/// n-gram counts toward its rank's total, clipped matches toward
/// correct.
fn accumulate(
    ref_counts: &NgramCounts,
    hyp_counts: &NgramCounts,
    correct: &mut [u64],
    total_hyp: &mut [u64],
) {
    for (rank, bucket) in hyp_counts.iter().enumerate() {
        for (chain, &count) in bucket {
            total_hyp[rank] += count;
            if let Some(&ref_count) = ref_counts[rank].get(chain) {
                correct[rank] += count.min(ref_count);
            }
        }
    }
}

/// The chrF score with its averaged precision and recall.
///
/// Ranks where either side has no n-grams contribute zero but still
/// count toward the average.
fn f_score(
    correct: &[u64],
    total_hyp: &[u64],
    total_ref: &[u64],
    beta: f64,
) -> (f64, f64, f64) {
    let max_len = correct.len();
    let mut precision = 0.0;
    let mut recall = 0.0;
    for i in 0..max_len {
        if total_hyp[i] > 0 && total_ref[i] > 0 {
            precision += correct[i] as f64 / total_hyp[i] as f64;
            recall += correct[i] as f64 / total_ref[i] as f64;
        }
    }
    precision /= max_len as f64;
    recall /= max_len as f64;

    let denom = beta * beta * precision + recall;
    let score = if denom > 0.0 {
        (1.0 + beta * beta) * precision * recall / denom
    } else {
        0.0
    };
    (score, precision, recall)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_of(counts: &NgramCounts, rank: usize, key: &str) -> u64 {
        counts[rank].get(key).copied().unwrap_or(0)
    }

    #[test]
    fn test_extract_ngrams_removes_whitespace_by_default() {
        let counts = extract_ngrams("ab ab\n", 2, false);
        assert_eq!(count_of(&counts, 0, "a"), 2);
        assert_eq!(count_of(&counts, 0, "b"), 2);
        assert_eq!(count_of(&counts, 1, "ab"), 2);
        assert_eq!(count_of(&counts, 1, "ba"), 1);
        assert_eq!(count_of(&counts, 1, "b "), 0);
    }

    #[test]
    fn test_extract_ngrams_with_spaces_kept() {
        let counts = extract_ngrams("ab ab\n", 2, true);
        assert_eq!(count_of(&counts, 1, "b "), 1);
        assert_eq!(count_of(&counts, 1, " a"), 1);
    }

    #[test]
    fn test_identical_sentences_score_one() {
        let ref_counts = extract_ngrams("the cat sat", 6, false);
        let hyp_counts = extract_ngrams("the cat sat", 6, false);
        let mut correct = vec![0; 6];
        let mut total_hyp = vec![0; 6];
        let mut total_ref = vec![0; 6];
        accumulate(&ref_counts, &hyp_counts, &mut correct, &mut total_hyp);
        for (rank, bucket) in ref_counts.iter().enumerate() {
            for &count in bucket.values() {
                total_ref[rank] += count;
            }
        }
        let (score, precision, recall) = f_score(&correct, &total_hyp, &total_ref, 3.0);
        assert!((score - 1.0).abs() < 1e-9);
        assert!((precision - 1.0).abs() < 1e-9);
        assert!((recall - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_sentences_score_zero() {
        let ref_counts = extract_ngrams("aaaa", 2, false);
        let hyp_counts = extract_ngrams("bbbb", 2, false);
        let mut correct = vec![0; 2];
        let mut total_hyp = vec![0; 2];
        let mut total_ref = vec![0; 2];
        accumulate(&ref_counts, &hyp_counts, &mut correct, &mut total_hyp);
        for (rank, bucket) in ref_counts.iter().enumerate() {
            for &count in bucket.values() {
                total_ref[rank] += count;
            }
        }
        let (score, precision, recall) = f_score(&correct, &total_hyp, &total_ref, 3.0);
        assert_eq!(score, 0.0);
        assert_eq!(precision, 0.0);
        assert_eq!(recall, 0.0);
    }

    #[test]
    fn test_matches_are_clipped_to_reference_counts() {
        let ref_counts = extract_ngrams("ab", 1, false);
        let hyp_counts = extract_ngrams("ababab", 1, false);
        let mut correct = vec![0; 1];
        let mut total_hyp = vec![0; 1];
        accumulate(&ref_counts, &hyp_counts, &mut correct, &mut total_hyp);
        // three of each hypothesis character, one matchable apiece
        assert_eq!(correct[0], 2);
        assert_eq!(total_hyp[0], 6);
    }

    #[test]
    fn test_beta_weights_recall() {
        // precision 1.0, recall 0.5 at every rank
        let correct = [2];
        let total_hyp = [2];
        let total_ref = [4];
        let (balanced, ..) = f_score(&correct, &total_hyp, &total_ref, 1.0);
        let (recall_heavy, ..) = f_score(&correct, &total_hyp, &total_ref, 3.0);
        assert!(recall_heavy < balanced);
        assert!((balanced - 2.0 / 3.0).abs() < 1e-9);
        // (1 + 9) * (1 * 0.5) / (9 * 1 + 0.5)
        assert!((recall_heavy - 5.0 / 9.5).abs() < 1e-9);
    }
}
