//! Vocabulary checking with recursive merge reversal.

use crate::codes::ReverseMergeIndex;
use crate::mode::Mode;
use crate::vocab::Vocabulary;

/// Re-splits the out-of-vocabulary pieces of a finished word.
///
/// Non-final pieces are checked as `piece + separator`, the final piece
/// bare; any piece failing the check is decomposed by reversing the
/// merge that produced it, recursively, until every emitted part passes
/// or cannot be split further.
pub fn check_vocab_and_split<M: Mode>(
    word: &[M::Sym],
    reverse: &ReverseMergeIndex<M>,
    vocab: &Vocabulary<M>,
    separator: &M::Sym,
    eow: &M::Sym,
) -> Vec<M::Sym> {
    let mut out = Vec::with_capacity(word.len());
    if let Some((final_piece, rest)) = word.split_last() {
        for piece in rest {
            if vocab.contains(&M::concat(piece, separator)) {
                out.push(piece.clone());
            } else {
                log::debug!("OOV piece {:?}, reversing merges", piece);
                recursive_split::<M>(&mut out, piece, reverse, vocab, separator, eow, false);
            }
        }
        if vocab.contains(final_piece) {
            out.push(final_piece.clone());
        } else {
            log::debug!("OOV piece {:?}, reversing merges", final_piece);
            recursive_split::<M>(&mut out, final_piece, reverse, vocab, separator, eow, true);
        }
    }
    out
}

/// Decomposes one segment via the reverse index.
///
/// A final segment is looked up with the end-of-word marker appended
/// and the marker is stripped back off the recovered right part; the
/// final flag follows the right part down the recursion.
fn recursive_split<M: Mode>(
    out: &mut Vec<M::Sym>,
    segment: &M::Sym,
    reverse: &ReverseMergeIndex<M>,
    vocab: &Vocabulary<M>,
    separator: &M::Sym,
    eow: &M::Sym,
    is_final: bool,
) {
    let parts = if is_final {
        reverse.get(&M::concat(segment, eow)).map(|(left, right)| {
            let right = M::strip_eow(right).unwrap_or_else(|| right.clone());
            (left.clone(), right)
        })
    } else {
        reverse.get(segment).cloned()
    };
    let Some((left, right)) = parts else {
        log::debug!("cannot split {:?} further", segment);
        out.push(segment.clone());
        return;
    };

    if vocab.contains(&M::concat(&left, separator)) {
        out.push(left);
    } else {
        recursive_split::<M>(out, &left, reverse, vocab, separator, eow, false);
    }

    let right_in_vocab = if is_final {
        vocab.contains(&right)
    } else {
        vocab.contains(&M::concat(&right, separator))
    };
    if right_in_vocab {
        out.push(right);
    } else {
        recursive_split::<M>(out, &right, reverse, vocab, separator, eow, is_final);
    }
}
