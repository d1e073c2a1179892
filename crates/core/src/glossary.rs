//! Glossary isolation.
//!
//! Glossary entries are regular expressions naming text that must pass
//! through segmentation whole. Before merging, each token is split into
//! literal and protected spans; protected spans are emitted verbatim
//! and never re-split by later patterns.

use crate::error::{Result, SegmentError};
use crate::mode::Mode;

/// A sub-span of a token produced by glossary isolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span<M: Mode> {
    /// Ordinary text, subject to merging.
    Literal(M::Sym),
    /// Glossary-matched text, passed through whole.
    Protected(M::Sym),
}

impl<M: Mode> Span<M> {
    /// The text of the span, whatever its kind.
    pub fn text(&self) -> &M::Sym {
        match self {
            Span::Literal(text) | Span::Protected(text) => text,
        }
    }
}

#[derive(Debug, Clone)]
struct Pattern<M: Mode> {
    exact: M::Regex,
    search: M::Regex,
}

/// Compiled glossary patterns, applied in declaration order.
#[derive(Debug, Clone)]
pub struct Glossaries<M: Mode> {
    patterns: Vec<Pattern<M>>,
    whole: M::Regex,
}

impl<M: Mode> Glossaries<M> {
    /// Compiles the given patterns. Earlier patterns take priority.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for raw in patterns {
            let raw = raw.as_ref();
            compiled.push(Pattern {
                exact: compile::<M>(&format!("^({})$", raw), raw)?,
                search: compile::<M>(raw, raw)?,
            });
        }
        let union = patterns
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("|");
        let whole = compile::<M>(&format!("^({})$", union), &union)?;
        Ok(Self {
            patterns: compiled,
            whole,
        })
    }

    /// Whether the whole token matches one of the patterns.
    #[inline]
    pub fn matches_token(&self, word: &M::Sym) -> bool {
        M::is_match(&self.whole, word)
    }

    /// Splits `word` into literal and protected spans.
    ///
    /// Concatenating the returned spans reconstructs `word` exactly.
    pub fn isolate(&self, word: &M::Sym) -> Vec<Span<M>> {
        let mut spans = vec![Span::Literal(word.clone())];
        for pattern in &self.patterns {
            let mut next = Vec::with_capacity(spans.len());
            for span in spans {
                match span {
                    Span::Protected(_) => next.push(span),
                    Span::Literal(text) => split_span::<M>(&mut next, pattern, text),
                }
            }
            spans = next;
        }
        spans
    }
}

fn compile<M: Mode>(pattern: &str, raw: &str) -> Result<M::Regex> {
    M::compile(pattern).map_err(|err| SegmentError::GlossaryPattern {
        pattern: raw.to_string(),
        err,
    })
}

fn split_span<M: Mode>(out: &mut Vec<Span<M>>, pattern: &Pattern<M>, text: M::Sym) {
    if M::is_match(&pattern.exact, &text) {
        out.push(Span::Protected(text));
        return;
    }

    let len = M::sym_bytes(&text).len();
    let mut pieces = Vec::new();
    let mut prev = 0;
    for (start, end) in M::find_ranges(&pattern.search, &text) {
        // zero-width matches isolate nothing
        if start == end {
            continue;
        }
        if start > prev {
            pieces.push(Span::Literal(M::slice(&text, prev, start)));
        }
        pieces.push(Span::Protected(M::slice(&text, start, end)));
        prev = end;
    }

    if pieces.is_empty() {
        out.push(Span::Literal(text));
        return;
    }
    if prev < len {
        pieces.push(Span::Literal(M::slice(&text, prev, len)));
    }
    out.append(&mut pieces);
}
