//! Token, line, and stream segmentation.

use std::io::{BufRead, Write};

use bpeel_core::{Cache, CacheStats, MergeDropout, Mode, Result, Span, WordEncoder, STRIP_CHARS};

/// Segments tokens, lines, and streams with a configured encoder.
///
/// Holds the per-worker mutable state, the cache and the dropout
/// stream, next to a shared encoder clone. Workers are created with
/// [`fork`], which keeps the tables and gives the worker private state.
///
/// [`fork`]: Segmenter::fork
#[derive(Debug, Clone)]
pub struct Segmenter<M: Mode> {
    encoder: WordEncoder<M>,
    cache: Cache<M>,
    dropout: Option<MergeDropout>,
}

impl<M: Mode> Segmenter<M> {
    /// Wraps an encoder with fresh per-run state.
    pub fn new(encoder: WordEncoder<M>) -> Self {
        Self {
            encoder,
            cache: Cache::new(),
            dropout: None,
        }
    }

    /// Enables merge dropout with probability `p`; zero disables it.
    ///
    /// # Panics
    ///
    /// Panics if `p` is not within `[0, 1]`.
    pub fn with_dropout(mut self, p: f32, seed: Option<u64>) -> Self {
        self.dropout = if p > 0.0 {
            Some(match seed {
                Some(seed) => MergeDropout::with_seed(p, seed),
                None => MergeDropout::new(p),
            })
        } else {
            None
        };
        self
    }

    /// The underlying encoder.
    pub fn encoder(&self) -> &WordEncoder<M> {
        &self.encoder
    }

    /// Cache usage counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// An independent copy for worker `index`: same tables, an empty
    /// cache, and a dropout stream derived from the worker index.
    pub fn fork(&self, index: u64) -> Self {
        Self {
            encoder: self.encoder.clone(),
            cache: Cache::new(),
            dropout: self.dropout.as_ref().map(|d| d.fork(index)),
        }
    }

    /// Encodes one token into pieces, without separators.
    ///
    /// Glossary matches inside the token are passed through whole; the
    /// stretches between them are merged independently.
    pub fn encode_token(&mut self, token: &M::Sym) -> Vec<M::Sym> {
        match self.encoder.glossaries() {
            Some(glossaries) => {
                let mut pieces = Vec::new();
                for span in glossaries.isolate(token) {
                    match span {
                        Span::Protected(text) => pieces.push(text),
                        Span::Literal(text) => pieces.extend(self.encoder.encode(
                            &text,
                            &mut self.cache,
                            self.dropout.as_mut(),
                        )),
                    }
                }
                pieces
            }
            None => self
                .encoder
                .encode(token, &mut self.cache, self.dropout.as_mut()),
        }
    }

    /// Segments a token sequence; every piece except a token's last
    /// carries the separator suffix.
    pub fn segment_tokens(&mut self, tokens: &[M::Sym]) -> Vec<M::Sym> {
        let mut output = Vec::new();
        for token in tokens {
            if M::sym_bytes(token).is_empty() {
                continue;
            }
            let pieces = self.encode_token(token);
            if let Some((last, rest)) = pieces.split_last() {
                for piece in rest {
                    output.push(M::concat(piece, self.encoder.separator()));
                }
                output.push(last.clone());
            }
        }
        output
    }

    /// Segments one raw line.
    ///
    /// Leading and trailing runs of space, CR, and LF are copied to the
    /// output verbatim; the interior is split on single spaces, each
    /// token is encoded, and pieces are joined with single spaces. Runs
    /// of interior spaces therefore collapse to one space.
    pub fn segment_line(&mut self, line: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(line.len() + line.len() / 4);
        let lead = line
            .iter()
            .take_while(|b| STRIP_CHARS.contains(b))
            .count();
        let trail = line
            .iter()
            .rev()
            .take_while(|b| STRIP_CHARS.contains(b))
            .count();
        out.extend_from_slice(&line[..lead]);

        let interior: &[u8] = if lead == line.len() {
            &[]
        } else {
            &line[lead..line.len() - trail]
        };

        let mut first = true;
        for raw in interior.split(|&b| b == b' ') {
            if raw.is_empty() {
                continue;
            }
            let token = M::parse_sym(raw)?;
            let pieces = self.encode_token(&token);
            if !first {
                out.push(b' ');
            }
            first = false;
            for (i, piece) in pieces.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                out.extend_from_slice(M::sym_bytes(piece));
                if i + 1 < pieces.len() {
                    out.extend_from_slice(M::sym_bytes(self.encoder.separator()));
                }
            }
        }

        // an all-whitespace line was already copied whole as the lead
        if trail > 0 && trail != line.len() {
            out.extend_from_slice(&line[line.len() - trail..]);
        }
        Ok(out)
    }

    /// Segments every line of `input` into `output`.
    pub fn segment_stream<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        mut output: W,
    ) -> Result<()> {
        let mut line = Vec::new();
        loop {
            line.clear();
            if input.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            let segmented = self.segment_line(&line)?;
            output.write_all(&segmented)?;
        }
        output.flush()?;
        Ok(())
    }
}
