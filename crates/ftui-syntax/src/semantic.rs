#![forbid(unsafe_code)]

//! Semantic enrichment as a side table over the syntactic tokens.
//!
//! Semantic tokens (e.g., from a language server) arrive whenever they
//! arrive. They never touch [`LineInfo`](crate::LineInfo); instead they are
//! kept per line in a [`SemanticLayer`] and combined with the syntactic
//! tokens by the pure [`overlay`] reducer at read time. Only a span that
//! exactly matches an identifier or operator token can relabel it.

use std::ops::Range;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::line_map::LineMapDelta;
use crate::logging::trace;
use crate::token::{Token, TokenKind};

/// A relabelling for one line-relative span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticToken {
    pub range: Range<usize>,
    pub kind: TokenKind,
}

impl SemanticToken {
    pub fn new(kind: TokenKind, range: Range<usize>) -> Self {
        Self { range, kind }
    }
}

type LineEntries = SmallVec<[SemanticToken; 4]>;

/// Per-line semantic relabellings, keyed by line number.
#[derive(Debug, Clone, Default)]
pub struct SemanticLayer {
    lines: FxHashMap<usize, LineEntries>,
}

impl SemanticLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `incoming` for `line`, validated against the line's current
    /// syntactic tokens. Returns how many entries were accepted.
    ///
    /// Entries whose span does not exactly match an identifier or operator
    /// token in `base` are dropped; they were computed for text that has
    /// since changed. Merging the same batch twice changes nothing.
    pub fn merge_line<T>(&mut self, line: usize, base: &[Token], incoming: T) -> usize
    where
        T: IntoIterator<Item = SemanticToken>,
    {
        let mut accepted = 0;
        for token in incoming {
            let matches = base
                .binary_search_by(|t| t.range.start.cmp(&token.range.start))
                .ok()
                .and_then(|i| base.get(i))
                .is_some_and(|t| t.range == token.range && t.kind.is_relabelable());
            if !matches {
                trace!(line, range = ?token.range, "dropping stale semantic token");
                continue;
            }
            let entries = self.lines.entry(line).or_default();
            match entries.iter_mut().find(|e| e.range == token.range) {
                Some(existing) => existing.kind = token.kind,
                None => {
                    let at = entries.partition_point(|e| e.range.start < token.range.start);
                    entries.insert(at, token);
                }
            }
            accepted += 1;
        }
        accepted
    }

    /// Relabellings stored for `line`.
    #[must_use]
    pub fn for_line(&self, line: usize) -> &[SemanticToken] {
        self.lines
            .get(&line)
            .map(|entries| entries.as_slice())
            .unwrap_or(&[])
    }

    /// Drop the entries of one line.
    pub fn clear_line(&mut self, line: usize) {
        self.lines.remove(&line);
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Number of lines with entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no line has entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Follow a structural edit: entries of replaced lines are dropped and
    /// entries of later lines are renumbered.
    pub fn apply_line_delta(&mut self, delta: LineMapDelta) {
        if delta.is_noop() || self.lines.is_empty() {
            return;
        }
        let replaced_end = delta.first_line + delta.removed;
        let shift = delta.line_shift();
        self.lines = std::mem::take(&mut self.lines)
            .into_iter()
            .filter_map(|(line, entries)| {
                if line < delta.first_line {
                    Some((line, entries))
                } else if line < replaced_end {
                    None
                } else {
                    line.checked_add_signed(shift).map(|moved| (moved, entries))
                }
            })
            .collect();
    }
}

/// Apply semantic relabellings to a line's syntactic tokens.
///
/// Token spans are never changed; a token is relabelled only when a
/// semantic entry covers exactly its span and the token is an identifier
/// or operator.
#[must_use]
pub fn overlay(base: &[Token], semantic: &[SemanticToken]) -> Vec<Token> {
    base.iter()
        .map(|token| {
            let relabel = token
                .kind
                .is_relabelable()
                .then(|| semantic.iter().find(|s| s.range == token.range))
                .flatten();
            match relabel {
                Some(s) => Token::new(s.kind, token.range.clone()),
                None => token.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<Token> {
        vec![
            Token::new(TokenKind::Keyword, 0..3),
            Token::new(TokenKind::Identifier, 4..9),
            Token::new(TokenKind::Operator, 10..11),
            Token::new(TokenKind::Number, 12..13),
        ]
    }

    #[test]
    fn exact_identifier_span_is_relabelled() {
        let mut layer = SemanticLayer::new();
        let accepted = layer.merge_line(
            0,
            &base(),
            [SemanticToken::new(TokenKind::Variable, 4..9)],
        );
        assert_eq!(accepted, 1);
        let merged = overlay(&base(), layer.for_line(0));
        assert_eq!(merged[1], Token::new(TokenKind::Variable, 4..9));
        assert_eq!(merged[0].kind, TokenKind::Keyword);
    }

    #[test]
    fn mismatched_or_foreign_spans_are_dropped() {
        let mut layer = SemanticLayer::new();
        let accepted = layer.merge_line(
            0,
            &base(),
            [
                // Wider than the identifier.
                SemanticToken::new(TokenKind::Type, 4..11),
                // Keywords are not relabelled.
                SemanticToken::new(TokenKind::Function, 0..3),
                // Numbers are not relabelled.
                SemanticToken::new(TokenKind::Constant, 12..13),
            ],
        );
        assert_eq!(accepted, 0);
        assert!(layer.is_empty());
        assert_eq!(overlay(&base(), layer.for_line(0)), base());
    }

    #[test]
    fn merge_is_idempotent() {
        let batch = [
            SemanticToken::new(TokenKind::Function, 4..9),
            SemanticToken::new(TokenKind::Macro, 10..11),
        ];
        let mut layer = SemanticLayer::new();
        layer.merge_line(2, &base(), batch.clone());
        let once = overlay(&base(), layer.for_line(2));
        layer.merge_line(2, &base(), batch);
        assert_eq!(layer.for_line(2).len(), 2);
        assert_eq!(overlay(&base(), layer.for_line(2)), once);
        // Applying the overlay to its own output changes nothing either.
        assert_eq!(overlay(&once, layer.for_line(2)), once);
    }

    #[test]
    fn later_merge_relabels_again() {
        let mut layer = SemanticLayer::new();
        layer.merge_line(0, &base(), [SemanticToken::new(TokenKind::Variable, 4..9)]);
        layer.merge_line(0, &base(), [SemanticToken::new(TokenKind::Parameter, 4..9)]);
        assert_eq!(layer.for_line(0).len(), 1);
        assert_eq!(layer.for_line(0)[0].kind, TokenKind::Parameter);
    }

    #[test]
    fn line_delta_drops_and_renumbers() {
        let mut layer = SemanticLayer::new();
        for line in 0..6 {
            layer.merge_line(line, &base(), [SemanticToken::new(TokenKind::Variable, 4..9)]);
        }
        // Lines 2 and 3 replaced by a single line.
        layer.apply_line_delta(LineMapDelta {
            first_line: 2,
            removed: 2,
            inserted: 1,
        });
        assert_eq!(layer.len(), 4);
        assert!(!layer.for_line(0).is_empty());
        assert!(!layer.for_line(1).is_empty());
        assert!(layer.for_line(2).is_empty());
        assert!(!layer.for_line(3).is_empty());
        assert!(!layer.for_line(4).is_empty());
        assert!(layer.for_line(5).is_empty());
    }
}
