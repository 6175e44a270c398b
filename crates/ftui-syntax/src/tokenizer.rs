#![forbid(unsafe_code)]

//! Resumable tokenization over multi-line spans.
//!
//! [`tokenize`] is a pure function of its inputs: the same span, initial
//! [`LexerState`], and grammar always produce the same tokens. The
//! incremental driver relies on that to detect its fixed point.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::grammar::Grammar;
use crate::token::Token;

// ---------------------------------------------------------------------------
// Language identity
// ---------------------------------------------------------------------------

/// Stable identifier of a grammar, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LanguageId(u64);

impl LanguageId {
    /// Identifier for a language name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let mut hasher = FxHasher::default();
        for b in name.bytes() {
            b.to_ascii_lowercase().hash(&mut hasher);
        }
        Self(hasher.finish())
    }

    /// Raw value, for hosts that persist lexer state.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Lexer state
// ---------------------------------------------------------------------------

/// Lexical state at a line boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LexerState {
    /// Plain code.
    Code { language: LanguageId },
    /// Inside a nested comment; `depth >= 1`.
    Comment { language: LanguageId, depth: u32 },
}

impl LexerState {
    /// Code state for `language`.
    #[must_use]
    pub const fn code(language: LanguageId) -> Self {
        Self::Code { language }
    }

    /// State for a comment nesting depth; depth 0 is code.
    #[must_use]
    pub const fn at_depth(language: LanguageId, depth: u32) -> Self {
        if depth == 0 {
            Self::Code { language }
        } else {
            Self::Comment { language, depth }
        }
    }

    /// Nested-comment depth (0 in code).
    #[must_use]
    pub const fn comment_depth(self) -> u32 {
        match self {
            Self::Code { .. } => 0,
            Self::Comment { depth, .. } => depth,
        }
    }

    /// The language this state belongs to.
    #[must_use]
    pub const fn language(self) -> LanguageId {
        match self {
            Self::Code { language } | Self::Comment { language, .. } => language,
        }
    }

    /// Whether the state is inside a comment.
    #[must_use]
    pub const fn in_comment(self) -> bool {
        matches!(self, Self::Comment { .. })
    }
}

// ---------------------------------------------------------------------------
// Tokenize
// ---------------------------------------------------------------------------

/// Tokenize `span` starting from `initial`.
///
/// Token ranges are byte offsets relative to the start of `span`. The span is
/// split on `\n`; each line is handed to [`Grammar::tokenize_line`] with the
/// state the previous line ended in, so no token ever crosses a line break.
pub fn tokenize(span: &str, initial: LexerState, grammar: &dyn Grammar) -> Vec<Token> {
    tokenize_with_state(span, initial, grammar).0
}

/// Like [`tokenize`], also returning the state after the last line.
pub fn tokenize_with_state(
    span: &str,
    initial: LexerState,
    grammar: &dyn Grammar,
) -> (Vec<Token>, LexerState) {
    let mut tokens = Vec::new();
    let mut state = initial;
    let mut offset = 0usize;

    for line in span.split('\n') {
        let (line_tokens, state_after) = grammar.tokenize_line(line, state);
        debug_assert!(validate_tokens(line, &line_tokens));
        tokens.extend(line_tokens.iter().map(|token| token.shifted(offset)));
        // Advance past the line and its terminator.
        offset += line.len() + 1;
        state = state_after;
    }

    (tokens, state)
}

/// Check that tokens are ordered, non-overlapping, and inside `source`.
pub fn validate_tokens(source: &str, tokens: &[Token]) -> bool {
    let len = source.len();
    let mut prev_end = 0;
    for token in tokens {
        if token.range.start > token.range.end {
            return false;
        }
        if token.range.end > len {
            return false;
        }
        if token.range.start < prev_end {
            return false; // overlapping
        }
        match source.get(token.range.clone()) {
            Some(text) if !text.contains('\n') => {}
            _ => return false,
        }
        prev_end = token.range.end;
    }
    true
}
