#![forbid(unsafe_code)]

//! Token model shared by the tokenizer, the line map, and completion.

use std::ops::Range;

// ---------------------------------------------------------------------------
// Token kinds
// ---------------------------------------------------------------------------

/// Lexical token categories.
///
/// The syntactic kinds come out of a grammar; the semantic kinds (`Type`,
/// `Function`, ...) only ever appear after a semantic overlay relabelled an
/// identifier or operator.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenKind {
    // Brackets
    RoundOpen,
    RoundClose,
    SquareOpen,
    SquareClose,
    CurlyOpen,
    CurlyClose,

    // Comment delimiters
    LineComment,
    NestedCommentOpen,
    NestedCommentClose,

    // Literals
    String,
    Character,
    Number,

    // Words and symbols
    Identifier,
    Keyword,
    Operator,

    // Semantic relabels
    Type,
    Function,
    Variable,
    Parameter,
    Property,
    Constant,
    Macro,
}

impl TokenKind {
    /// The closing counterpart of an opening bracket or nested-comment opener.
    #[must_use]
    pub const fn matching_closer(self) -> Option<Self> {
        match self {
            Self::RoundOpen => Some(Self::RoundClose),
            Self::SquareOpen => Some(Self::SquareClose),
            Self::CurlyOpen => Some(Self::CurlyClose),
            Self::NestedCommentOpen => Some(Self::NestedCommentClose),
            _ => None,
        }
    }

    /// Whether this kind opens a delimited region.
    #[must_use]
    pub const fn is_opening(self) -> bool {
        self.matching_closer().is_some()
    }

    /// Whether this kind is one of the three bracket shapes.
    #[must_use]
    pub const fn is_bracket(self) -> bool {
        matches!(
            self,
            Self::RoundOpen
                | Self::RoundClose
                | Self::SquareOpen
                | Self::SquareClose
                | Self::CurlyOpen
                | Self::CurlyClose
        )
    }

    /// Whether this kind is a comment delimiter.
    #[must_use]
    pub const fn is_comment(self) -> bool {
        matches!(
            self,
            Self::LineComment | Self::NestedCommentOpen | Self::NestedCommentClose
        )
    }

    /// Whether a semantic overlay may relabel tokens of this kind.
    #[must_use]
    pub const fn is_relabelable(self) -> bool {
        matches!(self, Self::Identifier | Self::Operator)
    }

    /// Whether this kind can only be produced by a semantic overlay.
    #[must_use]
    pub const fn is_semantic(self) -> bool {
        matches!(
            self,
            Self::Type
                | Self::Function
                | Self::Variable
                | Self::Parameter
                | Self::Property
                | Self::Constant
                | Self::Macro
        )
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A token with a kind and a byte range.
///
/// Ranges are relative to whatever the producer scanned: the span handed to
/// [`tokenize`](crate::tokenize), or the start of the line once stored in a
/// [`LineInfo`](crate::LineInfo). Tokens satisfy `range.start <= range.end`
/// and never contain a line break.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub kind: TokenKind,
    pub range: Range<usize>,
}

impl Token {
    /// Create a token. Panics in debug builds if the range is inverted.
    #[must_use]
    pub fn new(kind: TokenKind, range: Range<usize>) -> Self {
        debug_assert!(range.start <= range.end, "token range must be ordered");
        Self { kind, range }
    }

    /// Token length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.range.end.saturating_sub(self.range.start)
    }

    /// Whether the token is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.start >= self.range.end
    }

    /// Same token moved by `offset` bytes.
    #[must_use]
    pub fn shifted(&self, offset: usize) -> Self {
        Self {
            kind: self.kind,
            range: self.range.start + offset..self.range.end + offset,
        }
    }

    /// Whether the two tokens share at least one byte.
    #[must_use]
    pub fn overlaps(&self, other: &Token) -> bool {
        self.range.start < other.range.end && other.range.start < self.range.end
    }

    /// Whether `offset` falls inside the token.
    #[must_use]
    pub fn contains(&self, offset: usize) -> bool {
        self.range.contains(&offset)
    }

    /// Extract the token's text from a source string.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closers_pair_with_openers() {
        assert_eq!(
            TokenKind::RoundOpen.matching_closer(),
            Some(TokenKind::RoundClose)
        );
        assert_eq!(
            TokenKind::CurlyOpen.matching_closer(),
            Some(TokenKind::CurlyClose)
        );
        assert_eq!(
            TokenKind::NestedCommentOpen.matching_closer(),
            Some(TokenKind::NestedCommentClose)
        );
        assert_eq!(TokenKind::RoundClose.matching_closer(), None);
        assert_eq!(TokenKind::Identifier.matching_closer(), None);
    }

    #[test]
    fn kind_predicates() {
        assert!(TokenKind::SquareOpen.is_opening());
        assert!(!TokenKind::SquareClose.is_opening());
        assert!(TokenKind::SquareClose.is_bracket());
        assert!(!TokenKind::NestedCommentOpen.is_bracket());
        assert!(TokenKind::LineComment.is_comment());
        assert!(TokenKind::Operator.is_relabelable());
        assert!(!TokenKind::Keyword.is_relabelable());
        assert!(TokenKind::Function.is_semantic());
        assert!(!TokenKind::Identifier.is_semantic());
    }

    #[test]
    fn token_accessors() {
        let t = Token::new(TokenKind::Identifier, 4..9);
        assert_eq!(t.len(), 5);
        assert!(!t.is_empty());
        assert!(t.contains(4));
        assert!(!t.contains(9));
        assert_eq!(t.shifted(10).range, 14..19);
        assert_eq!(t.text("let value = 1;"), "value");
    }

    #[test]
    fn overlap_is_half_open() {
        let a = Token::new(TokenKind::RoundOpen, 0..1);
        let b = Token::new(TokenKind::Identifier, 1..3);
        let c = Token::new(TokenKind::Identifier, 0..2);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }
}
