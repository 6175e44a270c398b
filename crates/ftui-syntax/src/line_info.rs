#![forbid(unsafe_code)]

//! Per-line derived state and the fold that computes it.
//!
//! [`LineScan`] is the accumulator threaded from one line to the next. Each
//! [`LineScan::step`] consumes one line's tokens and returns the line's
//! [`LineInfo`] together with the accumulator for the following line, so a
//! line can be scanned in isolation given only the depth it starts at.

use std::ops::Range;

use smallvec::SmallVec;

use crate::token::{Token, TokenKind};

/// Derived state of one line.
///
/// Token and comment ranges are byte offsets relative to the line start.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineInfo {
    /// Nested-comment depth on entry.
    pub comment_depth_start: u32,
    /// Nested-comment depth on exit; equals the next line's start depth.
    pub comment_depth_end: u32,
    /// Opening minus closing round brackets. Advisory only.
    pub round_bracket_diff: i32,
    /// Opening minus closing square brackets. Advisory only.
    pub square_bracket_diff: i32,
    /// Opening minus closing curly brackets. Advisory only.
    pub curly_bracket_diff: i32,
    /// Tokens of the line, in order.
    pub tokens: Vec<Token>,
    /// Commented-out sub-ranges, in order.
    pub commented_ranges: SmallVec<[Range<usize>; 2]>,
}

impl LineInfo {
    /// Token covering the line-relative `offset`.
    #[must_use]
    pub fn token_at(&self, offset: usize) -> Option<&Token> {
        let index = self.tokens.partition_point(|t| t.range.end <= offset);
        self.tokens.get(index).filter(|t| t.contains(offset))
    }

    /// Whether the line-relative `offset` lies inside a commented-out range.
    #[must_use]
    pub fn is_commented(&self, offset: usize) -> bool {
        self.commented_ranges.iter().any(|r| r.contains(&offset))
    }
}

/// Accumulator carried across line boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineScan {
    /// Nested-comment depth at the current position.
    pub comment_depth: u32,
    /// Whether to compute the bracket diffs.
    pub track_brackets: bool,
}

impl LineScan {
    /// Accumulator for a line entered at `comment_depth`.
    #[must_use]
    pub fn entering(comment_depth: u32, track_brackets: bool) -> Self {
        Self {
            comment_depth,
            track_brackets,
        }
    }

    /// Fold one line.
    ///
    /// `tokens` are line-relative and `body_len` excludes the line's `\n`.
    /// Tokens after a single-line comment and non-delimiter tokens inside a
    /// nested comment are dropped.
    #[must_use]
    pub fn step(self, tokens: &[Token], body_len: usize) -> (LineInfo, LineScan) {
        let mut depth = self.comment_depth;
        // A comment carried in from the previous line starts the line.
        let mut comment_start = (depth > 0).then_some(0);
        let mut info = LineInfo {
            comment_depth_start: depth,
            ..LineInfo::default()
        };

        for token in tokens {
            match token.kind {
                TokenKind::NestedCommentOpen => {
                    if depth == 0 {
                        comment_start = Some(token.range.start);
                    }
                    depth += 1;
                    info.tokens.push(token.clone());
                }
                TokenKind::NestedCommentClose => {
                    if depth > 0 {
                        depth -= 1;
                        if depth == 0 {
                            let start = comment_start.take().unwrap_or(0);
                            info.commented_ranges.push(start..token.range.end);
                        }
                    }
                    info.tokens.push(token.clone());
                }
                _ if depth > 0 => {}
                TokenKind::LineComment => {
                    info.tokens.push(token.clone());
                    info.commented_ranges
                        .push(token.range.start..body_len.max(token.range.end));
                    break;
                }
                kind => {
                    if self.track_brackets {
                        match kind {
                            TokenKind::RoundOpen => info.round_bracket_diff += 1,
                            TokenKind::RoundClose => info.round_bracket_diff -= 1,
                            TokenKind::SquareOpen => info.square_bracket_diff += 1,
                            TokenKind::SquareClose => info.square_bracket_diff -= 1,
                            TokenKind::CurlyOpen => info.curly_bracket_diff += 1,
                            TokenKind::CurlyClose => info.curly_bracket_diff -= 1,
                            _ => {}
                        }
                    }
                    info.tokens.push(token.clone());
                }
            }
        }

        if depth > 0 {
            let start = comment_start.unwrap_or(0);
            info.commented_ranges.push(start..body_len.max(start));
        }
        info.comment_depth_end = depth;

        let next = LineScan {
            comment_depth: depth,
            track_brackets: self.track_brackets,
        };
        (info, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokenKind, range: Range<usize>) -> Token {
        Token::new(kind, range)
    }

    #[test]
    fn plain_line_counts_brackets() {
        let tokens = [
            tok(TokenKind::Identifier, 0..1),
            tok(TokenKind::RoundOpen, 1..2),
            tok(TokenKind::SquareOpen, 2..3),
            tok(TokenKind::SquareClose, 3..4),
            tok(TokenKind::CurlyOpen, 5..6),
        ];
        let (info, next) = LineScan::entering(0, true).step(&tokens, 6);
        assert_eq!(info.round_bracket_diff, 1);
        assert_eq!(info.square_bracket_diff, 0);
        assert_eq!(info.curly_bracket_diff, 1);
        assert_eq!(info.tokens.len(), 5);
        assert!(info.commented_ranges.is_empty());
        assert_eq!(next.comment_depth, 0);
    }

    #[test]
    fn bracket_tracking_can_be_disabled() {
        let tokens = [tok(TokenKind::RoundOpen, 0..1)];
        let (info, _) = LineScan::entering(0, false).step(&tokens, 1);
        assert_eq!(info.round_bracket_diff, 0);
        assert_eq!(info.tokens.len(), 1);
    }

    #[test]
    fn line_comment_truncates() {
        // x = 1 // y = 2 ( [ {
        let tokens = [
            tok(TokenKind::Identifier, 0..1),
            tok(TokenKind::Operator, 2..3),
            tok(TokenKind::Number, 4..5),
            tok(TokenKind::LineComment, 6..8),
            tok(TokenKind::Identifier, 9..10),
            tok(TokenKind::RoundOpen, 15..16),
            tok(TokenKind::SquareOpen, 17..18),
            tok(TokenKind::CurlyOpen, 19..20),
        ];
        let (info, next) = LineScan::entering(0, true).step(&tokens, 20);
        assert_eq!(info.tokens.len(), 4);
        assert_eq!(info.tokens[3].kind, TokenKind::LineComment);
        assert_eq!(info.commented_ranges.as_slice(), &[6..20]);
        assert_eq!(info.round_bracket_diff, 0);
        assert_eq!(info.curly_bracket_diff, 0);
        assert_eq!(next.comment_depth, 0);
    }

    #[test]
    fn comment_closed_on_same_line() {
        let tokens = [
            tok(TokenKind::Identifier, 0..1),
            tok(TokenKind::NestedCommentOpen, 2..4),
            tok(TokenKind::NestedCommentOpen, 5..7),
            tok(TokenKind::NestedCommentClose, 8..10),
            tok(TokenKind::NestedCommentClose, 11..13),
            tok(TokenKind::Identifier, 14..15),
        ];
        let (info, next) = LineScan::entering(0, true).step(&tokens, 15);
        assert_eq!(info.commented_ranges.as_slice(), &[2..13]);
        assert_eq!(info.comment_depth_start, 0);
        assert_eq!(info.comment_depth_end, 0);
        assert_eq!(next, LineScan::entering(0, true));
    }

    #[test]
    fn open_comment_carries_to_next_line() {
        let tokens = [
            tok(TokenKind::Identifier, 0..1),
            tok(TokenKind::NestedCommentOpen, 2..4),
        ];
        let (first, next) = LineScan::entering(0, true).step(&tokens, 9);
        assert_eq!(first.commented_ranges.as_slice(), &[2..9]);
        assert_eq!(first.comment_depth_end, 1);
        assert_eq!(next.comment_depth, 1);

        let tokens = [
            tok(TokenKind::RoundOpen, 1..2),
            tok(TokenKind::NestedCommentClose, 3..5),
            tok(TokenKind::Identifier, 6..7),
        ];
        let (second, next) = next.step(&tokens, 7);
        assert_eq!(second.comment_depth_start, 1);
        assert_eq!(second.comment_depth_end, 0);
        assert_eq!(second.commented_ranges.as_slice(), &[0..5]);
        // The bracket inside the comment is dropped.
        assert_eq!(second.tokens.len(), 2);
        assert_eq!(second.round_bracket_diff, 0);
        assert_eq!(next.comment_depth, 0);
    }

    #[test]
    fn fully_commented_line() {
        let (info, next) = LineScan::entering(2, true).step(&[], 12);
        assert_eq!(info.commented_ranges.as_slice(), &[0..12]);
        assert_eq!(info.comment_depth_start, 2);
        assert_eq!(info.comment_depth_end, 2);
        assert_eq!(next.comment_depth, 2);
    }

    #[test]
    fn stray_closer_in_code_is_kept_but_ignored() {
        let tokens = [tok(TokenKind::NestedCommentClose, 0..2)];
        let (info, next) = LineScan::entering(0, true).step(&tokens, 2);
        assert!(info.commented_ranges.is_empty());
        assert_eq!(info.tokens.len(), 1);
        assert_eq!(next.comment_depth, 0);
    }

    #[test]
    fn token_lookup_and_comment_query() {
        let tokens = [
            tok(TokenKind::Identifier, 0..3),
            tok(TokenKind::LineComment, 4..6),
        ];
        let (info, _) = LineScan::entering(0, true).step(&tokens, 10);
        assert_eq!(info.token_at(1).map(|t| t.kind), Some(TokenKind::Identifier));
        assert_eq!(info.token_at(3), None);
        assert_eq!(info.token_at(5).map(|t| t.kind), Some(TokenKind::LineComment));
        assert!(info.is_commented(8));
        assert!(!info.is_commented(2));
    }

    #[test]
    fn carried_comment_starts_at_line_start() {
        let tokens = [
            tok(TokenKind::NestedCommentClose, 4..6),
            tok(TokenKind::NestedCommentOpen, 7..9),
        ];
        let (info, next) = LineScan::entering(1, true).step(&tokens, 12);
        assert_eq!(info.commented_ranges.as_slice(), &[0..6, 7..12]);
        assert_eq!(next, LineScan::entering(1, true));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn line_info_serde_round_trip() {
        let tokens = [
            tok(TokenKind::Identifier, 0..1),
            tok(TokenKind::NestedCommentOpen, 2..4),
            tok(TokenKind::NestedCommentClose, 5..7),
            tok(TokenKind::CurlyOpen, 8..9),
            tok(TokenKind::LineComment, 10..12),
        ];
        let (info, _) = LineScan::entering(0, true).step(&tokens, 15);
        assert_eq!(info.commented_ranges.as_slice(), &[2..7, 10..15]);

        let json = serde_json::to_string(&info).expect("serialize");
        let back: LineInfo = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, info);
    }
}
