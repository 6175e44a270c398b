#![forbid(unsafe_code)]

//! Incremental re-tokenization.
//!
//! After the line map has been patched for an edit, [`retokenize`] rescans
//! the whole lines the edit touched, starting from the comment depth the
//! preceding line ended in. It then keeps rescanning following lines one by
//! one while the depth carried into a line differs from the depth stored for
//! it. The first line whose stored start depth already matches is the fixed
//! point: nothing after it can change.

use std::ops::Range;

use crate::config::SyntaxConfig;
use crate::grammar::{Grammar, LanguageService};
use crate::line_info::{LineInfo, LineScan};
use crate::line_map::{LineMap, LineRecord};
use crate::logging::{debug, debug_span, trace, warn};
use crate::token::Token;
use crate::tokenizer::{LexerState, tokenize};

/// Region whose tokens changed and must be redrawn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Affected {
    /// Byte range in the new text.
    pub range: Range<usize>,
    /// Number of lines rescanned.
    pub line_count: usize,
}

impl Affected {
    /// Smallest region covering both.
    ///
    /// Overlapping passes share lines, so the line count is the larger of
    /// the two; callers holding the line map can recount from the range.
    #[must_use]
    pub fn union(&self, other: &Affected) -> Affected {
        Affected {
            range: self.range.start.min(other.range.start)..self.range.end.max(other.range.end),
            line_count: self.line_count.max(other.line_count),
        }
    }
}

/// Rescan the lines touched by `edited` and propagate comment state.
///
/// `line_map` must already reflect `text`. Without a grammar the edited
/// range is reported as-is with a line count of one. A line lookup that
/// fails part-way stops the scan and reports what was done so far.
pub fn retokenize(
    line_map: &mut LineMap<LineInfo>,
    edited: Range<usize>,
    text: &str,
    language: &dyn LanguageService,
    config: &SyntaxConfig,
) -> Affected {
    let _span = debug_span!("retokenize", start = edited.start, end = edited.end).entered();

    let passthrough = Affected {
        range: edited.clone(),
        line_count: 1,
    };
    if line_map.text_len() != text.len() {
        warn!(
            mapped = line_map.text_len(),
            actual = text.len(),
            "line map out of date; skipping"
        );
        return passthrough;
    }
    let Some(lines) = line_map.lines_containing(edited.clone()) else {
        warn!(?edited, "edited range outside line map");
        return passthrough;
    };
    let Some(span) = line_map.char_range_of(lines.clone()) else {
        return passthrough;
    };
    let Some(grammar) = language.grammar_at(span.start) else {
        return passthrough;
    };
    let Some(source) = text.get(span.clone()) else {
        warn!(?span, "line span is not on character boundaries");
        return passthrough;
    };

    let initial_depth = lines
        .start
        .checked_sub(1)
        .and_then(|prev| line_map.info_of(prev))
        .map_or(0, |info| info.comment_depth_end);
    debug!(?lines, initial_depth, "rescanning edited lines");

    let tokens = tokenize(
        source,
        LexerState::at_depth(grammar.language(), initial_depth),
        grammar,
    );

    // Distribute the span's tokens to its lines.
    let mut scan = LineScan::entering(initial_depth, config.track_bracket_depth);
    let mut pending = tokens.into_iter().peekable();
    let mut next_line = lines.start;
    while next_line < lines.end {
        let Some(record) = line_map.lookup(next_line) else {
            warn!(line = next_line, "line vanished during rescan");
            break;
        };
        let line_start = record.range.start - span.start;
        let line_end = record.range.end - span.start;
        let body_len = body_len(record, text);
        let mut line_tokens = Vec::new();
        while let Some(token) = pending.next_if(|t| t.range.start < line_end) {
            line_tokens.push(Token::new(
                token.kind,
                token.range.start - line_start..token.range.end - line_start,
            ));
        }
        let (info, next) = scan.step(&line_tokens, body_len);
        line_map.set_info_of(next_line, info);
        scan = next;
        next_line += 1;
    }

    // Follow the comment state until it matches what is stored.
    if next_line == lines.end {
        next_line = stabilize(line_map, next_line, scan, text, grammar);
    }

    let touched = lines.start..next_line.max(lines.start + 1);
    let range = line_map
        .char_range_of(touched.clone())
        .map_or(edited.clone(), |range| {
            range.start.min(edited.start)..range.end.max(edited.end)
        });
    Affected {
        range,
        line_count: touched.len(),
    }
}

/// Rescan lines from `line` while the carried depth disagrees with the
/// stored one. Returns the first line not rescanned.
fn stabilize(
    line_map: &mut LineMap<LineInfo>,
    mut line: usize,
    mut scan: LineScan,
    text: &str,
    grammar: &dyn Grammar,
) -> usize {
    loop {
        let Some(record) = line_map.lookup(line) else {
            debug!(line, "comment state propagated to end of document");
            return line;
        };
        let stored = record.info.as_ref().map(|info| info.comment_depth_start);
        if stored == Some(scan.comment_depth) {
            debug!(line, depth = scan.comment_depth, "comment state stable");
            return line;
        }
        trace!(line, ?stored, carried = scan.comment_depth, "propagating comment state");

        let body_len = body_len(record, text);
        let Some(body) = text.get(record.range.start..record.range.start + body_len) else {
            warn!(line, "line lookup failed during propagation");
            return line;
        };
        let tokens = tokenize(
            body,
            LexerState::at_depth(grammar.language(), scan.comment_depth),
            grammar,
        );
        let (info, next) = scan.step(&tokens, body_len);
        line_map.set_info_of(line, info);
        scan = next;
        line += 1;
    }
}

/// Length of the line without its `\n`.
fn body_len(record: &LineRecord<LineInfo>, text: &str) -> usize {
    let len = record.range.len();
    if len > 0 && text.as_bytes().get(record.range.end - 1) == Some(&b'\n') {
        len - 1
    } else {
        len
    }
}
