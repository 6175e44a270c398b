#![forbid(unsafe_code)]

//! Closer completion after single-character insertions.
//!
//! The completer remembers the token most recently typed. When the next
//! keystroke starts a new token right after a remembered opener, the
//! opener's closer is inserted after the cursor. Typing the closer yourself
//! suppresses the completion; typing another opener closes both, innermost
//! first; a line break after `{` or a nested-comment opener puts the closer
//! on its own line.

use std::mem;

use crate::grammar::Grammar;
use crate::line_info::LineInfo;
use crate::line_map::LineMap;
use crate::logging::debug;
use crate::token::{Token, TokenKind};

/// Transient completion state for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenCompleter {
    /// Last typed token, in document offsets.
    last_typed: Option<Token>,
}

impl TokenCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token remembered from the previous keystroke.
    #[must_use]
    pub fn last_typed(&self) -> Option<&Token> {
        self.last_typed.as_ref()
    }

    /// Forget the remembered token.
    pub fn reset(&mut self) {
        self.last_typed = None;
    }

    /// Decide what to insert after a single character was inserted at
    /// `index`.
    ///
    /// `line_map` must already be re-tokenized for `text`. Returns the text
    /// to insert at `index + 1`, or `None` when nothing should be inserted.
    pub fn completion_for(
        &mut self,
        text: &str,
        line_map: &LineMap<LineInfo>,
        grammar: &dyn Grammar,
        index: usize,
        expand_newline: bool,
    ) -> Option<String> {
        let current = token_at(line_map, index);
        let previous = mem::replace(&mut self.last_typed, current.clone())?;

        if previous.range.end != index {
            return None;
        }
        if current.as_ref().is_some_and(|c| c.overlaps(&previous)) {
            return None;
        }
        let closer_kind = previous.kind.matching_closer()?;
        let closer = grammar.lexeme(closer_kind)?;

        let completion = match &current {
            Some(c) if c.kind == closer_kind => {
                self.last_typed = None;
                return None;
            }
            Some(c) => match c
                .kind
                .matching_closer()
                .and_then(|kind| grammar.lexeme(kind))
            {
                Some(inner) => format!("{inner}{closer}"),
                None => closer.to_owned(),
            },
            None => match line_break_at(text, index) {
                Some(brk)
                    if expand_newline
                        && matches!(
                            previous.kind,
                            TokenKind::CurlyOpen | TokenKind::NestedCommentOpen
                        ) =>
                {
                    format!("{brk}{closer}")
                }
                _ => closer.to_owned(),
            },
        };

        debug!(
            index,
            opener = ?previous.kind,
            inserted = completion.len(),
            "completing closer"
        );
        self.last_typed = None;
        Some(completion)
    }
}

/// The line break inserted at `index`, if that is what was typed.
fn line_break_at(text: &str, index: usize) -> Option<char> {
    text.get(index..)?
        .chars()
        .next()
        .filter(|ch| matches!(ch, '\n' | '\r'))
}

/// Token covering the document offset `index`, in document offsets.
fn token_at(line_map: &LineMap<LineInfo>, index: usize) -> Option<Token> {
    let line = line_map.line_of(index)?;
    let record = line_map.lookup(line)?;
    let info = record.info.as_ref()?;
    info.token_at(index - record.range.start)
        .map(|token| token.shifted(record.range.start))
}
