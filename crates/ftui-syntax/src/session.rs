#![forbid(unsafe_code)]

//! Per-document syntax session.
//!
//! A [`SyntaxSession`] owns the line map, the active grammar, the completion
//! state, and the semantic side table of one document. The text itself stays
//! with the caller: edits are reported with a snapshot of the new text, and
//! completions are written back through [`TextStorage`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ftui_syntax::{SyntaxConfig, SyntaxSession, swift_grammar};
//!
//! let mut text = String::from("let x = ");
//! let mut session =
//!     SyntaxSession::with_text(&text, Some(Arc::new(swift_grammar())), SyntaxConfig::default());
//!
//! // Type `(` then `a`: the second keystroke completes the bracket.
//! text.insert(8, '(');
//! session.process_edit(&mut text, 8..9, 1);
//! text.insert(9, 'a');
//! let outcome = session.process_edit(&mut text, 9..10, 1);
//!
//! assert_eq!(text, "let x = (a)");
//! assert_eq!(outcome.completion_len, 1);
//! ```

use std::ops::Range;
use std::sync::Arc;

use crate::completion::TokenCompleter;
use crate::config::SyntaxConfig;
use crate::grammar::{Grammar, GrammarRegistry};
use crate::line_info::LineInfo;
use crate::line_map::{LineMap, LineMapDelta};
use crate::logging::{debug, warn};
use crate::retokenize::{Affected, retokenize};
use crate::semantic::{SemanticLayer, SemanticToken, overlay};
use crate::token::Token;

// ---------------------------------------------------------------------------
// TextStorage
// ---------------------------------------------------------------------------

/// Mutable text the session can write completions into.
pub trait TextStorage {
    /// Current contents.
    fn as_str(&self) -> &str;

    /// Insert `text` at byte offset `index`.
    fn insert_str(&mut self, index: usize, text: &str);
}

impl TextStorage for String {
    fn as_str(&self) -> &str {
        self
    }

    fn insert_str(&mut self, index: usize, text: &str) {
        String::insert_str(self, index, text);
    }
}

// ---------------------------------------------------------------------------
// SyntaxSession
// ---------------------------------------------------------------------------

/// Result of [`SyntaxSession::process_edit`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditOutcome {
    /// Region to redraw, including any completion.
    pub affected: Affected,
    /// Bytes auto-inserted after the edit. The caller keeps the cursor in
    /// front of them.
    pub completion_len: usize,
}

/// Syntax state of one document.
pub struct SyntaxSession {
    config: SyntaxConfig,
    line_map: LineMap<LineInfo>,
    grammar: Option<Arc<dyn Grammar>>,
    completer: TokenCompleter,
    semantic: SemanticLayer,
}

impl std::fmt::Debug for SyntaxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxSession")
            .field("config", &self.config)
            .field("grammar", &self.grammar.as_ref().map(|g| g.name()))
            .field("line_count", &self.line_map.line_count())
            .field("text_len", &self.line_map.text_len())
            .field("semantic_lines", &self.semantic.len())
            .finish_non_exhaustive()
    }
}

impl Default for SyntaxSession {
    fn default() -> Self {
        Self::new(SyntaxConfig::default())
    }
}

impl SyntaxSession {
    /// Session for an empty document without a grammar.
    pub fn new(config: SyntaxConfig) -> Self {
        Self {
            config,
            line_map: LineMap::default(),
            grammar: None,
            completer: TokenCompleter::new(),
            semantic: SemanticLayer::new(),
        }
    }

    /// Session for `text`, fully tokenized with `grammar`.
    pub fn with_text(text: &str, grammar: Option<Arc<dyn Grammar>>, config: SyntaxConfig) -> Self {
        let mut session = Self::new(config);
        session.grammar = grammar;
        session.rebuild(text);
        session
    }

    /// Discard all derived state and tokenize `text` from scratch.
    pub fn rebuild(&mut self, text: &str) -> Affected {
        debug!(text_len = text.len(), "rebuilding syntax state");
        self.line_map.rebuild(text);
        self.completer.reset();
        self.semantic.clear();
        retokenize(
            &mut self.line_map,
            0..text.len(),
            text,
            &self.grammar,
            &self.config,
        )
    }

    /// Record an edit of `text` and re-tokenize what it disturbed.
    ///
    /// `edited` is the range the new content occupies in `text` and `delta`
    /// the change in length. An edit that does not fit the line map rebuilds
    /// everything instead of failing. Forgets the completion state.
    pub fn notify_edit(&mut self, text: &str, edited: Range<usize>, delta: isize) -> Affected {
        self.completer.reset();
        self.apply_edit(text, edited, delta)
    }

    /// Like [`notify_edit`](Self::notify_edit), and then complete closers
    /// when the edit inserted exactly one character.
    ///
    /// A completion is written into `storage` right after the inserted
    /// character and re-tokenized before returning.
    pub fn process_edit<S>(
        &mut self,
        storage: &mut S,
        edited: Range<usize>,
        delta: isize,
    ) -> EditOutcome
    where
        S: TextStorage + ?Sized,
    {
        let single_char = delta > 0
            && usize::try_from(delta).is_ok_and(|d| d == edited.len())
            && storage
                .as_str()
                .get(edited.clone())
                .is_some_and(|s| s.chars().count() == 1);
        if !single_char {
            self.completer.reset();
        }

        let affected = self.apply_edit(storage.as_str(), edited.clone(), delta);
        if !single_char || !self.config.complete_tokens {
            return EditOutcome {
                affected,
                completion_len: 0,
            };
        }
        let Some(grammar) = self.grammar.clone() else {
            return EditOutcome {
                affected,
                completion_len: 0,
            };
        };

        let completion = self.completer.completion_for(
            storage.as_str(),
            &self.line_map,
            grammar.as_ref(),
            edited.start,
            self.config.expand_newline_in_braces,
        );
        let Some(completion) = completion else {
            return EditOutcome {
                affected,
                completion_len: 0,
            };
        };

        let at = edited.end;
        storage.insert_str(at, &completion);
        let extra = completion.len();
        let second = self.apply_edit(
            storage.as_str(),
            at..at + extra,
            isize::try_from(extra).unwrap_or(isize::MAX),
        );
        let mut merged = affected.union(&second);
        if let Some(lines) = self.line_map.lines_containing(merged.range.clone()) {
            merged.line_count = merged.line_count.max(lines.len());
        }
        EditOutcome {
            affected: merged,
            completion_len: extra,
        }
    }

    /// Replace the active grammar and re-tokenize `range`, or the whole
    /// document when `range` is `None`.
    pub fn set_language(
        &mut self,
        text: &str,
        grammar: Option<Arc<dyn Grammar>>,
        range: Option<Range<usize>>,
    ) -> Affected {
        debug!(
            grammar = grammar.as_ref().map(|g| g.name()),
            ?range,
            "switching grammar"
        );
        self.grammar = grammar;
        self.completer.reset();
        self.semantic.clear();
        if self.line_map.text_len() != text.len() {
            return self.rebuild(text);
        }
        let range = range.unwrap_or(0..text.len());
        if let Some(lines) = self.line_map.lines_containing(range.clone()) {
            self.line_map.clear_info(lines);
        }
        retokenize(
            &mut self.line_map,
            range,
            text,
            &self.grammar,
            &self.config,
        )
    }

    /// Pick the grammar for `path` from `registry` and re-tokenize the
    /// whole document. An unknown extension switches to plain text.
    pub fn set_language_for_path(
        &mut self,
        text: &str,
        registry: &GrammarRegistry,
        path: &str,
    ) -> Affected {
        self.set_language(text, registry.for_path(path), None)
    }

    fn apply_edit(&mut self, text: &str, edited: Range<usize>, delta: isize) -> Affected {
        match self.line_map.update(text, edited.clone(), delta) {
            Ok(line_delta) => {
                self.follow_line_delta(line_delta);
                retokenize(
                    &mut self.line_map,
                    edited,
                    text,
                    &self.grammar,
                    &self.config,
                )
            }
            #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
            Err(err) => {
                warn!(%err, "edit does not fit the line map; rebuilding");
                self.rebuild(text)
            }
        }
    }

    fn follow_line_delta(&mut self, delta: LineMapDelta) {
        self.semantic.apply_line_delta(delta);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Derived state of `line`, if it is up to date.
    #[must_use]
    pub fn line_info(&self, line: usize) -> Option<&LineInfo> {
        self.line_map.info_of(line)
    }

    /// Line containing the byte `offset`.
    #[must_use]
    pub fn line_of_offset(&self, offset: usize) -> Option<usize> {
        self.line_map.line_of(offset)
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_map.line_count()
    }

    #[must_use]
    pub fn text_len(&self) -> usize {
        self.line_map.text_len()
    }

    /// Syntactic token covering the document `offset`, in document offsets.
    #[must_use]
    pub fn token_at(&self, offset: usize) -> Option<Token> {
        let line = self.line_map.line_of(offset)?;
        let record = self.line_map.lookup(line)?;
        let info = record.info.as_ref()?;
        info.token_at(offset - record.range.start)
            .map(|token| token.shifted(record.range.start))
    }

    /// Syntactic tokens intersecting `range`, in document offsets.
    #[must_use]
    pub fn tokens_in_range(&self, range: Range<usize>) -> Vec<Token> {
        let Some(lines) = self.line_map.lines_containing(range.clone()) else {
            return Vec::new();
        };
        lines
            .filter_map(|line| self.line_map.lookup(line))
            .filter_map(|record| {
                record
                    .info
                    .as_ref()
                    .map(|info| (record.range.start, info))
            })
            .flat_map(|(base, info)| info.tokens.iter().map(move |t| t.shifted(base)))
            .filter(|t| t.range.start < range.end && range.start < t.range.end)
            .collect()
    }

    /// Tokens of `line` with semantic relabellings applied, line-relative.
    #[must_use]
    pub fn highlighted_tokens(&self, line: usize) -> Vec<Token> {
        self.line_map.info_of(line).map_or_else(Vec::new, |info| {
            overlay(&info.tokens, self.semantic.for_line(line))
        })
    }

    /// Whether the document `offset` lies inside a comment.
    #[must_use]
    pub fn is_commented(&self, offset: usize) -> bool {
        self.line_map
            .line_of(offset)
            .and_then(|line| self.line_map.lookup(line))
            .and_then(|record| {
                record
                    .info
                    .as_ref()
                    .map(|info| info.is_commented(offset - record.range.start))
            })
            .unwrap_or(false)
    }

    /// Merge semantic relabellings for `line`. Returns how many were
    /// accepted; stale entries are dropped silently.
    pub fn merge_semantic_tokens<T>(&mut self, line: usize, incoming: T) -> usize
    where
        T: IntoIterator<Item = SemanticToken>,
    {
        let Some(info) = self.line_map.info_of(line) else {
            return 0;
        };
        self.semantic.merge_line(line, &info.tokens, incoming)
    }

    #[must_use]
    pub fn config(&self) -> &SyntaxConfig {
        &self.config
    }

    #[must_use]
    pub fn grammar(&self) -> Option<&Arc<dyn Grammar>> {
        self.grammar.as_ref()
    }

    #[must_use]
    pub fn line_map(&self) -> &LineMap<LineInfo> {
        &self.line_map
    }
}
