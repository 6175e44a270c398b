#![forbid(unsafe_code)]

//! Incremental tokenization and line indexing for FrankenTUI code editors.
//!
//! This crate keeps syntax state for a document that is edited one change
//! at a time:
//! - [`LineMap`] - line number to byte range, with optional per-line info
//! - [`tokenize`] - restartable, pure tokenization over a [`Grammar`]
//! - [`retokenize`] - rescans edited lines and propagates nested-comment
//!   state until it stabilizes
//! - [`TokenCompleter`] - closer completion after single-character inserts
//! - [`SemanticLayer`] - semantic relabellings merged at read time
//! - [`SyntaxSession`] - all of the above for one document
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use ftui_syntax::{SyntaxConfig, SyntaxSession, TokenKind, haskell_grammar};
//!
//! let mut text = String::from("main = go\n  where go = 1");
//! let mut session =
//!     SyntaxSession::with_text(&text, Some(Arc::new(haskell_grammar())), SyntaxConfig::default());
//! assert_eq!(session.line_count(), 2);
//!
//! // Opening a nested comment on the first line comments out the rest.
//! text.insert_str(0, "{- ");
//! let affected = session.notify_edit(&text, 0..3, 3);
//! assert_eq!(affected.line_count, 2);
//! assert!(session.is_commented(text.len() - 1));
//! assert_eq!(
//!     session.line_info(0).map(|info| info.tokens[0].kind),
//!     Some(TokenKind::NestedCommentOpen)
//! );
//! ```

pub mod completion;
pub mod config;
pub mod error;
pub mod grammar;
pub mod line_info;
pub mod line_map;
pub mod retokenize;
pub mod semantic;
pub mod session;
pub mod token;
pub mod tokenizer;

mod logging;

pub use completion::TokenCompleter;
pub use config::SyntaxConfig;
pub use error::SyntaxError;
pub use grammar::{
    Grammar, GrammarConfig, GrammarRegistry, LanguageService, RuleGrammar, agda_grammar,
    haskell_grammar, rust_grammar, swift_grammar,
};
pub use line_info::{LineInfo, LineScan};
pub use line_map::{LineMap, LineMapDelta, LineRecord};
pub use retokenize::{Affected, retokenize};
pub use semantic::{SemanticLayer, SemanticToken, overlay};
pub use session::{EditOutcome, SyntaxSession, TextStorage};
pub use token::{Token, TokenKind};
pub use tokenizer::{LanguageId, LexerState, tokenize, tokenize_with_state, validate_tokens};
