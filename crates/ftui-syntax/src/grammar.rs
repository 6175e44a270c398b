#![forbid(unsafe_code)]

//! Grammar capability, the table-driven [`RuleGrammar`] lexer, and a
//! registry for looking grammars up by name or file extension.

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::token::{Token, TokenKind};
use crate::tokenizer::{LanguageId, LexerState};

// ---------------------------------------------------------------------------
// Grammar trait
// ---------------------------------------------------------------------------

/// The active grammar of a document region.
///
/// Implementors tokenize a single line body (without its `\n`) given the
/// state the previous line ended in. Tokens must be ordered, must not
/// overlap, and must stay inside the line.
pub trait Grammar: Send + Sync {
    /// Human-readable name (e.g., "Swift", "Haskell").
    fn name(&self) -> &'static str;

    /// File extensions this grammar handles (without dots).
    fn extensions(&self) -> &'static [&'static str];

    /// Identifier carried by every [`LexerState`] this grammar produces.
    fn language(&self) -> LanguageId {
        LanguageId::from_name(self.name())
    }

    /// Tokenize one line. Returns `(tokens, state_after)`.
    fn tokenize_line(&self, line: &str, state: LexerState) -> (Vec<Token>, LexerState);

    /// Literal text of a fixed token kind (brackets, comment delimiters).
    fn lexeme(&self, kind: TokenKind) -> Option<&str>;
}

/// Resolves the grammar in effect at a document offset.
///
/// The driver asks once per run, at the start of the edited lines.
pub trait LanguageService {
    fn grammar_at(&self, offset: usize) -> Option<&dyn Grammar>;
}

impl LanguageService for RuleGrammar {
    fn grammar_at(&self, _offset: usize) -> Option<&dyn Grammar> {
        Some(self)
    }
}

impl LanguageService for Arc<dyn Grammar> {
    fn grammar_at(&self, _offset: usize) -> Option<&dyn Grammar> {
        Some(self.as_ref())
    }
}

impl LanguageService for Option<Arc<dyn Grammar>> {
    fn grammar_at(&self, _offset: usize) -> Option<&dyn Grammar> {
        self.as_deref()
    }
}

// ---------------------------------------------------------------------------
// GrammarRegistry
// ---------------------------------------------------------------------------

/// Grammars by name and file extension, for picking the grammar of a buffer.
#[derive(Default)]
pub struct GrammarRegistry {
    by_name: FxHashMap<String, Arc<dyn Grammar>>,
    by_extension: FxHashMap<String, Arc<dyn Grammar>>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in grammars.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(swift_grammar()));
        registry.register(Arc::new(haskell_grammar()));
        registry.register(Arc::new(agda_grammar()));
        registry.register(Arc::new(rust_grammar()));
        registry
    }

    /// Register a grammar. Later registrations for the same extension or
    /// name override earlier ones.
    pub fn register(&mut self, grammar: Arc<dyn Grammar>) {
        for ext in grammar.extensions() {
            let key = ext.trim_start_matches('.').to_ascii_lowercase();
            if !key.is_empty() {
                self.by_extension.insert(key, Arc::clone(&grammar));
            }
        }
        self.by_name.insert(grammar.name().to_ascii_lowercase(), grammar);
    }

    /// Grammar for a file extension (case-insensitive, dot optional).
    pub fn for_extension(&self, ext: &str) -> Option<Arc<dyn Grammar>> {
        let key = ext.trim_start_matches('.').to_ascii_lowercase();
        self.by_extension.get(&key).cloned()
    }

    /// Grammar for the extension of `path`; `None` means plain text.
    pub fn for_path(&self, path: &str) -> Option<Arc<dyn Grammar>> {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.for_extension(ext))
    }

    /// Grammar by name (case-insensitive).
    pub fn by_name(&self, name: &str) -> Option<Arc<dyn Grammar>> {
        self.by_name.get(&name.to_ascii_lowercase()).cloned()
    }
}

// ---------------------------------------------------------------------------
// RuleGrammar
// ---------------------------------------------------------------------------

/// Token table for a [`RuleGrammar`].
#[derive(Debug, Clone)]
pub struct GrammarConfig {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    /// Single-line comment lexeme; empty when the language has none.
    pub line_comment: &'static str,
    /// Nested comment `(open, close)` lexemes.
    pub nested_comment: Option<(&'static str, &'static str)>,
    pub keywords: &'static [&'static str],
    pub string_delimiter: Option<u8>,
    pub character_delimiter: Option<u8>,
    /// Bytes forming operator runs.
    pub operator_chars: &'static [u8],
    /// Extra ASCII bytes allowed after the first identifier character.
    pub identifier_extra: &'static [u8],
}

/// A configurable state-machine lexer.
///
/// Recognizes brackets, single-line and nested comments, string and
/// character literals, numbers, keywords, identifiers, and operator runs.
/// Inside a nested comment only the comment delimiters are recognized.
/// After a single-line comment opener the rest of the line is skipped.
#[derive(Debug, Clone)]
pub struct RuleGrammar {
    config: GrammarConfig,
    language: LanguageId,
}

impl RuleGrammar {
    /// Create a grammar from its token table.
    pub fn new(config: GrammarConfig) -> Self {
        let language = LanguageId::from_name(config.name);
        Self { config, language }
    }

    /// The token table.
    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }

    fn nested_open(&self) -> Option<&'static str> {
        self.config
            .nested_comment
            .map(|(open, _)| open)
            .filter(|open| !open.is_empty())
    }

    fn nested_close(&self) -> Option<&'static str> {
        self.config
            .nested_comment
            .map(|(_, close)| close)
            .filter(|close| !close.is_empty())
    }

    /// Whether a comment delimiter starts at `pos`.
    fn comment_delimiter_at(&self, line: &str, pos: usize) -> bool {
        let rest = &line[pos..];
        (!self.config.line_comment.is_empty() && rest.starts_with(self.config.line_comment))
            || self.nested_open().is_some_and(|open| rest.starts_with(open))
            || self.nested_close().is_some_and(|close| rest.starts_with(close))
    }

    fn is_operator_byte(&self, b: u8) -> bool {
        self.config.operator_chars.contains(&b)
    }

    /// Scan a word (identifier or keyword) starting at `pos`.
    fn scan_word(&self, line: &str, pos: usize) -> (TokenKind, usize) {
        let mut end = pos;
        for (i, c) in line[pos..].char_indices() {
            let continues = if c.is_ascii() {
                let b = c as u8;
                b.is_ascii_alphanumeric()
                    || b == b'_'
                    || (i > 0 && self.config.identifier_extra.contains(&b))
            } else {
                c.is_alphanumeric()
            };
            if !continues {
                break;
            }
            end = pos + i + c.len_utf8();
        }
        let word = &line[pos..end];
        let kind = if self.config.keywords.contains(&word) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        (kind, end)
    }

    /// Scan a number starting at `pos`.
    fn scan_number(bytes: &[u8], pos: usize) -> usize {
        let mut end = pos;
        // Hex prefix
        if end + 1 < bytes.len() && bytes[end] == b'0' && (bytes[end + 1] | 0x20) == b'x' {
            end += 2;
            while end < bytes.len() && (bytes[end].is_ascii_hexdigit() || bytes[end] == b'_') {
                end += 1;
            }
            return end;
        }
        // Decimal (with optional fraction and exponent)
        while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'_') {
            end += 1;
        }
        if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
            end += 1;
            while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'_') {
                end += 1;
            }
        }
        if end < bytes.len() && (bytes[end] | 0x20) == b'e' {
            let mut exp = end + 1;
            if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
                exp += 1;
            }
            if exp < bytes.len() && bytes[exp].is_ascii_digit() {
                end = exp;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
            }
        }
        end
    }

    /// Scan a quoted literal starting at `pos` (the opening quote).
    ///
    /// Unterminated literals end at the end of the line.
    fn scan_quoted(bytes: &[u8], pos: usize) -> usize {
        let quote = bytes[pos];
        let mut end = pos + 1;
        while end < bytes.len() {
            if bytes[end] == b'\\' {
                // Skip escaped character, but don't go past end of line
                end = (end + 2).min(bytes.len());
            } else if bytes[end] == quote {
                return end + 1;
            } else {
                end += 1;
            }
        }
        end
    }

    /// Continue inside a nested comment at `depth`, starting at `pos`.
    ///
    /// Returns the depth reached and the position where code resumes (the
    /// line length when the comment stays open).
    fn scan_comment(
        &self,
        line: &str,
        mut pos: usize,
        mut depth: u32,
        tokens: &mut Vec<Token>,
    ) -> (u32, usize) {
        let (Some(open), Some(close)) = (self.nested_open(), self.nested_close()) else {
            return (0, pos);
        };
        while pos < line.len() {
            let rest = &line[pos..];
            if rest.starts_with(close) {
                tokens.push(Token::new(TokenKind::NestedCommentClose, pos..pos + close.len()));
                pos += close.len();
                depth -= 1;
                if depth == 0 {
                    return (0, pos);
                }
            } else if rest.starts_with(open) {
                tokens.push(Token::new(TokenKind::NestedCommentOpen, pos..pos + open.len()));
                pos += open.len();
                depth += 1;
            } else {
                pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
        (depth, pos)
    }

    /// Tokenize code starting at `pos`; returns the depth the line ends in.
    fn scan_code(&self, line: &str, mut pos: usize, tokens: &mut Vec<Token>) -> u32 {
        let bytes = line.as_bytes();

        while pos < bytes.len() {
            let ch = bytes[pos];
            let rest = &line[pos..];

            if ch.is_ascii_whitespace() {
                pos += 1;
                continue;
            }

            // Single-line comment: nothing after it on this line is code.
            if !self.config.line_comment.is_empty() && rest.starts_with(self.config.line_comment) {
                let end = pos + self.config.line_comment.len();
                tokens.push(Token::new(TokenKind::LineComment, pos..end));
                return 0;
            }

            if let Some(open) = self.nested_open().filter(|open| rest.starts_with(open)) {
                tokens.push(Token::new(TokenKind::NestedCommentOpen, pos..pos + open.len()));
                let (depth, resume) = self.scan_comment(line, pos + open.len(), 1, tokens);
                if depth > 0 {
                    return depth;
                }
                pos = resume;
                continue;
            }

            // A stray closer in code; the driver ignores it at depth zero.
            if let Some(close) = self.nested_close().filter(|close| rest.starts_with(close)) {
                tokens.push(Token::new(TokenKind::NestedCommentClose, pos..pos + close.len()));
                pos += close.len();
                continue;
            }

            let bracket = match ch {
                b'(' => Some(TokenKind::RoundOpen),
                b')' => Some(TokenKind::RoundClose),
                b'[' => Some(TokenKind::SquareOpen),
                b']' => Some(TokenKind::SquareClose),
                b'{' => Some(TokenKind::CurlyOpen),
                b'}' => Some(TokenKind::CurlyClose),
                _ => None,
            };
            if let Some(kind) = bracket {
                tokens.push(Token::new(kind, pos..pos + 1));
                pos += 1;
                continue;
            }

            if Some(ch) == self.config.string_delimiter {
                let end = Self::scan_quoted(bytes, pos);
                tokens.push(Token::new(TokenKind::String, pos..end));
                pos = end;
                continue;
            }

            if Some(ch) == self.config.character_delimiter {
                let end = Self::scan_quoted(bytes, pos);
                tokens.push(Token::new(TokenKind::Character, pos..end));
                pos = end;
                continue;
            }

            if ch.is_ascii_digit() {
                let end = Self::scan_number(bytes, pos);
                tokens.push(Token::new(TokenKind::Number, pos..end));
                pos = end;
                continue;
            }

            let c = rest.chars().next().unwrap_or(' ');
            if c == '_' || c.is_alphabetic() {
                let (kind, end) = self.scan_word(line, pos);
                tokens.push(Token::new(kind, pos..end));
                pos = end;
                continue;
            }

            if self.is_operator_byte(ch) {
                let start = pos;
                pos += 1;
                while pos < bytes.len()
                    && self.is_operator_byte(bytes[pos])
                    && !self.comment_delimiter_at(line, pos)
                {
                    pos += 1;
                }
                tokens.push(Token::new(TokenKind::Operator, start..pos));
                continue;
            }

            // Punctuation and anything else: no token.
            pos += c.len_utf8();
        }

        0
    }
}

impl Grammar for RuleGrammar {
    fn name(&self) -> &'static str {
        self.config.name
    }

    fn extensions(&self) -> &'static [&'static str] {
        self.config.extensions
    }

    fn language(&self) -> LanguageId {
        self.language
    }

    fn tokenize_line(&self, line: &str, state: LexerState) -> (Vec<Token>, LexerState) {
        let mut tokens = Vec::new();
        let depth = match state {
            LexerState::Comment { depth, .. } => {
                let (depth, resume) = self.scan_comment(line, 0, depth, &mut tokens);
                if depth > 0 {
                    depth
                } else {
                    self.scan_code(line, resume, &mut tokens)
                }
            }
            LexerState::Code { .. } => self.scan_code(line, 0, &mut tokens),
        };
        (tokens, LexerState::at_depth(self.language, depth))
    }

    fn lexeme(&self, kind: TokenKind) -> Option<&str> {
        match kind {
            TokenKind::RoundOpen => Some("("),
            TokenKind::RoundClose => Some(")"),
            TokenKind::SquareOpen => Some("["),
            TokenKind::SquareClose => Some("]"),
            TokenKind::CurlyOpen => Some("{"),
            TokenKind::CurlyClose => Some("}"),
            TokenKind::LineComment if !self.config.line_comment.is_empty() => {
                Some(self.config.line_comment)
            }
            TokenKind::NestedCommentOpen => self.nested_open(),
            TokenKind::NestedCommentClose => self.nested_close(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in grammars
// ---------------------------------------------------------------------------

const C_FAMILY_OPERATORS: &[u8] = b"+-*/%=!<>&|^~?:.";
const HASKELL_OPERATORS: &[u8] = b"!#$%&*+./<=>?@\\^|-~:";

/// Swift.
pub fn swift_grammar() -> RuleGrammar {
    RuleGrammar::new(GrammarConfig {
        name: "Swift",
        extensions: &["swift"],
        line_comment: "//",
        nested_comment: Some(("/*", "*/")),
        keywords: &[
            "associatedtype", "class", "deinit", "enum", "extension", "fileprivate", "func",
            "import", "init", "inout", "internal", "let", "open", "operator", "private",
            "protocol", "public", "static", "struct", "subscript", "typealias", "var", "break",
            "case", "continue", "default", "defer", "do", "else", "fallthrough", "for", "guard",
            "if", "in", "repeat", "return", "switch", "where", "while", "as", "catch", "false",
            "is", "nil", "rethrows", "super", "self", "Self", "throw", "throws", "true", "try",
            "async", "await",
        ],
        string_delimiter: Some(b'"'),
        character_delimiter: None,
        operator_chars: C_FAMILY_OPERATORS,
        identifier_extra: &[],
    })
}

/// Haskell.
pub fn haskell_grammar() -> RuleGrammar {
    RuleGrammar::new(GrammarConfig {
        name: "Haskell",
        extensions: &["hs", "lhs"],
        line_comment: "--",
        nested_comment: Some(("{-", "-}")),
        keywords: &[
            "case", "class", "data", "default", "deriving", "do", "else", "foreign", "if",
            "import", "in", "infix", "infixl", "infixr", "instance", "let", "module", "newtype",
            "of", "then", "type", "where",
        ],
        string_delimiter: Some(b'"'),
        character_delimiter: Some(b'\''),
        operator_chars: HASKELL_OPERATORS,
        identifier_extra: b"'",
    })
}

/// Agda.
pub fn agda_grammar() -> RuleGrammar {
    RuleGrammar::new(GrammarConfig {
        name: "Agda",
        extensions: &["agda"],
        line_comment: "--",
        nested_comment: Some(("{-", "-}")),
        keywords: &[
            "abstract", "constructor", "data", "field", "forall", "hiding", "import", "in",
            "infix", "infixl", "infixr", "instance", "let", "module", "mutual", "open",
            "postulate", "private", "public", "record", "renaming", "rewrite", "using", "where",
            "with",
        ],
        string_delimiter: Some(b'"'),
        character_delimiter: Some(b'\''),
        operator_chars: HASKELL_OPERATORS,
        identifier_extra: b"'",
    })
}

/// Rust (block comments nest).
pub fn rust_grammar() -> RuleGrammar {
    RuleGrammar::new(GrammarConfig {
        name: "Rust",
        extensions: &["rs"],
        line_comment: "//",
        nested_comment: Some(("/*", "*/")),
        keywords: &[
            "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
            "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
            "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super",
            "trait", "true", "type", "unsafe", "use", "where", "while",
        ],
        string_delimiter: Some(b'"'),
        // Lifetimes make a quote-delimited character rule ambiguous.
        character_delimiter: None,
        operator_chars: b"+-*/%=!<>&|^~?:.'",
        identifier_extra: &[],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan<'a>(grammar: &RuleGrammar, line: &'a str) -> Vec<(TokenKind, &'a str)> {
        let (tokens, _) = grammar.tokenize_line(line, LexerState::code(grammar.language()));
        tokens.iter().map(|t| (t.kind, t.text(line))).collect()
    }

    #[test]
    fn swift_basic_line() {
        let g = swift_grammar();
        assert_eq!(
            scan(&g, "let x = foo(1.5, \"s\")"),
            vec![
                (TokenKind::Keyword, "let"),
                (TokenKind::Identifier, "x"),
                (TokenKind::Operator, "="),
                (TokenKind::Identifier, "foo"),
                (TokenKind::RoundOpen, "("),
                (TokenKind::Number, "1.5"),
                (TokenKind::String, "\"s\""),
                (TokenKind::RoundClose, ")"),
            ]
        );
    }

    #[test]
    fn line_comment_skips_rest_of_line() {
        let g = swift_grammar();
        assert_eq!(
            scan(&g, "x = 1 // y = 2 ( [ {"),
            vec![
                (TokenKind::Identifier, "x"),
                (TokenKind::Operator, "="),
                (TokenKind::Number, "1"),
                (TokenKind::LineComment, "//"),
            ]
        );
    }

    #[test]
    fn nested_comment_inside_one_line() {
        let g = swift_grammar();
        let (tokens, state) =
            g.tokenize_line("a /* ( /* */ ) */ b", LexerState::code(g.language()));
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::NestedCommentOpen,
                TokenKind::NestedCommentOpen,
                TokenKind::NestedCommentClose,
                TokenKind::NestedCommentClose,
                TokenKind::Identifier,
            ]
        );
        assert!(!state.in_comment());
    }

    #[test]
    fn open_comment_reports_depth() {
        let g = haskell_grammar();
        let (_, state) = g.tokenize_line("f {- {- x -}", LexerState::code(g.language()));
        assert_eq!(state.comment_depth(), 1);
    }

    #[test]
    fn operator_run_stops_at_comment() {
        let g = haskell_grammar();
        assert_eq!(
            scan(&g, "a +-- note"),
            vec![
                (TokenKind::Identifier, "a"),
                (TokenKind::Operator, "+"),
                (TokenKind::LineComment, "--"),
            ]
        );
    }

    #[test]
    fn haskell_primes_and_chars() {
        let g = haskell_grammar();
        assert_eq!(
            scan(&g, "x' = 'c'"),
            vec![
                (TokenKind::Identifier, "x'"),
                (TokenKind::Operator, "="),
                (TokenKind::Character, "'c'"),
            ]
        );
    }

    #[test]
    fn unterminated_string_stops_at_line_end() {
        let g = swift_grammar();
        let (tokens, state) = g.tokenize_line("\"abc", LexerState::code(g.language()));
        assert_eq!(tokens, vec![Token::new(TokenKind::String, 0..4)]);
        assert!(!state.in_comment());
    }

    #[test]
    fn comment_markers_inside_strings_are_ignored() {
        let g = swift_grammar();
        let (tokens, state) = g.tokenize_line("\"/*\" x", LexerState::code(g.language()));
        assert_eq!(tokens.len(), 2);
        assert!(!state.in_comment());
    }

    #[test]
    fn non_ascii_identifiers() {
        let g = swift_grammar();
        assert_eq!(
            scan(&g, "let größe = 1"),
            vec![
                (TokenKind::Keyword, "let"),
                (TokenKind::Identifier, "größe"),
                (TokenKind::Operator, "="),
                (TokenKind::Number, "1"),
            ]
        );
    }

    #[test]
    fn lexemes() {
        let g = haskell_grammar();
        assert_eq!(g.lexeme(TokenKind::CurlyClose), Some("}"));
        assert_eq!(g.lexeme(TokenKind::NestedCommentOpen), Some("{-"));
        assert_eq!(g.lexeme(TokenKind::NestedCommentClose), Some("-}"));
        assert_eq!(g.lexeme(TokenKind::LineComment), Some("--"));
        assert_eq!(g.lexeme(TokenKind::Identifier), None);
    }

    #[test]
    fn registry_lookup() {
        let registry = GrammarRegistry::with_builtins();
        assert_eq!(registry.for_extension(".SWIFT").map(|g| g.name()), Some("Swift"));
        assert_eq!(registry.for_extension("lhs").map(|g| g.name()), Some("Haskell"));
        assert_eq!(registry.by_name("agda").map(|g| g.name()), Some("Agda"));
        assert!(registry.by_name("cobol").is_none());
        assert_eq!(registry.for_path("src/main.rs").map(|g| g.name()), Some("Rust"));
        assert!(registry.for_path("notes.txt").is_none());
        assert!(registry.for_path("Makefile").is_none());
    }

    #[test]
    fn language_service_impls() {
        let g = swift_grammar();
        assert_eq!(g.grammar_at(10).map(Grammar::name), Some("Swift"));
        let none: Option<Arc<dyn Grammar>> = None;
        assert!(none.grammar_at(0).is_none());
        let some: Option<Arc<dyn Grammar>> = Some(Arc::new(haskell_grammar()));
        assert_eq!(some.grammar_at(0).map(Grammar::name), Some("Haskell"));
    }
}
