#![forbid(unsafe_code)]

//! Session configuration.

/// Configuration for a [`SyntaxSession`](crate::SyntaxSession).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SyntaxConfig {
    /// Auto-insert matching closers after single-character insertions
    /// (default: true).
    pub complete_tokens: bool,

    /// A line break typed right after `{` or a nested-comment opener inserts
    /// another line break before the closer (default: true).
    pub expand_newline_in_braces: bool,

    /// Compute the per-line bracket diffs (default: true).
    pub track_bracket_depth: bool,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            complete_tokens: true,
            expand_newline_in_braces: true,
            track_bracket_depth: true,
        }
    }
}

impl SyntaxConfig {
    /// Enable or disable closer completion.
    #[must_use]
    pub fn with_completion(mut self, enabled: bool) -> Self {
        self.complete_tokens = enabled;
        self
    }

    /// Enable or disable the line-break expansion inside braces.
    #[must_use]
    pub fn with_newline_expansion(mut self, enabled: bool) -> Self {
        self.expand_newline_in_braces = enabled;
        self
    }

    /// Enable or disable bracket diff tracking.
    #[must_use]
    pub fn with_bracket_depth(mut self, enabled: bool) -> Self {
        self.track_bracket_depth = enabled;
        self
    }
}
