#![forbid(unsafe_code)]

use std::ops::Range;

/// Errors reported when an edit notification does not fit the line map.
///
/// None of these are fatal: the session answers them by rebuilding its line
/// map from the text snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    /// The edited range does not lie inside the new text.
    EditOutOfBounds { range: Range<usize>, text_len: usize },
    /// The length delta implies the replaced text had negative length, or
    /// reaches outside the old text.
    InconsistentDelta { range: Range<usize>, delta: isize },
    /// The snapshot length differs from the mapped length plus the delta.
    LengthMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EditOutOfBounds { range, text_len } => write!(
                f,
                "edited range {}..{} is outside the text (length {})",
                range.start, range.end, text_len
            ),
            Self::InconsistentDelta { range, delta } => write!(
                f,
                "length change {} is inconsistent with edited range {}..{}",
                delta, range.start, range.end
            ),
            Self::LengthMismatch { expected, actual } => write!(
                f,
                "text length {} does not match the expected length {}",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for SyntaxError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = SyntaxError::EditOutOfBounds {
            range: 4..9,
            text_len: 6,
        };
        assert_eq!(
            err.to_string(),
            "edited range 4..9 is outside the text (length 6)"
        );

        let err = SyntaxError::InconsistentDelta {
            range: 2..3,
            delta: 5,
        };
        assert!(err.to_string().contains("length change 5"));

        let err = SyntaxError::LengthMismatch {
            expected: 10,
            actual: 12,
        };
        assert!(err.to_string().contains("expected length 10"));
    }
}
