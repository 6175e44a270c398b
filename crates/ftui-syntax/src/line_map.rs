#![forbid(unsafe_code)]

//! Line-indexed map from line number to byte range plus a per-line payload.
//!
//! Every line record covers its body and its `\n` terminator, so the records
//! are contiguous and tile `0..text.len()` exactly. The line after the last
//! `\n` always exists, possibly empty:
//!
//! ```
//! use ftui_syntax::LineMap;
//!
//! let map: LineMap<()> = LineMap::new("ab\ncd\n");
//! assert_eq!(map.line_count(), 3);
//! assert_eq!(map.lookup(1).map(|r| r.range.clone()), Some(3..6));
//! assert_eq!(map.lookup(2).map(|r| r.range.clone()), Some(6..6));
//! assert_eq!(map.line_of(4), Some(1));
//! ```

use std::ops::Range;

use crate::error::SyntaxError;
use crate::logging::warn;

/// One line: its byte range and the derived info attached to it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord<I> {
    pub range: Range<usize>,
    pub info: Option<I>,
}

/// Structural change made by [`LineMap::update`].
///
/// Lines `first_line..first_line + removed` of the old map were replaced by
/// `inserted` fresh lines (without info); later lines moved by
/// `inserted - removed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineMapDelta {
    pub first_line: usize,
    pub removed: usize,
    pub inserted: usize,
}

impl LineMapDelta {
    /// Change in line count.
    #[must_use]
    pub fn line_shift(&self) -> isize {
        self.inserted as isize - self.removed as isize
    }

    /// Whether the update left the line structure untouched.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.removed == 0 && self.inserted == 0
    }
}

/// Ordered line records for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMap<I> {
    lines: Vec<LineRecord<I>>,
}

impl<I> Default for LineMap<I> {
    fn default() -> Self {
        Self::new("")
    }
}

impl<I> LineMap<I> {
    /// Build the map for `text`; no line carries info yet.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            lines: split_lines(text.as_bytes(), 0, true),
        }
    }

    /// Replace every record with fresh ones for `text`.
    pub fn rebuild(&mut self, text: &str) {
        self.lines = split_lines(text.as_bytes(), 0, true);
    }

    /// Number of lines (always at least one).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Length of the mapped text.
    #[must_use]
    pub fn text_len(&self) -> usize {
        self.lines.last().map_or(0, |line| line.range.end)
    }

    /// Record of `line`.
    #[must_use]
    pub fn lookup(&self, line: usize) -> Option<&LineRecord<I>> {
        self.lines.get(line)
    }

    /// Info attached to `line`.
    #[must_use]
    pub fn info_of(&self, line: usize) -> Option<&I> {
        self.lines.get(line)?.info.as_ref()
    }

    /// Replace the info of `line`. Returns false if the line does not exist.
    pub fn set_info_of(&mut self, line: usize, info: I) -> bool {
        match self.lines.get_mut(line) {
            Some(record) => {
                record.info = Some(info);
                true
            }
            None => false,
        }
    }

    /// Drop the info of every line in `lines`.
    pub fn clear_info(&mut self, lines: Range<usize>) {
        let end = lines.end.min(self.lines.len());
        let start = lines.start.min(end);
        for record in &mut self.lines[start..end] {
            record.info = None;
        }
    }

    /// Line containing byte `offset`; the text length maps to the last line.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> Option<usize> {
        if offset > self.text_len() {
            return None;
        }
        let after = self.lines.partition_point(|line| line.range.start <= offset);
        Some(after.saturating_sub(1))
    }

    /// Lines whose ranges intersect `range`, as a half-open index range.
    ///
    /// An empty `range` yields the single line containing its position.
    #[must_use]
    pub fn lines_containing(&self, range: Range<usize>) -> Option<Range<usize>> {
        let first = self.line_of(range.start)?;
        let last = if range.end > range.start {
            self.line_of(range.end - 1)?
        } else {
            first
        };
        Some(first..last.max(first) + 1)
    }

    /// Byte range spanned by the contiguous `lines`.
    #[must_use]
    pub fn char_range_of(&self, lines: Range<usize>) -> Option<Range<usize>> {
        if lines.is_empty() {
            return None;
        }
        let first = self.lines.get(lines.start)?;
        let last = self.lines.get(lines.end - 1)?;
        Some(first.range.start..last.range.end)
    }

    /// Iterate over all records in order.
    pub fn iter(&self) -> impl Iterator<Item = &LineRecord<I>> {
        self.lines.iter()
    }

    /// Patch the map after an edit.
    ///
    /// `edited` is the range the replacement text occupies in the new `text`
    /// and `delta` is the change in length. Lines touched by the edit are
    /// replaced by fresh records without info; lines after it are shifted and
    /// keep their info. An empty `edited` with a zero `delta` is a no-op.
    pub fn update(
        &mut self,
        text: &str,
        edited: Range<usize>,
        delta: isize,
    ) -> Result<LineMapDelta, SyntaxError> {
        let old_len = self.text_len();
        let new_len = text.len();

        let expected = old_len
            .checked_add_signed(delta)
            .ok_or(SyntaxError::InconsistentDelta {
                range: edited.clone(),
                delta,
            })?;
        if expected != new_len {
            warn!(expected, actual = new_len, "line map length mismatch");
            return Err(SyntaxError::LengthMismatch {
                expected,
                actual: new_len,
            });
        }
        if edited.start > edited.end || edited.end > new_len {
            warn!(?edited, new_len, "edited range out of bounds");
            return Err(SyntaxError::EditOutOfBounds {
                range: edited,
                text_len: new_len,
            });
        }
        let old_edit_len = (edited.end - edited.start)
            .checked_add_signed(-delta)
            .ok_or(SyntaxError::InconsistentDelta {
                range: edited.clone(),
                delta,
            })?;

        let first = self.line_of(edited.start).ok_or(SyntaxError::EditOutOfBounds {
            range: edited.clone(),
            text_len: old_len,
        })?;
        if edited.is_empty() && delta == 0 {
            return Ok(LineMapDelta {
                first_line: first,
                removed: 0,
                inserted: 0,
            });
        }
        let last = self
            .line_of(edited.start + old_edit_len)
            .ok_or(SyntaxError::InconsistentDelta {
                range: edited.clone(),
                delta,
            })?;

        let region_start = self.lines[first].range.start;
        let region_old_end = self.lines[last].range.end;
        let region_new_end = region_old_end
            .checked_add_signed(delta)
            .filter(|end| *end <= new_len && *end >= region_start)
            .ok_or(SyntaxError::InconsistentDelta {
                range: edited.clone(),
                delta,
            })?;

        let at_end = last + 1 == self.lines.len();
        let fresh = split_lines(
            &text.as_bytes()[region_start..region_new_end],
            region_start,
            at_end,
        );
        let inserted = fresh.len();

        for record in &mut self.lines[last + 1..] {
            // Lines after the region start at or after its old end, so the
            // shift cannot underflow once the new length checked out.
            record.range.start = record.range.start.saturating_add_signed(delta);
            record.range.end = record.range.end.saturating_add_signed(delta);
        }
        self.lines.splice(first..=last, fresh);

        Ok(LineMapDelta {
            first_line: first,
            removed: last - first + 1,
            inserted,
        })
    }
}

/// Split `bytes` into line records starting at `base`.
///
/// With `at_end`, the piece after the final `\n` becomes a line even when it
/// is empty (the document's last line).
fn split_lines<I>(bytes: &[u8], base: usize, at_end: bool) -> Vec<LineRecord<I>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'\n' {
            lines.push(LineRecord {
                range: base + start..base + i + 1,
                info: None,
            });
            start = i + 1;
        }
    }
    if at_end || start < bytes.len() {
        lines.push(LineRecord {
            range: base + start..base + bytes.len(),
            info: None,
        });
    }
    lines
}
