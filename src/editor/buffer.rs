use ropey::Rope;

use crate::text::{EditOperation, TextPosition, TextRange};

/// A text buffer backed by a rope data structure.
///
/// Every mutation goes through [`EditorBuffer::replace`] and is reported back
/// as the [`EditOperation`] it performed, so hosts can forward it as a change
/// notification. Only `\n` ends a line; every other character, `\r`
/// included, is part of the line that holds it.
pub struct EditorBuffer {
    rope: Rope,
}

impl EditorBuffer {
    /// Create a new buffer from a string.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Get the content of a line (without trailing newline).
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(line_idx).to_string();
        Some(line.strip_suffix('\n').unwrap_or(&line).to_string())
    }

    /// The full text content of the buffer.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Whether `pos` addresses a char boundary inside the buffer.
    pub fn is_valid(&self, pos: TextPosition) -> bool {
        self.line_at(pos.line)
            .is_some_and(|line| pos.column <= line.len() && line.is_char_boundary(pos.column))
    }

    /// Text covered by `range`, or `None` if either end is out of bounds.
    pub fn read_range(&self, range: TextRange) -> Option<String> {
        let (start, end) = self.char_span(range)?;
        Some(self.rope.slice(start..end).to_string())
    }

    /// Replace `range` with `text`.
    ///
    /// Returns the applied edit, or `None` (leaving the buffer untouched) if
    /// the range does not fit the buffer.
    pub fn replace(&mut self, range: TextRange, text: &str) -> Option<EditOperation> {
        let (start, end) = self.char_span(range)?;
        self.rope.remove(start..end);
        self.rope.insert(start, text);
        Some(EditOperation::new(range, text))
    }

    /// Apply one change set: non-overlapping edits in increasing position
    /// order, all expressed against the buffer before any of them.
    ///
    /// Nothing is applied unless every edit fits.
    pub fn apply(&mut self, edits: &[EditOperation]) -> bool {
        let fits = edits
            .iter()
            .all(|edit| self.is_valid(edit.range.start) && self.is_valid(edit.range.end));
        let ordered = edits
            .windows(2)
            .all(|pair| pair[0].range.end <= pair[1].range.start);
        if !fits || !ordered {
            return false;
        }
        // Back to front so earlier coordinates stay valid.
        for edit in edits.iter().rev() {
            if self.replace(edit.range, &edit.inserted).is_none() {
                return false;
            }
        }
        true
    }

    // --- Private helpers ---

    fn char_span(&self, range: TextRange) -> Option<(usize, usize)> {
        let start = self.char_idx(range.start)?;
        let end = self.char_idx(range.end)?;
        (start <= end).then_some((start, end))
    }

    /// Convert a position to a ropey char index, validating it first.
    fn char_idx(&self, pos: TextPosition) -> Option<usize> {
        if !self.is_valid(pos) {
            return None;
        }
        let byte = self.rope.line_to_byte(pos.line) + pos.column;
        Some(self.rope.byte_to_char(byte))
    }
}

impl std::fmt::Debug for EditorBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBuffer")
            .field(
                "rope",
                &format_args!("Rope({} lines)", self.rope.len_lines()),
            )
            .finish()
    }
}
