use std::fmt;

/// A location inside a document.
///
/// Both fields are zero-based. `column` is a byte offset within the line,
/// the same unit [`crate::editor::EditorBuffer`] uses to address text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TextPosition {
    pub line: usize,
    pub column: usize,
}

impl TextPosition {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// The start of a document.
    pub const fn origin() -> Self {
        Self::new(0, 0)
    }

    /// Position reached after writing `text` starting here.
    pub fn advance(self, text: &str) -> Self {
        match text.rfind('\n') {
            None => Self::new(self.line, self.column + text.len()),
            Some(last_newline) => {
                let newlines = text.bytes().filter(|b| *b == b'\n').count();
                Self::new(self.line + newlines, text.len() - last_newline - 1)
            }
        }
    }
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A span of text between two positions, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
}

impl TextRange {
    /// Create a range, swapping the endpoints if they arrive reversed.
    pub fn new(a: TextPosition, b: TextPosition) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// An empty range sitting at `at`.
    pub const fn empty(at: TextPosition) -> Self {
        Self { start: at, end: at }
    }

    /// The range `text` occupies once written at `start`.
    pub fn spanning(start: TextPosition, text: &str) -> Self {
        Self {
            start,
            end: start.advance(text),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Number of line breaks the range crosses.
    pub const fn line_span(&self) -> usize {
        self.end.line - self.start.line
    }

    /// Whether `pos` lies within the range, endpoints included.
    pub fn contains(&self, pos: TextPosition) -> bool {
        self.start <= pos && pos <= self.end
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One replacement: `range` (in pre-edit coordinates) becomes `inserted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOperation {
    pub range: TextRange,
    pub inserted: String,
}

impl EditOperation {
    pub fn new(range: TextRange, inserted: impl Into<String>) -> Self {
        Self {
            range,
            inserted: inserted.into(),
        }
    }

    pub fn insert(at: TextPosition, text: impl Into<String>) -> Self {
        Self::new(TextRange::empty(at), text)
    }

    pub fn delete(range: TextRange) -> Self {
        Self::new(range, String::new())
    }

    /// Where the inserted text ends once the edit is applied.
    pub fn inserted_end(&self) -> TextPosition {
        self.range.start.advance(&self.inserted)
    }

    /// An empty span replaced by empty text.
    pub fn is_noop(&self) -> bool {
        self.range.is_empty() && self.inserted.is_empty()
    }

    /// Inserted line breaks minus deleted line breaks.
    pub fn line_delta(&self) -> isize {
        let inserted = self.inserted.bytes().filter(|b| *b == b'\n').count();
        inserted as isize - self.range.line_span() as isize
    }
}
