use super::{EditOperation, TextPosition};

/// Map `position` through `edit` to where it sits once the edit is applied.
///
/// - Edits ending at or before the position shift it by the edit's line
///   delta, plus the column delta when they end on the position's line. A
///   pure insertion exactly at the position therefore pushes it past the
///   inserted text.
/// - A position strictly inside the replaced span follows the content and
///   lands at the end of the inserted text.
/// - Edits starting at or after the position leave it alone.
pub fn translate(position: TextPosition, edit: &EditOperation) -> TextPosition {
    let start = edit.range.start;
    let end = edit.range.end;
    if end <= position {
        shift_past(position, end, edit.inserted_end())
    } else if start < position {
        edit.inserted_end()
    } else {
        position
    }
}

/// Move a position at or after `old_end` so it keeps its distance from the
/// text that now ends at `new_end`.
fn shift_past(position: TextPosition, old_end: TextPosition, new_end: TextPosition) -> TextPosition {
    if position.line == old_end.line {
        TextPosition::new(new_end.line, new_end.column + (position.column - old_end.column))
    } else {
        TextPosition::new(position.line - old_end.line + new_end.line, position.column)
    }
}
