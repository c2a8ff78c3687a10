//! Recomputing a tracked region after its document changes.

use crate::sync::batcher::ChangeSet;
use crate::text::{EditOperation, TextPosition, TextRange, translate};

/// Recompute `tracked` after one change set has been applied to its document.
///
/// Edits must be non-overlapping, in increasing position order, and expressed
/// against the document before the change set. Insertions touching either
/// boundary become part of the region; deleting the whole region collapses
/// it to an empty range where the deletion started.
pub fn recompute(tracked: TextRange, edits: &[EditOperation]) -> TextRange {
    let mut rebase = Rebase::default();
    let mut range = tracked;
    for original in edits {
        let edit = rebase.edit(original);
        range = absorb(range, &edit);
        rebase.record(original.range.end, edit.inserted_end());
    }
    range
}

/// Fold several change sets, oldest first.
pub fn recompute_batches(tracked: TextRange, batches: &[ChangeSet]) -> TextRange {
    batches
        .iter()
        .fold(tracked, |range, edits| recompute(range, edits))
}

fn absorb(range: TextRange, edit: &EditOperation) -> TextRange {
    let edit_start = edit.range.start;
    let edit_end = edit.range.end;

    if edit_start > range.end {
        return range;
    }
    let deletes = !edit.range.is_empty();
    if edit_end < range.start || (deletes && edit_end == range.start) {
        return TextRange::new(translate(range.start, edit), translate(range.end, edit));
    }

    let start = edit_start.min(range.start);
    let end = if edit_end > range.end {
        edit.inserted_end()
    } else {
        translate(range.end, edit)
    };
    TextRange::new(start, end.max(start))
}

/// Maps pre-change-set coordinates into the document produced by the edits
/// folded so far.
///
/// Earlier edits lie strictly before later ones, so only the line delta and,
/// on the line where the last edit ended, a column delta are needed.
#[derive(Debug, Default)]
struct Rebase {
    line_delta: isize,
    anchor_line: Option<usize>,
    column_delta: isize,
}

impl Rebase {
    fn position(&self, pos: TextPosition) -> TextPosition {
        let column = if self.anchor_line == Some(pos.line) {
            pos.column.saturating_add_signed(self.column_delta)
        } else {
            pos.column
        };
        TextPosition::new(pos.line.saturating_add_signed(self.line_delta), column)
    }

    fn edit(&self, edit: &EditOperation) -> EditOperation {
        let range = TextRange::new(self.position(edit.range.start), self.position(edit.range.end));
        EditOperation::new(range, edit.inserted.clone())
    }

    fn record(&mut self, original_end: TextPosition, new_end: TextPosition) {
        self.line_delta = new_end.line as isize - original_end.line as isize;
        self.column_delta = new_end.column as isize - original_end.column as isize;
        self.anchor_line = Some(original_end.line);
    }
}
