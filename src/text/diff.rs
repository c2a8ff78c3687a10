use super::{EditOperation, TextPosition, TextRange};

/// Convert a byte offset in `text` into a line/column position.
///
/// `offset` must sit on a char boundary.
pub fn position_at(text: &str, offset: usize) -> TextPosition {
    let before = &text[..offset];
    let line = before.bytes().filter(|b| *b == b'\n').count();
    let column = before.rfind('\n').map_or(offset, |idx| offset - idx - 1);
    TextPosition::new(line, column)
}

/// Reduce a rewrite of `old` into `new` to a single replacement.
///
/// The edit covers everything between the longest common prefix and the
/// longest common suffix that does not overlap it. Returns `None` when the
/// texts are identical.
pub fn single_edit(old: &str, new: &str) -> Option<EditOperation> {
    if old == new {
        return None;
    }
    let (a, b) = (old.as_bytes(), new.as_bytes());

    let mut prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    while !(old.is_char_boundary(prefix) && new.is_char_boundary(prefix)) {
        prefix -= 1;
    }

    let max_suffix = a.len().min(b.len()) - prefix;
    let mut suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take(max_suffix)
        .take_while(|(x, y)| x == y)
        .count();
    while !(old.is_char_boundary(a.len() - suffix) && new.is_char_boundary(b.len() - suffix)) {
        suffix -= 1;
    }

    let range = TextRange::new(
        position_at(old, prefix),
        position_at(old, a.len() - suffix),
    );
    Some(EditOperation::new(range, &new[prefix..b.len() - suffix]))
}
