//! Text buffer abstraction.
//!
//! The engine never owns the editor's text. It drives whatever implements
//! [`TextBuffer`] and re-reads the text before every positional check.

/// Editor surface the engine replays operations into
pub trait TextBuffer {
    /// Current document content
    fn text(&self) -> String;

    /// Replace the chars in `[from_pos, to_pos)` with `text`
    fn replace(&mut self, from_pos: usize, to_pos: usize, text: &str);

    /// Move the selection. `from_pos` is the anchor, `to_pos` the head.
    fn set_selection(&mut self, from_pos: usize, to_pos: usize);
}

/// In-memory buffer used by headless replay and tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryBuffer {
    text: String,
    selection: (usize, usize),
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            selection: (0, 0),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn selection(&self) -> (usize, usize) {
        self.selection
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

impl TextBuffer for MemoryBuffer {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn replace(&mut self, from_pos: usize, to_pos: usize, text: &str) {
        let start = byte_offset(&self.text, from_pos);
        let end = byte_offset(&self.text, to_pos);
        self.text.replace_range(start..end, text);
    }

    fn set_selection(&mut self, from_pos: usize, to_pos: usize) {
        self.selection = (from_pos, to_pos);
    }
}

/// Byte offset of char position `pos`, clamped to the end of `text`
pub(crate) fn byte_offset(text: &str, pos: usize) -> usize {
    text.char_indices()
        .nth(pos)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}

/// Chars `[from_pos, to_pos)` of `text`, or `None` if the range runs past the end
pub(crate) fn char_slice(text: &str, from_pos: usize, to_pos: usize) -> Option<&str> {
    let len = text.chars().count();
    if from_pos > to_pos || to_pos > len {
        return None;
    }
    Some(&text[byte_offset(text, from_pos)..byte_offset(text, to_pos)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_counts_chars() {
        let mut buffer = MemoryBuffer::with_text("héllo wörld");
        buffer.replace(6, 11, "rust");
        assert_eq!(buffer.as_str(), "héllo rust");

        buffer.replace(0, 0, "¡");
        assert_eq!(buffer.text(), "¡héllo rust");
    }

    #[test]
    fn test_char_slice() {
        assert_eq!(char_slice("añb", 1, 2), Some("ñ"));
        assert_eq!(char_slice("añb", 3, 3), Some(""));
        assert_eq!(char_slice("añb", 2, 4), None);
        assert_eq!(char_slice("añb", 2, 1), None);
    }
}
