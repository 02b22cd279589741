//! In-memory editor contents

use serde::Serialize;

use crate::anchor::utf16_len;
use crate::api::{DocumentRecord, DocumentUpdate};

/// Title sent when the title field is left empty
pub const UNTITLED: &str = "Untitled";

/// The (title, content) pair being edited
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PendingEdit {
    pub title: String,
    pub content: String,
}

impl PendingEdit {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn from_record(record: &DocumentRecord) -> Self {
        Self::new(record.title.clone(), record.content.clone())
    }

    /// Request body for saving this buffer
    pub fn to_update(&self) -> DocumentUpdate {
        let title = if self.title.is_empty() {
            UNTITLED.to_string()
        } else {
            self.title.clone()
        };
        DocumentUpdate {
            title,
            content: self.content.clone(),
        }
    }

    pub fn stats(&self) -> EditorStats {
        EditorStats::of(&self.content)
    }
}

/// Counters shown in the editor status bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EditorStats {
    pub words: usize,
    /// Length in UTF-16 code units
    pub chars: usize,
}

impl EditorStats {
    pub fn of(text: &str) -> Self {
        Self {
            words: text.split_whitespace().count(),
            chars: utf16_len(text),
        }
    }
}

/// 1-based cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CursorPosition {
    pub line: usize,
    /// Column in UTF-16 code units
    pub column: usize,
}

impl CursorPosition {
    /// Position of the byte offset `cursor` in `text`, clamped to the text
    /// and moved back onto a character boundary.
    pub fn at(text: &str, cursor: usize) -> Self {
        let mut cursor = cursor.min(text.len());
        while !text.is_char_boundary(cursor) {
            cursor -= 1;
        }

        let before = &text[..cursor];
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        Self {
            line: before.matches('\n').count() + 1,
            column: utf16_len(&before[line_start..]) + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_title_is_untitled() {
        assert_eq!(PendingEdit::new("", "body").to_update().title, "Untitled");
        assert_eq!(PendingEdit::new(" ", "body").to_update().title, " ");
        assert_eq!(PendingEdit::new("Notes", "body").to_update().title, "Notes");
    }

    #[test]
    fn test_stats() {
        let stats = EditorStats::of("  hello   world\n\nagain 😀 ");
        assert_eq!(stats.words, 4);
        assert_eq!(EditorStats::of("").words, 0);
        assert_eq!(EditorStats::of("a😀").chars, 3);
    }

    #[test]
    fn test_cursor_position() {
        let text = "first\nsecond line\nthird";
        assert_eq!(CursorPosition::at(text, 0), CursorPosition { line: 1, column: 1 });
        assert_eq!(CursorPosition::at(text, 6), CursorPosition { line: 2, column: 1 });
        assert_eq!(CursorPosition::at(text, 12), CursorPosition { line: 2, column: 7 });
        assert_eq!(CursorPosition::at(text, 999), CursorPosition { line: 3, column: 6 });
    }

    #[test]
    fn test_cursor_inside_multibyte_char() {
        // 'é' is bytes 1..3
        assert_eq!(CursorPosition::at("héllo", 2), CursorPosition { line: 1, column: 2 });
    }
}
