//! Selection capture for comment anchors

use crate::html::{RenderedText, TextSelection};

use super::resolver::utf16_prefix;

/// Characters of the selection echoed into the comment input
const PREFILL_UNITS: usize = 50;

/// The selection pending for the next comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// Exact selected string, becomes the anchor text
    pub text: String,
    /// Live range, only used for the immediate preview
    pub range: TextSelection,
}

/// Holds at most one pending capture
#[derive(Debug, Default)]
pub struct SelectionCapture {
    current: Option<Capture>,
}

impl SelectionCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `range` from the rendered text, replacing any earlier capture.
    ///
    /// Returns `None` (and keeps the earlier capture) when the range does
    /// not map onto the text or selects only whitespace.
    pub fn capture(&mut self, rendered: &RenderedText, range: TextSelection) -> Option<&Capture> {
        let text = rendered.slice(&range)?;
        if text.trim().is_empty() {
            return None;
        }

        self.current = Some(Capture { text, range });
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&Capture> {
        self.current.as_ref()
    }

    /// Anchor text for the next submission
    pub fn anchor_text(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.text.as_str())
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

impl Capture {
    /// Comment input prefill: the quoted start of the selection
    pub fn prefill(&self) -> String {
        let head = utf16_prefix(&self.text, PREFILL_UNITS);
        let ellipsis = if head.len() < self.text.len() { "..." } else { "" };
        format!("\"{}{}\" - ", head, ellipsis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::TextPosition;

    fn rendered() -> RenderedText {
        RenderedText::from_html("<p>alpha beta</p><p>gamma</p>").unwrap()
    }

    #[test]
    fn test_capture_records_text_and_range() {
        let rendered = rendered();
        let mut capture = SelectionCapture::new();
        let range = TextSelection::within_run(0, 0, 5);

        let captured = capture.capture(&rendered, range).unwrap();
        assert_eq!(captured.text, "alpha");
        assert_eq!(captured.range, range);
        assert_eq!(capture.anchor_text(), Some("alpha"));
    }

    #[test]
    fn test_new_capture_replaces_previous() {
        let rendered = rendered();
        let mut capture = SelectionCapture::new();
        capture.capture(&rendered, TextSelection::within_run(0, 0, 5));
        capture.capture(&rendered, TextSelection::within_run(1, 0, 5));

        assert_eq!(capture.anchor_text(), Some("gamma"));
    }

    #[test]
    fn test_whitespace_selection_is_ignored() {
        let rendered = rendered();
        let mut capture = SelectionCapture::new();
        capture.capture(&rendered, TextSelection::within_run(0, 0, 5));

        assert!(capture
            .capture(&rendered, TextSelection::within_run(0, 5, 6))
            .is_none());
        assert_eq!(capture.anchor_text(), Some("alpha"));
    }

    #[test]
    fn test_multi_run_capture() {
        let rendered = rendered();
        let mut capture = SelectionCapture::new();
        let range = TextSelection::new(TextPosition::new(0, 6), TextPosition::new(1, 3));
        assert_eq!(capture.capture(&rendered, range).unwrap().text, "betagam");
    }

    #[test]
    fn test_prefill() {
        let short = Capture {
            text: "alpha".to_string(),
            range: TextSelection::within_run(0, 0, 5),
        };
        assert_eq!(short.prefill(), "\"alpha\" - ");

        let long = Capture {
            text: "w".repeat(60),
            range: TextSelection::within_run(0, 0, 60),
        };
        assert_eq!(long.prefill(), format!("\"{}...\" - ", "w".repeat(50)));
    }
}
