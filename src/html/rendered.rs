//! Immutable text-run view of a rendered document
//!
//! A run is one non-empty data text node of the rendered HTML, in document
//! order. Runs never change for the life of a load; markers are layered on
//! top as overlay spans and composited back into HTML on output.

use html_escape::decode_html_entities;
use lol_html::html_content::{ContentType, TextType};
use lol_html::{doc_text, rewrite_str, RewriteStrSettings};
use serde::Serialize;

use super::highlight_injector::{sanitize_html, InjectError};

/// A single contiguous text run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextRun {
    /// Position of the run in document order
    pub index: usize,
    /// Entity-decoded text
    pub text: String,
}

/// A position inside the rendered text (byte offset into a run)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TextPosition {
    pub run: usize,
    pub offset: usize,
}

/// A live selection range over the rendered text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextSelection {
    pub start: TextPosition,
    pub end: TextPosition,
}

impl TextPosition {
    pub fn new(run: usize, offset: usize) -> Self {
        Self { run, offset }
    }
}

impl TextSelection {
    pub fn new(start: TextPosition, end: TextPosition) -> Self {
        Self { start, end }
    }

    /// Selection confined to one run
    pub fn within_run(run: usize, start: usize, end: usize) -> Self {
        Self {
            start: TextPosition::new(run, start),
            end: TextPosition::new(run, end),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Sanitized rendered HTML together with its text runs
#[derive(Debug, Clone)]
pub struct RenderedText {
    html: String,
    runs: Vec<TextRun>,
}

impl RenderedText {
    /// Sanitize `html` and split it into text runs
    pub fn from_html(html: &str) -> Result<Self, InjectError> {
        let html = sanitize_html(html)?;
        let mut runs = Vec::new();

        rewrite_text_runs(&html, |index, _raw, decoded| {
            runs.push(TextRun {
                index,
                text: decoded.to_string(),
            });
            None
        })?;

        Ok(Self { html, runs })
    }

    /// Rendered HTML for documents that only carry source text
    pub fn from_plain_text(text: &str) -> Result<Self, InjectError> {
        Self::from_html(&format!("<pre>{}</pre>", html_escape::encode_text(text)))
    }

    /// The sanitized HTML the runs were read from
    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }

    pub fn run(&self, index: usize) -> Option<&TextRun> {
        self.runs.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// All runs joined with no separator
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Text covered by a selection, concatenated across runs.
    ///
    /// Returns `None` when either end does not land on a character boundary
    /// of an existing run or the range is inverted.
    pub fn slice(&self, selection: &TextSelection) -> Option<String> {
        let TextSelection { start, end } = *selection;
        if start > end {
            return None;
        }
        self.check_position(start)?;
        self.check_position(end)?;

        if start.run == end.run {
            let text = &self.runs[start.run].text;
            return Some(text[start.offset..end.offset].to_string());
        }

        let mut out = String::new();
        out.push_str(&self.runs[start.run].text[start.offset..]);
        for run in &self.runs[start.run + 1..end.run] {
            out.push_str(&run.text);
        }
        out.push_str(&self.runs[end.run].text[..end.offset]);
        Some(out)
    }

    /// Validate that a position points at a character boundary of a run
    pub fn check_position(&self, position: TextPosition) -> Option<()> {
        let run = self.runs.get(position.run)?;
        run.text.is_char_boundary(position.offset).then_some(())
    }
}

/// Walk every non-empty data text node in `html`, in document order.
///
/// `on_run` receives the run index, the raw source text and the decoded
/// text. Returning `Some(html)` replaces the node's output; `None` re-emits
/// the raw text untouched.
pub(crate) fn rewrite_text_runs<F>(html: &str, mut on_run: F) -> Result<String, InjectError>
where
    F: FnMut(usize, &str, &str) -> Option<String>,
{
    let mut pending = String::new();
    let mut index = 0usize;

    let output = rewrite_str(
        html,
        RewriteStrSettings {
            document_content_handlers: vec![doc_text!(|chunk| {
                if !matches!(chunk.text_type(), TextType::Data) {
                    return Ok(());
                }

                pending.push_str(chunk.as_str());
                if !chunk.last_in_text_node() {
                    // Held back until the whole node is known
                    chunk.remove();
                    return Ok(());
                }

                let raw = std::mem::take(&mut pending);
                let decoded = decode_html_entities(&raw);
                let replacement = if decoded.is_empty() {
                    None
                } else {
                    let replacement = on_run(index, &raw, &decoded);
                    index += 1;
                    replacement
                };

                chunk.replace(replacement.as_deref().unwrap_or(&raw), ContentType::Html);
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| InjectError::RewriteError(e.to_string()));
    output
}
