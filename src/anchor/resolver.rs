//! Anchor resolution against the rendered text
//!
//! An anchor is matched by a bounded prefix inside a single text run. The
//! first occurrence in document order wins; there is no scoring between
//! candidates. A miss is an ordinary outcome, never an error.

use serde::Serialize;

use crate::config::AnchorConfig;
use crate::html::RenderedText;

/// Where an anchor landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnchorMatch {
    /// Run index in document order
    pub run: usize,
    /// Byte offset of the match inside the run
    pub start: usize,
    /// Byte offset where the marker ends, clamped to the run
    pub end: usize,
}

/// Outcome of resolving one anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Resolution {
    Found(AnchorMatch),
    NotFound,
}

impl Resolution {
    pub fn found(&self) -> Option<&AnchorMatch> {
        match self {
            Resolution::Found(m) => Some(m),
            Resolution::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

/// Locates anchors by their leading UTF-16 code units
#[derive(Debug, Clone, Copy)]
pub struct AnchorResolver {
    prefix_units: usize,
}

impl AnchorResolver {
    pub fn new(prefix_units: usize) -> Self {
        Self { prefix_units }
    }

    /// Resolver for persistent markers
    pub fn persistent(config: &AnchorConfig) -> Self {
        Self::new(config.prefix_units)
    }

    /// Resolver for hover previews
    pub fn preview(config: &AnchorConfig) -> Self {
        Self::new(config.preview_prefix_units)
    }

    pub fn prefix_units(&self) -> usize {
        self.prefix_units
    }

    /// Find the first run containing the anchor's prefix
    pub fn resolve(&self, anchor: &str, rendered: &RenderedText) -> Resolution {
        if anchor.trim().is_empty() {
            return Resolution::NotFound;
        }

        let needle = utf16_prefix(anchor, self.prefix_units);
        if needle.is_empty() {
            return Resolution::NotFound;
        }

        for run in rendered.runs() {
            if let Some(start) = run.text.find(needle) {
                let end = floor_char_boundary(&run.text, start + anchor.len());
                tracing::debug!(
                    "Anchor resolved in run {} at {}..{}",
                    run.index,
                    start,
                    end
                );
                return Resolution::Found(AnchorMatch {
                    run: run.index,
                    start,
                    end,
                });
            }
        }

        tracing::debug!("Anchor not found: {:?}", utf16_prefix(anchor, 30));
        Resolution::NotFound
    }
}

impl Default for AnchorResolver {
    fn default() -> Self {
        Self::persistent(&AnchorConfig::default())
    }
}

/// Longest prefix of `text` spanning at most `units` UTF-16 code units.
///
/// A character that would straddle the limit is left out rather than split.
pub fn utf16_prefix(text: &str, units: usize) -> &str {
    let mut used = 0;
    for (offset, ch) in text.char_indices() {
        used += ch.len_utf16();
        if used > units {
            return &text[..offset];
        }
    }
    text
}

/// Length of `text` in UTF-16 code units
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Clamp `index` to `text` and move it back onto a character boundary
fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
