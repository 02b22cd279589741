//! Overlay spans layered over the immutable text runs

use serde::Serialize;

use crate::error::{ClientError, Result};
use crate::html::RenderedText;

/// Kind of marker an overlay span renders as
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    /// Rebuilt on every load for each annotation whose anchor resolves
    Persistent,
    /// Interactive highlight of the current selection
    Manual,
    /// Hover/preview marker, at most one live
    Ephemeral,
}

/// One marker span inside a single run (byte offsets)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlaySpan {
    #[serde(rename = "annotationId", skip_serializing_if = "Option::is_none")]
    pub annotation_id: Option<String>,
    pub run: usize,
    pub start: usize,
    pub end: usize,
    pub kind: MarkerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Application order, used to break ties when spans nest
    pub seq: u64,
}

impl OverlaySpan {
    /// Key that fixes nesting: outer spans first
    pub(crate) fn nesting_key(&self) -> (usize, std::cmp::Reverse<usize>, MarkerKind, u64) {
        (self.start, std::cmp::Reverse(self.end), self.kind, self.seq)
    }

    /// (run, start, end, annotation id) used to compare marker sets
    pub fn triple(&self) -> (usize, usize, usize, Option<&str>) {
        (self.run, self.start, self.end, self.annotation_id.as_deref())
    }

    /// Check that the span can be placed on the current text
    pub fn validate(&self, rendered: &RenderedText) -> Result<()> {
        let run = rendered.run(self.run).ok_or_else(|| {
            ClientError::StructuralConflict(format!("run {} does not exist", self.run))
        })?;

        if self.start > self.end {
            return Err(ClientError::StructuralConflict(format!(
                "inverted span {}..{}",
                self.start, self.end
            )));
        }
        if self.end > run.text.len() {
            return Err(ClientError::StructuralConflict(format!(
                "span end {} past run {} of length {}",
                self.end,
                self.run,
                run.text.len()
            )));
        }
        if !run.text.is_char_boundary(self.start) || !run.text.is_char_boundary(self.end) {
            return Err(ClientError::StructuralConflict(format!(
                "span {}..{} splits a character",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

/// All marker spans of a document view
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    spans: Vec<OverlaySpan>,
    next_seq: u64,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> &[OverlaySpan] {
        &self.spans
    }

    pub fn spans_of(&self, kind: MarkerKind) -> impl Iterator<Item = &OverlaySpan> {
        self.spans.iter().filter(move |s| s.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub(crate) fn push(
        &mut self,
        kind: MarkerKind,
        annotation_id: Option<&str>,
        run: usize,
        start: usize,
        end: usize,
        color: Option<&str>,
    ) -> &OverlaySpan {
        self.next_seq += 1;
        self.spans.push(OverlaySpan {
            annotation_id: annotation_id.map(str::to_string),
            run,
            start,
            end,
            kind,
            color: color.map(str::to_string),
            seq: self.next_seq,
        });
        &self.spans[self.spans.len() - 1]
    }

    /// Remove every span of one kind, returning how many went away
    pub(crate) fn clear_kind(&mut self, kind: MarkerKind) -> usize {
        let before = self.spans.len();
        self.spans.retain(|s| s.kind != kind);
        before - self.spans.len()
    }

    pub fn clear(&mut self) {
        self.spans.clear();
    }
}
