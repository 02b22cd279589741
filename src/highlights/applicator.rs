//! Marker placement over the rendered text
//!
//! The applicator is the only writer of the overlay. Persistent markers are
//! rebuilt wholesale on each load, the ephemeral marker is replaced on every
//! hover, and manual highlights accumulate until the view is dropped.

use std::time::{Duration, Instant};

use crate::anchor::{AnchorMatch, Resolution};
use crate::error::{ClientError, Result};
use crate::html::{composite, HighlightConfig, RenderedText, TextSelection};

use super::overlay::{MarkerKind, Overlay, OverlaySpan};

/// Sidebar entry currently pulsing after a marker click
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pulse {
    pub annotation_id: String,
    pub until: Instant,
}

/// Summary of one persistent application pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub not_found: usize,
    pub conflicts: usize,
}

pub struct HighlightApplicator {
    overlay: Overlay,
    scroll_target: Option<String>,
    pulse: Option<Pulse>,
    pulse_duration: Duration,
}

impl HighlightApplicator {
    pub fn new(pulse_duration: Duration) -> Self {
        Self {
            overlay: Overlay::new(),
            scroll_target: None,
            pulse: None,
            pulse_duration,
        }
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Replace every persistent marker with the given resolutions.
    ///
    /// Each annotation is placed on its own; a miss or a span that cannot be
    /// placed only drops that annotation's marker.
    pub fn apply_persistent<'a, I>(&mut self, rendered: &RenderedText, resolved: I) -> ApplyReport
    where
        I: IntoIterator<Item = (&'a str, &'a Resolution)>,
    {
        let removed = self.overlay.clear_kind(MarkerKind::Persistent);
        if removed > 0 {
            tracing::debug!("Cleared {} persistent markers", removed);
        }

        let mut report = ApplyReport::default();
        for (annotation_id, resolution) in resolved {
            let Some(m) = resolution.found() else {
                report.not_found += 1;
                continue;
            };

            match self.place(rendered, MarkerKind::Persistent, Some(annotation_id), m, None) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    tracing::debug!("Skipping marker for annotation {}: {}", annotation_id, e);
                    report.conflicts += 1;
                }
            }
        }

        report
    }

    pub fn clear_persistent(&mut self) -> usize {
        self.overlay.clear_kind(MarkerKind::Persistent)
    }

    /// Show the preview marker for a resolved anchor, replacing any earlier one
    pub fn show_ephemeral(&mut self, rendered: &RenderedText, resolution: &Resolution) -> bool {
        self.clear_ephemeral();
        let Some(m) = resolution.found() else {
            return false;
        };
        self.place(rendered, MarkerKind::Ephemeral, None, m, None)
            .map_err(|e| tracing::debug!("Preview marker not placed: {}", e))
            .is_ok()
    }

    /// Preview a fresh selection. Multi-run selections preview as one
    /// marker split per run.
    pub fn preview_selection(&mut self, rendered: &RenderedText, selection: &TextSelection) -> bool {
        self.clear_ephemeral();
        let Ok(pieces) = split_selection(rendered, selection) else {
            return false;
        };
        for piece in &pieces {
            if self
                .place(rendered, MarkerKind::Ephemeral, None, piece, None)
                .is_err()
            {
                self.clear_ephemeral();
                return false;
            }
        }
        !pieces.is_empty()
    }

    pub fn clear_ephemeral(&mut self) {
        self.overlay.clear_kind(MarkerKind::Ephemeral);
    }

    /// Highlight the selection in `color`, one span per covered run.
    ///
    /// Nothing is added unless every piece can be placed.
    pub fn highlight_selection(
        &mut self,
        rendered: &RenderedText,
        selection: &TextSelection,
        color: &str,
    ) -> Result<usize> {
        let pieces = split_selection(rendered, selection)?;
        if pieces.is_empty() {
            return Err(ClientError::Validation(
                "Select some text to highlight".to_string(),
            ));
        }

        let mut staged = self.overlay.clone();
        for piece in &pieces {
            let candidate = candidate(MarkerKind::Manual, piece);
            candidate.validate(rendered)?;
            staged.push(MarkerKind::Manual, None, piece.run, piece.start, piece.end, Some(color));
        }
        self.overlay = staged;

        tracing::info!("Added manual highlight over {} run(s)", pieces.len());
        Ok(pieces.len())
    }

    /// Handle a click on a persistent marker: scroll its sidebar entry into
    /// view and start the pulse.
    pub fn click_marker(&mut self, annotation_id: &str, now: Instant) {
        self.scroll_target = Some(annotation_id.to_string());
        self.pulse = Some(Pulse {
            annotation_id: annotation_id.to_string(),
            until: now + self.pulse_duration,
        });
    }

    /// Sidebar entry to bring into view, consumed by the caller
    pub fn take_scroll_target(&mut self) -> Option<String> {
        self.scroll_target.take()
    }

    /// Whether `annotation_id` is still pulsing at `now`. An expired pulse
    /// clears itself.
    pub fn pulse_active(&mut self, annotation_id: &str, now: Instant) -> bool {
        match &self.pulse {
            Some(p) if now >= p.until => {
                self.pulse = None;
                false
            }
            Some(p) => p.annotation_id == annotation_id,
            None => false,
        }
    }

    /// Composite every marker onto the rendered HTML
    pub fn render(&self, rendered: &RenderedText, config: &HighlightConfig) -> Result<String> {
        Ok(composite(rendered.html(), self.overlay.spans(), config)?)
    }

    fn place(
        &mut self,
        rendered: &RenderedText,
        kind: MarkerKind,
        annotation_id: Option<&str>,
        m: &AnchorMatch,
        color: Option<&str>,
    ) -> Result<()> {
        candidate(kind, m).validate(rendered)?;
        self.overlay
            .push(kind, annotation_id, m.run, m.start, m.end, color);
        Ok(())
    }
}

fn candidate(kind: MarkerKind, m: &AnchorMatch) -> OverlaySpan {
    OverlaySpan {
        annotation_id: None,
        run: m.run,
        start: m.start,
        end: m.end,
        kind,
        color: None,
        seq: 0,
    }
}

/// Cut a selection into non-empty per-run ranges
fn split_selection(rendered: &RenderedText, selection: &TextSelection) -> Result<Vec<AnchorMatch>> {
    let TextSelection { start, end } = *selection;
    if start > end || rendered.check_position(start).is_none() || rendered.check_position(end).is_none() {
        return Err(ClientError::StructuralConflict(format!(
            "selection {:?}..{:?} does not map onto the document",
            start, end
        )));
    }

    let mut pieces = Vec::new();
    for run in &rendered.runs()[start.run..=end.run] {
        let from = if run.index == start.run { start.offset } else { 0 };
        let to = if run.index == end.run { end.offset } else { run.text.len() };
        if from < to {
            pieces.push(AnchorMatch {
                run: run.index,
                start: from,
                end: to,
            });
        }
    }
    Ok(pieces)
}
