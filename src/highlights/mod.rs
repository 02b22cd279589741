//! Highlight markers
//!
//! Markers are overlay spans over the immutable text runs; see
//! [`crate::html::composite`] for how they reach the output HTML.

mod applicator;
mod overlay;

pub use applicator::{ApplyReport, HighlightApplicator, Pulse};
pub use overlay::{MarkerKind, Overlay, OverlaySpan};
