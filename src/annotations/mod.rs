//! Annotation module
//!
//! Fetches a document's comments, lists them for the sidebar and places a
//! persistent marker for every comment whose anchor still resolves.
//!
//! # Load pipeline
//!
//! `FetchedAnnotations` → `ListedAnnotations` → `ResolvedAnnotations` →
//! `AppliedOverlay`

mod store;
mod types;

pub use store::AnnotationSync;
pub use types::{
    relative_time, AppliedOverlay, FetchedAnnotations, ListedAnnotations, PanelState,
    ResolvedAnnotations, SidebarEntry,
};
