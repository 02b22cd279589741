//! Annotation panel types
//!
//! The load path runs as a typed pipeline; each stage owns the output of
//! the previous one so a stage can only run once its inputs exist.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::anchor::{utf16_len, utf16_prefix, Resolution};
use crate::api::Annotation;
use crate::highlights::ApplyReport;

/// UTF-16 units of the anchor quoted in the sidebar
const QUOTE_UNITS: usize = 100;

/// Raw server response
#[derive(Debug, Clone)]
pub struct FetchedAnnotations {
    pub annotations: Vec<Annotation>,
}

/// Annotations with their sidebar entries, still in server order
#[derive(Debug, Clone)]
pub struct ListedAnnotations {
    pub annotations: Vec<Annotation>,
    pub entries: Vec<SidebarEntry>,
}

/// Listed annotations with a resolution per anchored annotation
#[derive(Debug, Clone)]
pub struct ResolvedAnnotations {
    pub listed: ListedAnnotations,
    /// (annotation id, resolution), list order, anchored annotations only
    pub resolutions: Vec<(String, Resolution)>,
}

/// Final stage: markers are in the overlay
#[derive(Debug, Clone)]
pub struct AppliedOverlay {
    pub entries: Vec<SidebarEntry>,
    pub report: ApplyReport,
}

/// What the comment panel shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PanelState {
    Loading,
    Empty,
    Loaded { entries: Vec<SidebarEntry>, count: usize },
    Error { message: String },
}

impl PanelState {
    pub fn count(&self) -> usize {
        match self {
            PanelState::Loaded { count, .. } => *count,
            _ => 0,
        }
    }

    pub fn entries(&self) -> &[SidebarEntry] {
        match self {
            PanelState::Loaded { entries, .. } => entries,
            _ => &[],
        }
    }
}

/// One comment as listed in the sidebar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidebarEntry {
    pub id: String,
    pub author: String,
    pub author_initial: String,
    pub time_label: String,
    /// Anchor text, truncated for display
    pub quote: Option<String>,
    pub content: String,
    /// Full anchor, used for hover previews
    #[serde(skip)]
    pub anchor_text: Option<String>,
}

impl SidebarEntry {
    pub fn from_annotation(annotation: &Annotation, now: DateTime<Utc>) -> Self {
        let author = annotation
            .author_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let author_initial = annotation
            .author_name
            .as_deref()
            .and_then(|n| n.chars().next())
            .unwrap_or('U')
            .to_uppercase()
            .collect();

        Self {
            id: annotation.id.clone(),
            author,
            author_initial,
            time_label: relative_time(annotation.created_at, now),
            quote: annotation.anchor_text.as_deref().map(quote),
            content: annotation.content.clone(),
            anchor_text: annotation.anchor_text.clone(),
        }
    }
}

fn quote(anchor: &str) -> String {
    if utf16_len(anchor) > QUOTE_UNITS {
        format!("{}...", utf16_prefix(anchor, QUOTE_UNITS))
    } else {
        anchor.to_string()
    }
}

/// Short label for how long ago `at` was
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);

    if elapsed.num_seconds() < 60 {
        "just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}d ago", elapsed.num_days())
    } else {
        at.format("%b %-d, %Y").to_string()
    }
}
