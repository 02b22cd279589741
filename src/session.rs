//! Per-document view state
//!
//! Everything a single open document needs lives here: the rendered text,
//! its markers, the comment panel, the pending selection and the current
//! highlight color. A session is created when a document is opened and
//! dropped with the view.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::anchor::{AnchorResolver, SelectionCapture};
use crate::annotations::{AnnotationSync, PanelState};
use crate::api::{DocumentApi, DocumentRecord};
use crate::config::ClientConfig;
use crate::editor::{Autosaver, PendingEdit};
use crate::error::{ClientError, Result};
use crate::highlights::HighlightApplicator;
use crate::html::{HighlightConfig, RenderedText, TextSelection};
use crate::notices::Notices;

pub struct DocumentSession {
    id: Uuid,
    document: DocumentRecord,
    api: Arc<dyn DocumentApi>,
    config: ClientConfig,
    markers: HighlightConfig,
    rendered: RenderedText,
    highlights: HighlightApplicator,
    annotations: AnnotationSync,
    capture: SelectionCapture,
    preview: AnchorResolver,
    notices: Notices,
    highlight_color: String,
    comment_input: String,
}

impl DocumentSession {
    /// Fetch a document and prepare its view
    pub async fn open(api: Arc<dyn DocumentApi>, document_id: &str, config: ClientConfig) -> Result<Self> {
        let id = Uuid::new_v4();
        let document = api.get_document(document_id).await?;

        let rendered = match &document.content_html {
            Some(html) => RenderedText::from_html(html)?,
            None => RenderedText::from_plain_text(&document.content)?,
        };

        tracing::info!(
            session = %id,
            "Opened document {} ({} text runs)",
            document.id,
            rendered.runs().len()
        );

        Ok(Self {
            id,
            annotations: AnnotationSync::new(
                api.clone(),
                &document.id,
                AnchorResolver::persistent(&config.anchors),
            ),
            preview: AnchorResolver::preview(&config.anchors),
            highlights: HighlightApplicator::new(config.highlights.pulse()),
            highlight_color: config.highlights.default_color.clone(),
            markers: HighlightConfig::default(),
            capture: SelectionCapture::new(),
            notices: Notices::new(),
            comment_input: String::new(),
            document,
            api,
            config,
            rendered,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn document(&self) -> &DocumentRecord {
        &self.document
    }

    pub fn rendered(&self) -> &RenderedText {
        &self.rendered
    }

    pub fn highlights(&self) -> &HighlightApplicator {
        &self.highlights
    }

    pub fn panel(&self) -> &PanelState {
        self.annotations.panel()
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn capture(&self) -> &SelectionCapture {
        &self.capture
    }

    /// Override the marker classes and attribute names
    pub fn set_marker_config(&mut self, markers: HighlightConfig) {
        self.markers = markers;
    }

    /// Re-fetch comments and rebuild the persistent markers
    pub async fn load_annotations(&mut self) -> &PanelState {
        self.annotations
            .load(&self.rendered, &mut self.highlights, Utc::now())
            .await
    }

    /// Document HTML with every current marker
    pub fn render(&self) -> Result<String> {
        self.highlights.render(&self.rendered, &self.markers)
    }

    /// Capture a selection for the next comment, preview it and prefill
    /// the comment input. Returns `false` if nothing usable was selected.
    pub fn comment_on_selection(&mut self, range: TextSelection) -> bool {
        let Some(captured) = self.capture.capture(&self.rendered, range) else {
            return false;
        };
        self.comment_input = captured.prefill();
        self.highlights.preview_selection(&self.rendered, &range);
        true
    }

    pub fn comment_input(&self) -> &str {
        &self.comment_input
    }

    pub fn set_comment_input(&mut self, text: &str) {
        self.comment_input = text.to_string();
    }

    /// Submit the comment input, anchored to the pending capture if any.
    ///
    /// On success the input and capture are cleared and the panel is
    /// reloaded. On failure both are kept for another attempt.
    pub async fn submit_comment(&mut self) -> Result<()> {
        let result = self
            .annotations
            .create(&self.comment_input, self.capture.anchor_text())
            .await;

        match result {
            Ok(_) => {
                self.comment_input.clear();
                self.capture.clear();
                self.highlights.clear_ephemeral();
                self.load_annotations().await;
                self.notices.success("Comment added");
                Ok(())
            }
            Err(e @ ClientError::Validation(_)) => Err(e),
            Err(e) => {
                self.notices.error("Failed to add comment");
                Err(e)
            }
        }
    }

    /// Preview the anchor of a sidebar entry
    pub fn hover_entry(&mut self, annotation_id: &str) -> bool {
        let anchor = self
            .annotations
            .panel()
            .entries()
            .iter()
            .find(|e| e.id == annotation_id)
            .and_then(|e| e.anchor_text.clone());

        match anchor {
            Some(anchor) => {
                let resolution = self.preview.resolve(&anchor, &self.rendered);
                self.highlights.show_ephemeral(&self.rendered, &resolution)
            }
            None => {
                self.highlights.clear_ephemeral();
                false
            }
        }
    }

    pub fn leave_entry(&mut self) {
        self.highlights.clear_ephemeral();
    }

    /// A persistent marker was clicked
    pub fn click_marker(&mut self, annotation_id: &str, now: Instant) {
        self.highlights.click_marker(annotation_id, now);
    }

    /// Sidebar entry that should be scrolled into view
    pub fn take_scroll_target(&mut self) -> Option<String> {
        self.highlights.take_scroll_target()
    }

    pub fn entry_pulsing(&mut self, annotation_id: &str, now: Instant) -> bool {
        self.highlights.pulse_active(annotation_id, now)
    }

    pub fn highlight_color(&self) -> &str {
        &self.highlight_color
    }

    pub fn set_highlight_color(&mut self, color: &str) {
        self.highlight_color = color.to_string();
    }

    /// Highlight a selection in the current color
    pub fn highlight_selection(&mut self, range: TextSelection) -> Result<usize> {
        match self
            .highlights
            .highlight_selection(&self.rendered, &range, &self.highlight_color)
        {
            Ok(pieces) => {
                self.notices.success("Highlight added");
                Ok(pieces)
            }
            Err(e) => {
                self.notices.error(e.user_message());
                Err(e)
            }
        }
    }

    /// Selected text for the clipboard
    pub fn copy_selection(&self, range: TextSelection) -> Option<String> {
        let text = self.rendered.slice(&range)?;
        self.notices.success("Copied to clipboard");
        Some(text)
    }

    /// Flip the favorite flag, returning the new value
    pub async fn toggle_favorite(&mut self) -> Result<bool> {
        let favorited = self.document.is_favorited;
        let result = if favorited {
            self.api.remove_favorite(&self.document.id).await
        } else {
            self.api.add_favorite(&self.document.id).await
        };

        match result {
            Ok(()) => {
                self.document.is_favorited = !favorited;
                self.notices.success(if favorited {
                    "Removed from favorites"
                } else {
                    "Added to favorites"
                });
                Ok(!favorited)
            }
            Err(e) => {
                self.notices.error("Something went wrong");
                Err(e)
            }
        }
    }

    pub async fn delete_document(&self) -> Result<()> {
        match self.api.delete_document(&self.document.id).await {
            Ok(()) => {
                tracing::info!(session = %self.id, "Deleted document {}", self.document.id);
                self.notices.success("Document deleted");
                Ok(())
            }
            Err(e) => {
                self.notices.error("Failed to delete document");
                Err(e)
            }
        }
    }

    /// Start editing this document
    pub fn editor(&self) -> Autosaver {
        Autosaver::new(
            self.api.clone(),
            &self.document.id,
            PendingEdit::from_record(&self.document),
            &self.config.autosave,
            self.notices.clone(),
        )
    }
}
