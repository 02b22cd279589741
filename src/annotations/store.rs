//! Annotation loading and creation against the document API
//!
//! Loads always re-fetch the full list; nothing is cached or inserted
//! locally.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::types::{
    AppliedOverlay, FetchedAnnotations, ListedAnnotations, PanelState, ResolvedAnnotations,
    SidebarEntry,
};
use crate::anchor::AnchorResolver;
use crate::api::{Annotation, DocumentApi, NewAnnotation};
use crate::error::{ClientError, Result};
use crate::highlights::HighlightApplicator;
use crate::html::RenderedText;

/// Keeps one document's comment panel in step with the server
pub struct AnnotationSync {
    api: Arc<dyn DocumentApi>,
    document_id: String,
    resolver: AnchorResolver,
    panel: PanelState,
}

impl AnnotationSync {
    pub fn new(api: Arc<dyn DocumentApi>, document_id: &str, resolver: AnchorResolver) -> Self {
        Self {
            api,
            document_id: document_id.to_string(),
            resolver,
            panel: PanelState::Loading,
        }
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    /// Stage 1: fetch the list in server order
    pub async fn fetch(&self) -> Result<FetchedAnnotations> {
        let annotations = self.api.list_annotations(&self.document_id).await?;
        Ok(FetchedAnnotations { annotations })
    }

    /// Stage 2: build sidebar entries
    pub fn list(fetched: FetchedAnnotations, now: DateTime<Utc>) -> ListedAnnotations {
        let entries = fetched
            .annotations
            .iter()
            .map(|a| SidebarEntry::from_annotation(a, now))
            .collect();
        ListedAnnotations {
            annotations: fetched.annotations,
            entries,
        }
    }

    /// Stage 3: resolve every anchored annotation, in list order
    pub fn resolve(&self, listed: ListedAnnotations, rendered: &RenderedText) -> ResolvedAnnotations {
        let resolutions = listed
            .annotations
            .iter()
            .filter_map(|a| {
                let anchor = a.anchor_text.as_deref()?;
                Some((a.id.clone(), self.resolver.resolve(anchor, rendered)))
            })
            .collect();
        ResolvedAnnotations { listed, resolutions }
    }

    /// Stage 4: rebuild the persistent markers
    pub fn apply(
        resolved: ResolvedAnnotations,
        rendered: &RenderedText,
        applicator: &mut HighlightApplicator,
    ) -> AppliedOverlay {
        let report = applicator.apply_persistent(
            rendered,
            resolved
                .resolutions
                .iter()
                .map(|(id, resolution)| (id.as_str(), resolution)),
        );
        AppliedOverlay {
            entries: resolved.listed.entries,
            report,
        }
    }

    /// Run the whole load pipeline and update the panel.
    ///
    /// A fetch failure leaves the panel in its error state with no
    /// persistent markers; it is not retried.
    pub async fn load(
        &mut self,
        rendered: &RenderedText,
        applicator: &mut HighlightApplicator,
        now: DateTime<Utc>,
    ) -> &PanelState {
        self.panel = PanelState::Loading;

        let fetched = match self.fetch().await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!("Failed to load comments for {}: {}", self.document_id, e);
                applicator.clear_persistent();
                self.panel = PanelState::Error {
                    message: "Failed to load comments".to_string(),
                };
                return &self.panel;
            }
        };

        let listed = Self::list(fetched, now);
        let resolved = self.resolve(listed, rendered);
        let applied = Self::apply(resolved, rendered, applicator);

        tracing::info!(
            "Loaded {} comments for {} ({} markers, {} unresolved)",
            applied.entries.len(),
            self.document_id,
            applied.report.applied,
            applied.report.not_found + applied.report.conflicts
        );

        self.panel = if applied.entries.is_empty() {
            PanelState::Empty
        } else {
            PanelState::Loaded {
                count: applied.entries.len(),
                entries: applied.entries,
            }
        };
        &self.panel
    }

    /// Validate and send a new annotation. Empty content never reaches the
    /// server.
    pub async fn create(&self, content: &str, anchor_text: Option<&str>) -> Result<Annotation> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ClientError::Validation(
                "Comment content cannot be empty".to_string(),
            ));
        }

        let request = NewAnnotation {
            content: content.to_string(),
            anchor_text: anchor_text.map(str::to_string),
        };
        let created = self
            .api
            .create_annotation(&self.document_id, &request)
            .await?;

        tracing::info!(
            "Created comment {} on {} (anchored: {})",
            created.id,
            self.document_id,
            request.anchor_text.is_some()
        );
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{annotation, FakeApi};
    use crate::highlights::MarkerKind;
    use std::time::Duration;

    fn setup(api: &Arc<FakeApi>) -> (AnnotationSync, HighlightApplicator, RenderedText) {
        let sync = AnnotationSync::new(api.clone(), "doc-1", AnchorResolver::default());
        let applicator = HighlightApplicator::new(Duration::from_millis(2000));
        let rendered = RenderedText::from_html("<p>one alpha two</p><p>beta</p>").unwrap();
        (sync, applicator, rendered)
    }

    #[tokio::test]
    async fn test_load_lists_and_marks() {
        let api = Arc::new(FakeApi::default());
        api.state.lock().annotations = vec![
            annotation("c-1", "first", Some("alpha")),
            annotation("c-2", "general", None),
            annotation("c-3", "lost", Some("gamma")),
        ];
        let (mut sync, mut applicator, rendered) = setup(&api);

        let panel = sync.load(&rendered, &mut applicator, Utc::now()).await.clone();
        assert_eq!(panel.count(), 3);
        let ids: Vec<&str> = panel.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c-1", "c-2", "c-3"]);

        let marks: Vec<_> = applicator
            .overlay()
            .spans_of(MarkerKind::Persistent)
            .map(|s| s.triple())
            .collect();
        assert_eq!(marks, vec![(0, 4, 9, Some("c-1"))]);
    }

    #[tokio::test]
    async fn test_reload_does_not_duplicate_markers() {
        let api = Arc::new(FakeApi::default());
        api.state.lock().annotations = vec![annotation("c-1", "first", Some("alpha"))];
        let (mut sync, mut applicator, rendered) = setup(&api);

        sync.load(&rendered, &mut applicator, Utc::now()).await;
        sync.load(&rendered, &mut applicator, Utc::now()).await;
        assert_eq!(applicator.overlay().len(), 1);
        assert_eq!(api.state.lock().list_calls, 2);
    }

    #[tokio::test]
    async fn test_empty_list() {
        let api = Arc::new(FakeApi::default());
        let (mut sync, mut applicator, rendered) = setup(&api);

        assert_eq!(
            sync.load(&rendered, &mut applicator, Utc::now()).await,
            &PanelState::Empty
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_clears_markers() {
        let api = Arc::new(FakeApi::default());
        api.state.lock().annotations = vec![annotation("c-1", "first", Some("alpha"))];
        let (mut sync, mut applicator, rendered) = setup(&api);
        sync.load(&rendered, &mut applicator, Utc::now()).await;
        assert_eq!(applicator.overlay().len(), 1);

        api.state.lock().fail_list = true;
        let panel = sync.load(&rendered, &mut applicator, Utc::now()).await;
        assert!(matches!(panel, PanelState::Error { .. }));
        assert!(applicator.overlay().is_empty());
        assert_eq!(api.state.lock().list_calls, 2);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_content() {
        let api = Arc::new(FakeApi::default());
        let (sync, _, _) = setup(&api);

        let err = sync.create("   \n", Some("alpha")).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(api.state.lock().created.is_empty());
    }

    #[tokio::test]
    async fn test_create_trims_and_sends_anchor() {
        let api = Arc::new(FakeApi::default());
        let (sync, _, _) = setup(&api);

        sync.create("  hello  ", Some("alpha")).await.unwrap();
        sync.create("general", None).await.unwrap();

        let created = api.state.lock().created.clone();
        assert_eq!(
            created,
            vec![
                NewAnnotation {
                    content: "hello".to_string(),
                    anchor_text: Some("alpha".to_string()),
                },
                NewAnnotation {
                    content: "general".to_string(),
                    anchor_text: None,
                },
            ]
        );
    }
}
