//! In-memory [`DocumentApi`] for tests

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;

use super::client::DocumentApi;
use super::types::{Annotation, DocumentRecord, DocumentUpdate, NewAnnotation};
use crate::error::{ClientError, Result};

#[derive(Default)]
pub(crate) struct FakeState {
    pub document: Option<DocumentRecord>,
    pub annotations: Vec<Annotation>,
    pub created: Vec<NewAnnotation>,
    /// Every save, stamped with the (possibly paused) tokio clock
    pub updates: Vec<(Instant, DocumentUpdate)>,
    /// Per-save response delays, consumed in order
    pub update_delays: VecDeque<Duration>,
    /// Per-save failure flags, consumed in order
    pub update_failures: VecDeque<bool>,
    pub fail_list: bool,
    pub fail_create: bool,
    pub list_calls: usize,
    pub favorite_calls: Vec<bool>,
    pub deleted: bool,
}

#[derive(Default)]
pub(crate) struct FakeApi {
    pub state: Mutex<FakeState>,
}

pub(crate) fn record(id: &str, title: &str, content: &str, html: Option<&str>) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        content_html: html.map(str::to_string),
        current_version: 1,
        updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        is_favorited: false,
    }
}

pub(crate) fn annotation(id: &str, content: &str, anchor: Option<&str>) -> Annotation {
    Annotation {
        id: id.to_string(),
        author_name: Some("Mina".to_string()),
        content: content.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        anchor_text: anchor.map(str::to_string),
    }
}

impl FakeApi {
    pub fn with_document(document: DocumentRecord) -> Self {
        let api = Self::default();
        api.state.lock().document = Some(document);
        api
    }

    fn server_error() -> ClientError {
        ClientError::Api {
            status: 500,
            detail: "Internal error".to_string(),
        }
    }
}

#[async_trait]
impl DocumentApi for FakeApi {
    async fn get_document(&self, _document_id: &str) -> Result<DocumentRecord> {
        self.state.lock().document.clone().ok_or(ClientError::Api {
            status: 404,
            detail: "Document not found".to_string(),
        })
    }

    async fn update_document(&self, document_id: &str, update: &DocumentUpdate) -> Result<DocumentRecord> {
        // Applied on arrival; the delay only holds back the response
        let (delay, outcome) = {
            let mut state = self.state.lock();
            state.updates.push((Instant::now(), update.clone()));
            let delay = state.update_delays.pop_front().unwrap_or_default();
            if state.update_failures.pop_front().unwrap_or(false) {
                (delay, None)
            } else {
                let version = state.updates.len() as i64 + 1;
                let mut saved = state
                    .document
                    .clone()
                    .unwrap_or_else(|| record(document_id, "", "", None));
                saved.title = update.title.clone();
                saved.content = update.content.clone();
                saved.current_version = version;
                state.document = Some(saved.clone());
                (delay, Some(saved))
            }
        };

        tokio::time::sleep(delay).await;
        outcome.ok_or_else(Self::server_error)
    }

    async fn delete_document(&self, _document_id: &str) -> Result<()> {
        self.state.lock().deleted = true;
        Ok(())
    }

    async fn list_annotations(&self, _document_id: &str) -> Result<Vec<Annotation>> {
        let mut state = self.state.lock();
        state.list_calls += 1;
        if state.fail_list {
            return Err(Self::server_error());
        }
        Ok(state.annotations.clone())
    }

    async fn create_annotation(&self, _document_id: &str, annotation: &NewAnnotation) -> Result<Annotation> {
        let mut state = self.state.lock();
        if state.fail_create {
            return Err(Self::server_error());
        }
        state.created.push(annotation.clone());
        let created = Annotation {
            id: format!("c-{}", state.annotations.len() + 1),
            author_name: Some("Mina".to_string()),
            content: annotation.content.clone(),
            created_at: Utc::now(),
            anchor_text: annotation.anchor_text.clone(),
        };
        state.annotations.push(created.clone());
        Ok(created)
    }

    async fn add_favorite(&self, _document_id: &str) -> Result<()> {
        self.state.lock().favorite_calls.push(true);
        Ok(())
    }

    async fn remove_favorite(&self, _document_id: &str) -> Result<()> {
        self.state.lock().favorite_calls.push(false);
        Ok(())
    }
}
