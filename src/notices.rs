//! User-visible notices (toasts)
//!
//! A cloneable handle onto one queue per document view. Components push
//! notices; the surrounding UI drains and displays them.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Shared notice queue
#[derive(Debug, Clone, Default)]
pub struct Notices {
    queue: Arc<Mutex<VecDeque<Notice>>>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, kind: NoticeKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            NoticeKind::Error => tracing::warn!("Notice: {}", message),
            _ => tracing::debug!("Notice: {}", message),
        }
        self.queue.lock().push_back(Notice { kind, message });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NoticeKind::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NoticeKind::Error, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.push(NoticeKind::Warning, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(NoticeKind::Info, message);
    }

    /// Take every pending notice, oldest first
    pub fn drain(&self) -> Vec<Notice> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
