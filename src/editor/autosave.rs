//! Debounced autosave for the editor
//!
//! [`AutosaveMachine`] holds the save state and decides when a request is
//! due; it does no I/O. [`Autosaver`] drives it on tokio: every edit
//! restarts a single debounce timer, and a timer that fires hands its
//! request off so later edits can never cancel a save already in flight.
//!
//! Each request carries a sequence number. Only the completion of the most
//! recently issued request is applied; older completions are dropped.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;

use super::buffer::PendingEdit;
use crate::api::{DocumentApi, DocumentRecord, DocumentUpdate};
use crate::config::AutosaveConfig;
use crate::error::Result;
use crate::notices::Notices;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveState {
    /// Buffer matches the last saved snapshot
    Clean,
    /// Edited since the last save was issued
    Dirty,
    /// A request is in flight and nothing has changed since it was issued
    Saving,
    /// The latest request failed
    Error,
}

/// A save the caller must send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    pub seq: u64,
    pub request: DocumentUpdate,
}

/// How a request completion was treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Accepted,
    /// A newer request was issued since; the completion changed nothing
    Stale,
}

#[derive(Debug, Clone)]
pub struct AutosaveMachine {
    buffer: PendingEdit,
    snapshot: PendingEdit,
    state: SaveState,
    latest_seq: u64,
    latest_sent: Option<PendingEdit>,
    completing: bool,
    saved_version: Option<i64>,
}

impl AutosaveMachine {
    /// Start clean from the content last loaded from the server
    pub fn new(saved: PendingEdit) -> Self {
        Self {
            buffer: saved.clone(),
            snapshot: saved,
            state: SaveState::Clean,
            latest_seq: 0,
            latest_sent: None,
            completing: false,
            saved_version: None,
        }
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn buffer(&self) -> &PendingEdit {
        &self.buffer
    }

    pub fn snapshot(&self) -> &PendingEdit {
        &self.snapshot
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    /// Server version recorded by the last accepted save
    pub fn saved_version(&self) -> Option<i64> {
        self.saved_version
    }

    /// Whether the buffer already matches what the server has or is about
    /// to have
    pub fn is_noop(&self) -> bool {
        self.buffer == *self.baseline()
    }

    /// Content of the request in flight, else the last saved snapshot
    fn baseline(&self) -> &PendingEdit {
        self.latest_sent.as_ref().unwrap_or(&self.snapshot)
    }

    /// State after a save turned out to be unnecessary
    fn settled(&self) -> SaveState {
        if self.latest_sent.is_some() {
            SaveState::Saving
        } else {
            SaveState::Clean
        }
    }

    pub fn edit(&mut self, apply: impl FnOnce(&mut PendingEdit)) {
        apply(&mut self.buffer);
        self.state = SaveState::Dirty;
        self.completing = false;
    }

    /// The debounce delay elapsed
    pub fn timer_fired(&mut self) -> Option<SaveTicket> {
        if self.state != SaveState::Dirty {
            return None;
        }
        if self.is_noop() {
            tracing::debug!("Skipping autosave, buffer unchanged");
            self.state = self.settled();
            return None;
        }
        Some(self.issue())
    }

    /// Save immediately, whatever the state
    pub fn save_now(&mut self) -> Option<SaveTicket> {
        if self.is_noop() {
            if matches!(self.state, SaveState::Dirty | SaveState::Error) {
                self.state = self.settled();
            }
            return None;
        }
        Some(self.issue())
    }

    /// Save immediately and allow leaving without a warning
    pub fn begin_complete(&mut self) -> Option<SaveTicket> {
        self.completing = true;
        self.save_now()
    }

    pub fn save_succeeded(&mut self, seq: u64, record: &DocumentRecord) -> Completion {
        if seq != self.latest_seq {
            tracing::debug!(
                "Ignoring stale save #{} (latest is #{})",
                seq,
                self.latest_seq
            );
            return Completion::Stale;
        }

        if let Some(sent) = self.latest_sent.take() {
            self.snapshot = sent;
        }
        self.saved_version = Some(record.current_version);
        // Any edit since issuing has its own timer pending
        self.state = if self.is_noop() {
            SaveState::Clean
        } else {
            SaveState::Dirty
        };
        Completion::Accepted
    }

    pub fn save_failed(&mut self, seq: u64) -> Completion {
        if seq != self.latest_seq {
            tracing::debug!("Ignoring stale failure of save #{}", seq);
            return Completion::Stale;
        }

        self.latest_sent = None;
        self.completing = false;
        // An edit made during the flight keeps its timer, which retries
        if self.state != SaveState::Dirty {
            self.state = SaveState::Error;
        }
        Completion::Accepted
    }

    /// Whether leaving the editor now would lose work
    pub fn needs_leave_warning(&self) -> bool {
        !self.completing
            && matches!(
                self.state,
                SaveState::Dirty | SaveState::Saving | SaveState::Error
            )
    }

    fn issue(&mut self) -> SaveTicket {
        self.latest_seq += 1;
        self.latest_sent = Some(self.buffer.clone());
        self.state = SaveState::Saving;
        SaveTicket {
            seq: self.latest_seq,
            request: self.buffer.to_update(),
        }
    }
}

/// Autosave driver for one editor view.
///
/// Edits must happen inside a tokio runtime. Dropping the last handle
/// cancels a pending debounce timer.
#[derive(Clone)]
pub struct Autosaver {
    inner: Arc<AutosaverInner>,
}

struct AutosaverInner {
    api: Arc<dyn DocumentApi>,
    document_id: String,
    delay: Duration,
    notices: Notices,
    shared: Mutex<Shared>,
}

struct Shared {
    machine: AutosaveMachine,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

impl Drop for AutosaverInner {
    fn drop(&mut self) {
        if let Some(timer) = self.shared.get_mut().timer.take() {
            timer.abort();
        }
    }
}

impl Autosaver {
    pub fn new(
        api: Arc<dyn DocumentApi>,
        document_id: &str,
        saved: PendingEdit,
        config: &AutosaveConfig,
        notices: Notices,
    ) -> Self {
        Self {
            inner: Arc::new(AutosaverInner {
                api,
                document_id: document_id.to_string(),
                delay: config.delay(),
                notices,
                shared: Mutex::new(Shared {
                    machine: AutosaveMachine::new(saved),
                    timer: None,
                    generation: 0,
                }),
            }),
        }
    }

    pub fn state(&self) -> SaveState {
        self.inner.shared.lock().machine.state()
    }

    pub fn buffer(&self) -> PendingEdit {
        self.inner.shared.lock().machine.buffer().clone()
    }

    pub fn snapshot(&self) -> PendingEdit {
        self.inner.shared.lock().machine.snapshot().clone()
    }

    pub fn needs_leave_warning(&self) -> bool {
        self.inner.shared.lock().machine.needs_leave_warning()
    }

    pub fn set_title(&self, title: &str) {
        self.edit(|buffer| buffer.title = title.to_string());
    }

    pub fn set_content(&self, content: &str) {
        self.edit(|buffer| buffer.content = content.to_string());
    }

    /// Apply an edit and restart the debounce timer
    pub fn edit(&self, apply: impl FnOnce(&mut PendingEdit)) {
        let mut shared = self.inner.shared.lock();
        shared.machine.edit(apply);

        if let Some(timer) = shared.timer.take() {
            timer.abort();
        }
        shared.generation += 1;

        let generation = shared.generation;
        let delay = self.inner.delay;
        let weak = Arc::downgrade(&self.inner);
        shared.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire_timer(weak, generation).await;
        }));
    }

    /// Save now without waiting for the timer (Ctrl+S).
    ///
    /// Returns whether a request was sent.
    pub async fn save_now(&self) -> Result<bool> {
        let ticket = {
            let mut shared = self.inner.shared.lock();
            cancel_timer(&mut shared);
            shared.machine.save_now()
        };
        match ticket {
            Some(ticket) => {
                self.inner.run(ticket, "Failed to save").await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Save now and, on success, allow leaving the editor
    pub async fn complete(&self) -> Result<()> {
        let ticket = {
            let mut shared = self.inner.shared.lock();
            cancel_timer(&mut shared);
            shared.machine.begin_complete()
        };
        if let Some(ticket) = ticket {
            self.inner
                .run(ticket, "Save failed. Please try again.")
                .await?;
        }
        tracing::info!("Editing of {} completed", self.inner.document_id);
        Ok(())
    }
}

fn cancel_timer(shared: &mut Shared) {
    if let Some(timer) = shared.timer.take() {
        timer.abort();
    }
    shared.generation += 1;
}

async fn fire_timer(inner: Weak<AutosaverInner>, generation: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };

    let ticket = {
        let mut shared = inner.shared.lock();
        if shared.generation != generation {
            return;
        }
        // Detach: from here on no edit may abort this task
        shared.timer = None;
        shared.machine.timer_fired()
    };

    if let Some(ticket) = ticket {
        if let Err(e) = inner.run(ticket, "Failed to save").await {
            tracing::debug!("Autosave of {} left unsaved: {}", inner.document_id, e);
        }
    }
}

impl AutosaverInner {
    async fn run(&self, ticket: SaveTicket, failure_notice: &str) -> Result<()> {
        tracing::debug!("Sending save #{} for {}", ticket.seq, self.document_id);
        let result = self
            .api
            .update_document(&self.document_id, &ticket.request)
            .await;

        let mut shared = self.shared.lock();
        match result {
            Ok(record) => {
                if shared.machine.save_succeeded(ticket.seq, &record) == Completion::Accepted {
                    tracing::info!(
                        "Saved {} (version {})",
                        self.document_id,
                        record.current_version
                    );
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Save #{} of {} failed: {}", ticket.seq, self.document_id, e);
                if shared.machine.save_failed(ticket.seq) == Completion::Accepted {
                    self.notices.error(failure_notice);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{record, FakeApi};
    use crate::notices::NoticeKind;
    use tokio::time::{sleep, Instant};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup() -> (Arc<FakeApi>, Autosaver, Notices) {
        let api = Arc::new(FakeApi::with_document(record("doc-1", "Notes", "start", None)));
        let notices = Notices::new();
        let saver = Autosaver::new(
            api.clone(),
            "doc-1",
            PendingEdit::new("Notes", "start"),
            &AutosaveConfig::default(),
            notices.clone(),
        );
        (api, saver, notices)
    }

    fn machine() -> AutosaveMachine {
        AutosaveMachine::new(PendingEdit::new("T", "a"))
    }

    #[test]
    fn test_machine_noop_timer() {
        let mut m = machine();
        m.edit(|b| b.content = "ab".to_string());
        m.edit(|b| b.content = "a".to_string());
        assert_eq!(m.state(), SaveState::Dirty);

        assert!(m.timer_fired().is_none());
        assert_eq!(m.state(), SaveState::Clean);
        assert_eq!(m.latest_seq(), 0);
    }

    #[test]
    fn test_machine_edit_during_save() {
        let mut m = machine();
        m.edit(|b| b.content = "ab".to_string());
        let ticket = m.timer_fired().unwrap();
        assert_eq!(m.state(), SaveState::Saving);

        m.edit(|b| b.content = "abc".to_string());
        assert_eq!(m.state(), SaveState::Dirty);

        let saved = record("d", "T", "ab", None);
        assert_eq!(m.save_succeeded(ticket.seq, &saved), Completion::Accepted);
        assert_eq!(m.snapshot().content, "ab");
        assert_eq!(m.state(), SaveState::Dirty);
    }

    #[test]
    fn test_machine_failure_keeps_edit_made_in_flight() {
        let mut m = machine();
        m.edit(|b| b.content = "ab".to_string());
        let ticket = m.timer_fired().unwrap();
        m.edit(|b| b.content = "abc".to_string());

        assert_eq!(m.save_failed(ticket.seq), Completion::Accepted);
        assert_eq!(m.state(), SaveState::Dirty);

        let retry = m.timer_fired().unwrap();
        assert_eq!(retry.request.content, "abc");
        assert!(retry.seq > ticket.seq);
    }

    #[test]
    fn test_machine_revert_in_flight_is_sent() {
        let mut m = machine();
        m.edit(|b| b.content = "ab".to_string());
        let first = m.timer_fired().unwrap();

        // Back to the saved snapshot, but the server is about to get "ab"
        m.edit(|b| b.content = "a".to_string());
        let second = m.timer_fired().unwrap();
        assert_eq!(second.request.content, "a");

        assert_eq!(m.save_succeeded(first.seq, &record("d", "T", "ab", None)), Completion::Stale);
        assert_eq!(m.save_succeeded(second.seq, &record("d", "T", "a", None)), Completion::Accepted);
        assert_eq!(m.snapshot().content, "a");
        assert_eq!(m.state(), SaveState::Clean);
    }

    #[test]
    fn test_machine_edit_back_to_in_flight_content() {
        let mut m = machine();
        m.edit(|b| b.content = "ab".to_string());
        let ticket = m.timer_fired().unwrap();
        m.edit(|b| b.content = "abc".to_string());
        m.edit(|b| b.content = "ab".to_string());

        assert!(m.timer_fired().is_none());
        assert_eq!(m.state(), SaveState::Saving);
        assert!(m.save_now().is_none());

        m.save_succeeded(ticket.seq, &record("d", "T", "ab", None));
        assert_eq!(m.state(), SaveState::Clean);
    }

    #[test]
    fn test_machine_stale_completions() {
        let mut m = machine();
        m.edit(|b| b.content = "one".to_string());
        let first = m.save_now().unwrap();
        m.edit(|b| b.content = "two".to_string());
        let second = m.save_now().unwrap();
        assert!(second.seq > first.seq);

        assert_eq!(m.save_succeeded(second.seq, &record("d", "T", "two", None)), Completion::Accepted);
        assert_eq!(m.save_succeeded(first.seq, &record("d", "T", "one", None)), Completion::Stale);
        assert_eq!(m.save_failed(first.seq), Completion::Stale);
        assert_eq!(m.snapshot().content, "two");
        assert_eq!(m.state(), SaveState::Clean);
    }

    #[test]
    fn test_machine_leave_warning() {
        let mut m = machine();
        assert!(!m.needs_leave_warning());

        m.edit(|b| b.title = String::new());
        assert!(m.needs_leave_warning());

        let ticket = m.begin_complete().unwrap();
        assert_eq!(ticket.request.title, "Untitled");
        assert!(!m.needs_leave_warning());

        m.save_failed(ticket.seq);
        assert_eq!(m.state(), SaveState::Error);
        assert!(m.needs_leave_warning());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_coalesced_into_one_save() {
        let (api, saver, _) = setup();
        let start = Instant::now();

        for text in ["s", "st", "sta", "star", "start!"] {
            saver.set_content(text);
            sleep(ms(400)).await;
        }
        assert!(api.state.lock().updates.is_empty());

        sleep(ms(3000)).await;
        let updates = api.state.lock().updates.clone();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.content, "start!");
        // Last edit at 1600 ms
        let at = updates[0].0 - start;
        assert!(at >= ms(3600) && at < ms(3700), "saved at {:?}", at);
        assert_eq!(saver.state(), SaveState::Clean);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_typing_saves_once_after_silence() {
        let (api, saver, _) = setup();
        let start = Instant::now();

        for i in 0..50 {
            saver.set_content(&format!("draft {}", i));
            sleep(ms(100)).await;
        }
        sleep(ms(5000)).await;

        let updates = api.state.lock().updates.clone();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.content, "draft 49");
        let at = updates[0].0 - start;
        assert!(at >= ms(6900) && at < ms(7000), "saved at {:?}", at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverted_edit_sends_nothing() {
        let (api, saver, _) = setup();

        saver.set_content("changed");
        saver.set_content("start");
        sleep(ms(2500)).await;

        assert!(api.state.lock().updates.is_empty());
        assert_eq!(saver.state(), SaveState::Clean);
        assert!(!saver.save_now().await.unwrap());
        assert!(api.state.lock().updates.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_older_save_does_not_win() {
        let (api, saver, _) = setup();
        {
            let mut state = api.state.lock();
            state.update_delays.extend([ms(3000), ms(100)]);
        }

        saver.set_content("A");
        sleep(ms(2500)).await;
        // First save is in flight until 5000 ms
        assert_eq!(saver.state(), SaveState::Saving);

        saver.set_content("B");
        assert_eq!(saver.state(), SaveState::Dirty);
        sleep(ms(4000)).await;

        let updates = api.state.lock().updates.clone();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].1.content, "A");
        assert_eq!(updates[1].1.content, "B");
        assert_eq!(saver.snapshot().content, "B");
        assert_eq!(saver.state(), SaveState::Clean);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_then_recovery() {
        let (api, saver, notices) = setup();
        api.state.lock().update_failures.push_back(true);

        saver.set_content("first try");
        sleep(ms(2100)).await;
        assert_eq!(saver.state(), SaveState::Error);
        assert!(saver.needs_leave_warning());
        let drained = notices.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].kind, NoticeKind::Error);

        // No automatic retry
        sleep(ms(5000)).await;
        assert_eq!(api.state.lock().updates.len(), 1);

        saver.set_content("second try");
        sleep(ms(2100)).await;
        assert_eq!(saver.state(), SaveState::Clean);
        assert_eq!(api.state.lock().updates.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_during_failing_save_is_retried() {
        let (api, saver, notices) = setup();
        {
            let mut state = api.state.lock();
            state.update_delays.push_back(ms(1000));
            state.update_failures.push_back(true);
        }

        saver.set_content("A");
        sleep(ms(2100)).await;
        assert_eq!(saver.state(), SaveState::Saving);
        saver.set_content("AB");

        // First save fails at 3000 ms, the second edit's timer fires at 4100 ms
        sleep(ms(1000)).await;
        assert_eq!(saver.state(), SaveState::Dirty);
        assert_eq!(notices.drain().len(), 1);

        sleep(ms(4000)).await;
        let updates = api.state.lock().updates.clone();
        let sent: Vec<&str> = updates.iter().map(|(_, u)| u.content.as_str()).collect();
        assert_eq!(sent, vec!["A", "AB"]);
        assert_eq!(saver.state(), SaveState::Clean);
        assert_eq!(saver.snapshot().content, "AB");
        assert!(!saver.needs_leave_warning());
    }

    #[tokio::test(start_paused = true)]
    async fn test_revert_during_slow_save_is_sent() {
        let (api, saver, _) = setup();
        api.state.lock().update_delays.push_back(ms(4000));

        saver.set_content("A");
        sleep(ms(2100)).await;
        saver.set_content("start");
        sleep(ms(10_000)).await;

        let updates = api.state.lock().updates.clone();
        let sent: Vec<&str> = updates.iter().map(|(_, u)| u.content.as_str()).collect();
        assert_eq!(sent, vec!["A", "start"]);
        assert_eq!(saver.state(), SaveState::Clean);
        assert_eq!(saver.snapshot().content, "start");
        assert_eq!(
            api.state.lock().document.as_ref().map(|d| d.content.clone()),
            Some("start".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_skips_debounce() {
        let (api, saver, _) = setup();
        let start = Instant::now();

        saver.set_title("");
        saver.set_content("final");
        saver.complete().await.unwrap();

        let updates = api.state.lock().updates.clone();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].0 - start < ms(1));
        assert_eq!(updates[0].1.title, "Untitled");
        assert!(!saver.needs_leave_warning());

        // The cancelled timer never fires
        sleep(ms(3000)).await;
        assert_eq!(api.state.lock().updates.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_editor_cancels_timer() {
        let (api, saver, _) = setup();
        saver.set_content("abandoned");
        drop(saver);

        sleep(ms(3000)).await;
        assert!(api.state.lock().updates.is_empty());
    }
}
