//! Document editor
//!
//! - `buffer`: the pending (title, content) pair and status bar counters
//! - `autosave`: debounced, sequence-checked persistence

mod autosave;
mod buffer;

pub use autosave::{AutosaveMachine, Autosaver, Completion, SaveState, SaveTicket};
pub use buffer::{CursorPosition, EditorStats, PendingEdit, UNTITLED};
