//! Notebook Client Library
//!
//! Client-side engine of the notebook platform. The binary in main.rs is a
//! thin CLI over it.
//!
//! # Modules
//!
//! - `anchor`: anchor resolution and selection capture
//! - `highlights`: marker overlay over the rendered text
//! - `html`: text runs, marker compositing, sanitization
//! - `annotations`: comment panel load and create pipeline
//! - `editor`: pending edits and debounced autosave
//! - `session`: per-document view state

pub mod anchor;
pub mod annotations;
pub mod api;
pub mod config;
pub mod editor;
pub mod error;
pub mod highlights;
pub mod html;
pub mod notices;
pub mod preferences;
pub mod session;

pub use error::{ClientError, Result};
