//! Server API
//!
//! Wire types and the [`DocumentApi`] seam. Paths are relative to
//! `{base_url}{root_path}/api/v1`.

mod client;
mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{DocumentApi, HttpApi};
pub use types::{Annotation, DocumentRecord, DocumentUpdate, NewAnnotation};
