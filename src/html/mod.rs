//! HTML processing module
//!
//! Provides the rendered-document side of the client:
//! - Text-run extraction from rendered HTML
//! - Marker compositing from overlay spans
//! - HTML sanitization
//!
//! Uses lol_html for efficient streaming HTML processing.

mod highlight_injector;
mod rendered;

pub use highlight_injector::{composite, sanitize_html, HighlightConfig, InjectError};
pub use rendered::{RenderedText, TextPosition, TextRun, TextSelection};
