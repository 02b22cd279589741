//! Text anchoring
//!
//! Relocates comment anchors inside the rendered text and captures the
//! selection a new comment will be anchored to.

mod capture;
mod resolver;

pub use capture::{Capture, SelectionCapture};
pub use resolver::{utf16_len, utf16_prefix, AnchorMatch, AnchorResolver, Resolution};
