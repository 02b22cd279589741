//! Marker compositing using lol_html for streaming HTML processing
//!
//! Overlay spans are rendered onto the sanitized document HTML. Only the
//! text nodes that carry spans are re-encoded; every other byte of the
//! source passes through untouched, so compositing with an empty overlay
//! reproduces the input.

use std::collections::{BTreeSet, HashMap};

use html_escape::{encode_double_quoted_attribute, encode_text};
use lol_html::{element, rewrite_str, RewriteStrSettings};

use super::rendered::rewrite_text_runs;
use crate::highlights::{MarkerKind, OverlaySpan};

/// Configuration for marker output
#[derive(Debug, Clone)]
pub struct HighlightConfig {
    /// Class of persistent comment markers
    pub persistent_class: String,
    /// Class of the hover/preview marker
    pub ephemeral_class: String,
    /// Class of manual highlights
    pub manual_class: String,
    /// Data attribute carrying the annotation ID
    pub id_attribute: String,
    /// Whether the preview marker carries inline styles
    pub include_inline_styles: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            persistent_class: "comment-highlight-permanent".to_string(),
            ephemeral_class: "comment-highlight-temp".to_string(),
            manual_class: "highlight-text".to_string(),
            id_attribute: "data-comment-id".to_string(),
            include_inline_styles: true,
        }
    }
}

/// Render overlay spans onto `html`.
///
/// `html` must be the sanitized HTML the spans were resolved against
/// (see [`super::RenderedText::html`]). Spans that do not fit their run are
/// skipped.
pub fn composite(
    html: &str,
    spans: &[OverlaySpan],
    config: &HighlightConfig,
) -> Result<String, InjectError> {
    if spans.is_empty() {
        return Ok(html.to_string());
    }

    let mut by_run: HashMap<usize, Vec<&OverlaySpan>> = HashMap::new();
    for span in spans {
        by_run.entry(span.run).or_default().push(span);
    }

    rewrite_text_runs(html, |index, _raw, text| {
        by_run
            .get(&index)
            .map(|run_spans| render_run(text, run_spans, config))
    })
}

/// Encode one run with its markers.
///
/// Spans nest in `nesting_key` order. When two spans cross, the inner
/// element is closed at the boundary and reopened after it so the output
/// stays well-formed.
fn render_run(text: &str, spans: &[&OverlaySpan], config: &HighlightConfig) -> String {
    let mut ordered: Vec<&OverlaySpan> = spans
        .iter()
        .copied()
        .filter(|s| {
            let fits = s.start < s.end
                && s.end <= text.len()
                && text.is_char_boundary(s.start)
                && text.is_char_boundary(s.end);
            if !fits {
                tracing::debug!("Skipping span {}..{} on run {}", s.start, s.end, s.run);
            }
            fits
        })
        .collect();
    ordered.sort_by_key(|s| s.nesting_key());

    let mut boundaries: BTreeSet<usize> = BTreeSet::from([0, text.len()]);
    for span in &ordered {
        boundaries.insert(span.start);
        boundaries.insert(span.end);
    }

    let mut out = String::with_capacity(text.len() + ordered.len() * 64);
    let mut stack: Vec<&OverlaySpan> = Vec::new();
    let mut next = 0;
    let mut pos = 0;

    for boundary in boundaries {
        if boundary > pos {
            out.push_str(&encode_text(&text[pos..boundary]));
            pos = boundary;
        }

        if stack.iter().any(|s| s.end == boundary) {
            let mut reopen = Vec::new();
            while let Some(top) = stack.pop() {
                out.push_str(close_tag(top.kind));
                if top.end != boundary {
                    reopen.push(top);
                }
                if !stack.iter().any(|s| s.end == boundary) {
                    break;
                }
            }
            for span in reopen.into_iter().rev() {
                out.push_str(&open_tag(span, config));
                stack.push(span);
            }
        }

        while next < ordered.len() && ordered[next].start == boundary {
            out.push_str(&open_tag(ordered[next], config));
            stack.push(ordered[next]);
            next += 1;
        }
    }

    out
}

fn open_tag(span: &OverlaySpan, config: &HighlightConfig) -> String {
    match span.kind {
        MarkerKind::Persistent => format!(
            "<mark class=\"{}\" {}=\"{}\">",
            config.persistent_class,
            config.id_attribute,
            encode_double_quoted_attribute(span.annotation_id.as_deref().unwrap_or_default())
        ),
        MarkerKind::Ephemeral if config.include_inline_styles => format!(
            "<mark class=\"{}\" style=\"background: rgba(255, 200, 0, 0.5); border-radius: 2px;\">",
            config.ephemeral_class
        ),
        MarkerKind::Ephemeral => format!("<mark class=\"{}\">", config.ephemeral_class),
        MarkerKind::Manual => format!(
            "<span class=\"{}\" style=\"background: {};\">",
            config.manual_class,
            encode_double_quoted_attribute(span.color.as_deref().unwrap_or("#fff59d"))
        ),
    }
}

fn close_tag(kind: MarkerKind) -> &'static str {
    match kind {
        MarkerKind::Persistent | MarkerKind::Ephemeral => "</mark>",
        MarkerKind::Manual => "</span>",
    }
}

/// Errors during HTML processing
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("HTML rewrite failed: {0}")]
    RewriteError(String),
}

/// Sanitize HTML to remove potentially dangerous elements
/// while preserving content structure for display
pub fn sanitize_html(html: &str) -> Result<String, InjectError> {
    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                // Script and style bodies never become text runs
                element!("script", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("style", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("*", |el| {
                    // Any inline event handler
                    let handlers: Vec<String> = el
                        .attributes()
                        .iter()
                        .map(|attr| attr.name())
                        .filter(|name| name.starts_with("on"))
                        .collect();
                    for name in handlers {
                        el.remove_attribute(&name);
                    }

                    for name in ["href", "src"] {
                        if el.get_attribute(name).is_some_and(|url| is_script_url(&url)) {
                            el.remove_attribute(name);
                        }
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| InjectError::RewriteError(e.to_string()))?;

    Ok(result)
}

fn is_script_url(url: &str) -> bool {
    url.trim().to_ascii_lowercase().starts_with("javascript:")
}
