//! Request and response shapes of the document API
//!
//! Fields the client does not use (replies, resolution flags, workspace
//! metadata) are ignored on decode.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A stored comment on a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub content: String,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Text selected when the comment was made; `None` for document-level comments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_text: Option<String>,
}

/// Body of a create-annotation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnnotation {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_text: Option<String>,
}

/// Server view of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    /// Source text
    pub content: String,
    /// Rendered HTML, derived by the server
    #[serde(default)]
    pub content_html: Option<String>,
    pub current_version: i64,
    #[serde(deserialize_with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_favorited: bool,
}

/// Body of a document save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpdate {
    pub title: String,
    pub content: String,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// `detail` is usually a string; validation errors carry a list
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Accept RFC 3339 timestamps as well as offset-less ones, read as UTC
fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_ignores_unknown_fields() {
        let json = r#"{
            "id": "c-1",
            "document_id": "d-1",
            "author_name": "Mina",
            "content": "hello",
            "anchor_text": "alpha",
            "is_resolved": false,
            "created_at": "2024-03-01T09:30:00.250000",
            "replies": []
        }"#;
        let annotation: Annotation = serde_json::from_str(json).unwrap();

        assert_eq!(annotation.anchor_text.as_deref(), Some("alpha"));
        assert_eq!(
            annotation.created_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
                + chrono::Duration::milliseconds(250)
        );
    }

    #[test]
    fn test_offset_timestamps() {
        let json = r#"{"id":"c-2","content":"x","created_at":"2024-03-01T10:30:00+01:00"}"#;
        let annotation: Annotation = serde_json::from_str(json).unwrap();
        assert_eq!(annotation.created_at, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
        assert!(annotation.author_name.is_none());
        assert!(annotation.anchor_text.is_none());
    }

    #[test]
    fn test_unanchored_request_omits_anchor() {
        let body = NewAnnotation {
            content: "general remark".to_string(),
            anchor_text: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"content": "general remark"})
        );
    }

    #[test]
    fn test_error_detail_message() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail":"Document not found"}"#).unwrap();
        assert_eq!(body.message(), "Document not found");

        let body: ErrorBody = serde_json::from_str(r#"{"detail":[{"loc":["body"]}]}"#).unwrap();
        assert!(body.message().starts_with('['));
    }
}
