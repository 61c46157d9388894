use serde_json::Value;

use crate::models::{Record, StoredEntry};
use crate::records;
use crate::store::StoreError;
use crate::webhook::client::WebhookError;

/// Parsed webhook answer
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookResponse {
    Json(Value),
    /// Body that is not JSON, kept verbatim
    Text(String),
}

impl WebhookResponse {
    /// Parses a response body. An empty body is an error.
    pub fn parse(body: &str) -> Result<Self, WebhookError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(WebhookError::EmptyResponse);
        }

        Ok(match serde_json::from_str(body) {
            Ok(value) => WebhookResponse::Json(value),
            Err(_) => WebhookResponse::Text(body.to_string()),
        })
    }

    /// Entries carried by a JSON response, non-object values included.
    /// `None` for a text response.
    pub fn entries(&self) -> Option<Result<Vec<StoredEntry>, StoreError>> {
        match self {
            WebhookResponse::Json(value) => Some(records::normalize_entries(value.clone())),
            WebhookResponse::Text(_) => None,
        }
    }

    /// Records carried by a JSON response. `None` for a text response.
    pub fn records(&self) -> Option<Result<Vec<Record>, StoreError>> {
        self.entries().map(|entries| {
            entries.map(|entries| entries.into_iter().filter_map(StoredEntry::into_record).collect())
        })
    }

    pub fn is_json(&self) -> bool {
        matches!(self, WebhookResponse::Json(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_array() {
        let response = WebhookResponse::parse(r#" [{"Module":"Login"}] "#).unwrap();
        assert_eq!(response, WebhookResponse::Json(json!([{"Module": "Login"}])));

        let records = response.records().unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text("Module").as_deref(), Some("Login"));
    }

    #[test]
    fn test_entries_keep_non_objects() {
        let response = WebhookResponse::parse(r#"[{"Module":"Login"}, "done"]"#).unwrap();
        let entries = response.entries().unwrap().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1], StoredEntry::Raw(json!("done")));
        assert_eq!(response.records().unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_text() {
        let response = WebhookResponse::parse("Workflow was started").unwrap();
        assert_eq!(
            response,
            WebhookResponse::Text("Workflow was started".to_string())
        );
        assert!(response.records().is_none());
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(
            WebhookResponse::parse("  \n"),
            Err(WebhookError::EmptyResponse)
        ));
    }

    #[test]
    fn test_scalar_json_is_unexpected_shape() {
        let response = WebhookResponse::parse("42").unwrap();
        assert!(matches!(
            response.records(),
            Some(Err(StoreError::UnexpectedShape(_)))
        ));
    }
}
