//! Test-case generation workflow
//!
//! Sends a submission to the webhook, waits for it with progress, and saves
//! any records the webhook sent back.

use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::models::Record;
use crate::records::{self, Dedupe};
use crate::settings::Settings;
use crate::store::{CaseStore, SaveResult, StoreError};
use crate::webhook::{
    PendingSubmission, SubmissionRequest, WebhookError, WebhookResponse, WebhookTransport,
};

/// How to wait for the webhook and how to save its answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub dedupe: Dedupe,
}

impl Default for SubmissionOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SubmissionOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            timeout: settings.timeout(),
            poll_interval: settings.poll_interval(),
            dedupe: settings.dedupe_mode(),
        }
    }
}

/// Result of a successful webhook call
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub response: WebhookResponse,
    /// `None` when the response was not JSON and nothing was saved.
    /// A save failure does not undo the webhook success.
    pub saved: Option<Result<SaveResult, StoreError>>,
    /// Records from the response, carrying the identifiers assigned on save.
    /// Records that could not be saved are listed as received.
    pub records: Vec<Record>,
}

impl SubmissionOutcome {
    pub fn save_error(&self) -> Option<&StoreError> {
        match &self.saved {
            Some(Err(e)) => Some(e),
            _ => None,
        }
    }
}

/// Submits `request` and saves the records in the response.
///
/// Webhook failures (HTTP error, network, timeout, empty body) are returned
/// as errors and leave the store untouched.
pub fn submit_and_save<F>(
    store: &dyn CaseStore,
    transport: Arc<dyn WebhookTransport>,
    request: SubmissionRequest,
    options: &SubmissionOptions,
    on_progress: F,
) -> Result<SubmissionOutcome, WebhookError>
where
    F: FnMut(u8),
{
    info!(
        "Submitting {} request for module {:?}",
        request.kind.code(),
        request.module
    );

    let pending = PendingSubmission::spawn(transport, request);
    let body = pending.wait(options.timeout, options.poll_interval, on_progress)?;
    let response = WebhookResponse::parse(&body)?;

    let saved: Option<Result<SaveResult, StoreError>> = response.entries().map(|entries| {
        let entries = entries?;
        let result = store.save_entries(entries, options.dedupe)?;
        info!(
            "Saved {} record(s) to {} ({} total, {} dropped, {} pruned)",
            result.saved.len(),
            store.location(),
            result.total,
            result.dropped,
            result.pruned
        );
        Ok(result)
    });

    if let Some(Err(e)) = &saved {
        warn!("Webhook succeeded but saving its response failed: {}", e);
    }

    let records = match (&saved, &response) {
        (Some(Ok(result)), _) => result.assigned.clone(),
        (_, WebhookResponse::Json(value)) => records::normalize(value.clone()),
        (_, WebhookResponse::Text(_)) => Vec::new(),
    };

    Ok(SubmissionOutcome {
        response,
        saved,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::export_csv_file;
    use crate::fields::Field;
    use crate::models::TestCase;
    use crate::report::count_by_field;
    use crate::store::{JsonFileStore, MemoryStore};
    use std::fs;
    use std::thread;
    use tempfile::tempdir;

    struct FixedTransport(&'static str);

    impl WebhookTransport for FixedTransport {
        fn send(&self, _request: &SubmissionRequest) -> Result<String, WebhookError> {
            Ok(self.0.to_string())
        }
    }

    struct DownTransport;

    impl WebhookTransport for DownTransport {
        fn send(&self, _request: &SubmissionRequest) -> Result<String, WebhookError> {
            Err(WebhookError::Network("connection refused".to_string()))
        }
    }

    struct HangingTransport;

    impl WebhookTransport for HangingTransport {
        fn send(&self, _request: &SubmissionRequest) -> Result<String, WebhookError> {
            thread::sleep(Duration::from_secs(2));
            Ok(r#"{"Module":"Late"}"#.to_string())
        }
    }

    fn quick() -> SubmissionOptions {
        SubmissionOptions {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
            dedupe: Dedupe::None,
        }
    }

    #[test]
    fn test_end_to_end_assigns_default_prefix() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = JsonFileStore::new(dir.path().join("Reports").join("test_cases.json"));

        let outcome = submit_and_save(
            &store,
            Arc::new(FixedTransport(
                r#"[{"Module":"Login","Test Case Type":"Positive","Status":"Pass"}]"#,
            )),
            SubmissionRequest::default(),
            &quick(),
            |_| {},
        )?;
        assert!(outcome.response.is_json());
        assert!(outcome.save_error().is_none());

        let records = store.load();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text("Test Case ID").as_deref(), Some("TC_1"));

        let cases: Vec<TestCase> = records.iter().map(TestCase::from_record).collect();
        let statuses = count_by_field(&cases, Field::Status);
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses.get("Pass"), 1);
        Ok(())
    }

    #[test]
    fn test_continues_existing_numbering() -> anyhow::Result<()> {
        let store = MemoryStore::with_records(vec![
            Record::new().with("Test Case ID", "SG_3"),
            Record::new().with("Test Case ID", "SG_1"),
        ]);

        let outcome = submit_and_save(
            &store,
            Arc::new(FixedTransport(r#"{"Module":"Shop"}"#)),
            SubmissionRequest::default(),
            &quick(),
            |_| {},
        )?;

        let saved = outcome.saved.unwrap()?;
        assert_eq!(saved.saved[0].text("Test Case ID").as_deref(), Some("SG_4"));
        assert_eq!(saved.total, 3);
        Ok(())
    }

    #[test]
    fn test_text_response_is_not_saved() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let outcome = submit_and_save(
            &store,
            Arc::new(FixedTransport("Workflow was started")),
            SubmissionRequest::default(),
            &quick(),
            |_| {},
        )?;

        assert!(outcome.saved.is_none());
        assert!(store.try_load()?.is_none());
        Ok(())
    }

    #[test]
    fn test_webhook_failure_persists_nothing() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let result = submit_and_save(
            &store,
            Arc::new(DownTransport),
            SubmissionRequest::default(),
            &quick(),
            |_| {},
        );

        assert!(matches!(result, Err(WebhookError::Network(_))));
        assert!(store.try_load()?.is_none());
        Ok(())
    }

    #[test]
    fn test_timeout_persists_nothing() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let options = SubmissionOptions {
            timeout: Duration::from_millis(100),
            ..quick()
        };
        let result = submit_and_save(
            &store,
            Arc::new(HangingTransport),
            SubmissionRequest::default(),
            &options,
            |_| {},
        );

        assert!(matches!(result, Err(WebhookError::TimedOut(_))));
        assert!(store.try_load()?.is_none());
        Ok(())
    }

    #[test]
    fn test_save_failure_reported_separately() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let blocker = dir.path().join("Reports");
        fs::write(&blocker, "not a directory")?;
        let store = JsonFileStore::new(blocker.join("test_cases.json"));

        let outcome = submit_and_save(
            &store,
            Arc::new(FixedTransport(r#"{"Module":"Login"}"#)),
            SubmissionRequest::default(),
            &quick(),
            |_| {},
        )?;

        assert!(outcome.response.is_json());
        assert!(outcome.save_error().is_some());
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.records[0].get("Test Case ID").is_none());
        Ok(())
    }

    #[test]
    fn test_dedupe_drops_repeated_ticket() -> anyhow::Result<()> {
        let store = MemoryStore::with_records(vec![Record::new()
            .with("Test Case ID", "TC_1")
            .with("Ticket ID", "GAME-1")]);
        let options = SubmissionOptions {
            dedupe: Dedupe::ByKey,
            ..quick()
        };

        let outcome = submit_and_save(
            &store,
            Arc::new(FixedTransport(
                r#"[{"Ticket ID":"GAME-1"},{"Ticket ID":"GAME-2"}]"#,
            )),
            SubmissionRequest::default(),
            &options,
            |_| {},
        )?;

        let saved = outcome.saved.unwrap()?;
        assert_eq!(saved.saved.len(), 1);
        assert_eq!(saved.dropped, 1);
        assert_eq!(saved.total, 2);
        assert_eq!(outcome.records.len(), 2);
        Ok(())
    }

    #[test]
    fn test_response_export_carries_assigned_ids() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = MemoryStore::new();

        let outcome = submit_and_save(
            &store,
            Arc::new(FixedTransport(
                r#"[{"Module":"Login","Status":"Pass"},"done",{"Module":"Shop"}]"#,
            )),
            SubmissionRequest::default(),
            &quick(),
            |_| {},
        )?;

        let path = dir.path().join("generated.csv");
        export_csv_file(&outcome.records, &path)?;

        let content = fs::read_to_string(&path)?;
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("Module,Status,Test Case ID"));
        assert_eq!(lines.next(), Some("Login,Pass,TC_1"));
        assert_eq!(lines.next(), Some("Shop,,TC_2"));
        assert_eq!(lines.next(), None);

        // the raw entry is stored but not exported
        assert_eq!(store.load_entries().len(), 3);
        Ok(())
    }
}
