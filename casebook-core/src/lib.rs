pub mod charts;
pub mod export;
pub mod fields;
pub mod generate;
pub mod models;
pub mod records;
pub mod report;
pub mod settings;
pub mod store;
pub mod timeline;
pub mod upload;
pub mod webhook;

// Re-export commonly used types
pub use charts::{build_charts, Chart, ChartKind};
pub use export::{export_csv, export_csv_file};
pub use fields::{Field, UNKNOWN};
pub use generate::{submit_and_save, SubmissionOptions, SubmissionOutcome};
pub use models::{Record, Status, StoredEntry, TestCase};
pub use records::{
    append, assign_entry_ids, assign_ids, normalize, normalize_entries, stored_id, Dedupe,
    IdScheme,
};
pub use report::{
    count_by_field, dedupe_key, filter, CountEntry, Counts, Report, ReportError, ReportInput,
    ReportOptions, ReportSource, Selection,
};
pub use settings::{get_config_path, Settings};
pub use store::{open_store, CaseStore, JsonFileStore, MemoryStore, SaveResult, StoreError};
pub use timeline::TimelinePoint;
pub use upload::CsvTable;
pub use webhook::{
    PendingSubmission, SubmissionKind, SubmissionRequest, WebhookClient, WebhookError,
    WebhookResponse, WebhookTransport,
};
