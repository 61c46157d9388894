//! Webhook integration
//!
//! Sends a test-case generation request to the configured webhook and waits
//! for its answer on a background thread.

pub mod client;
pub mod request;
pub mod response;
pub mod submission;

pub use client::{WebhookClient, WebhookError, WebhookTransport, DEFAULT_TIMEOUT};
pub use request::{SubmissionKind, SubmissionRequest};
pub use response::WebhookResponse;
pub use submission::{PendingSubmission, SubmissionStatus};
