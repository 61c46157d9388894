//! Background webhook submission
//!
//! The request runs on a worker thread while the caller polls for it and
//! reports progress. At the timeout ceiling the caller stops waiting; the
//! worker is detached and its eventual result discarded.

use log::{debug, info, warn};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::webhook::client::{WebhookError, WebhookTransport};
use crate::webhook::request::SubmissionRequest;

/// Outcome of a single poll
#[derive(Debug)]
pub enum SubmissionStatus {
    /// Still waiting; percent of the timeout elapsed
    Running { percent: u8 },
    /// The worker answered
    Done(Result<String, WebhookError>),
    /// The timeout ceiling was reached
    Abandoned,
}

/// A webhook call in flight
pub struct PendingSubmission {
    result_rx: mpsc::Receiver<Result<String, WebhookError>>,
    thread_handle: Option<JoinHandle<()>>,
    started: Instant,
}

impl PendingSubmission {
    /// Start sending `request` on a worker thread
    pub fn spawn(transport: Arc<dyn WebhookTransport>, request: SubmissionRequest) -> Self {
        let (result_tx, result_rx) = mpsc::channel();

        let thread_handle = thread::spawn(move || {
            debug!("Webhook worker started");
            let result = transport.send(&request);
            if result_tx.send(result).is_err() {
                // Caller gave up waiting
                debug!("Webhook worker finished after the caller stopped waiting");
            }
        });

        Self {
            result_rx,
            thread_handle: Some(thread_handle),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Percentage of `timeout` elapsed so far, capped at 100
    pub fn progress(&self, timeout: Duration) -> u8 {
        if timeout.is_zero() {
            return 100;
        }
        let frac = self.elapsed().as_secs_f64() / timeout.as_secs_f64();
        (frac.min(1.0) * 100.0) as u8
    }

    /// Waits up to `wait_for` for the worker, never past the `timeout`
    /// ceiling measured from spawn.
    pub fn poll(&mut self, timeout: Duration, wait_for: Duration) -> SubmissionStatus {
        let remaining = timeout.saturating_sub(self.elapsed());
        match self.result_rx.recv_timeout(wait_for.min(remaining)) {
            Ok(result) => {
                if let Some(handle) = self.thread_handle.take() {
                    let _ = handle.join();
                }
                SubmissionStatus::Done(result)
            }
            Err(RecvTimeoutError::Timeout) => {
                if self.elapsed() >= timeout {
                    SubmissionStatus::Abandoned
                } else {
                    SubmissionStatus::Running {
                        percent: self.progress(timeout),
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.thread_handle.take();
                SubmissionStatus::Done(Err(WebhookError::WorkerLost))
            }
        }
    }

    /// Blocks until the worker answers or `timeout` elapses.
    ///
    /// `on_progress` is called every `interval` with the percentage of the
    /// timeout used, and with 100 once a response arrives.
    pub fn wait<F>(
        mut self,
        timeout: Duration,
        interval: Duration,
        mut on_progress: F,
    ) -> Result<String, WebhookError>
    where
        F: FnMut(u8),
    {
        on_progress(0);
        loop {
            match self.poll(timeout, interval) {
                SubmissionStatus::Running { percent } => on_progress(percent),
                SubmissionStatus::Done(result) => {
                    if result.is_ok() {
                        on_progress(100);
                    }
                    info!("Webhook call finished after {:?}", self.elapsed());
                    return result;
                }
                SubmissionStatus::Abandoned => {
                    warn!(
                        "Abandoning webhook call after {}s; the request is left running",
                        timeout.as_secs()
                    );
                    // Detach the worker; dropping a JoinHandle does not block
                    self.thread_handle.take();
                    return Err(WebhookError::TimedOut(timeout));
                }
            }
        }
    }
}
