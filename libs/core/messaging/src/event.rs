//! Outcome of a single processing attempt.

use std::time::Duration;

/// What the worker did with a job after one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    Success { duration: Duration },

    /// Failed transiently; the job is retried after `delay`.
    Retry { error: String, delay: Duration },

    /// Failed permanently or ran out of retries.
    DeadLetter { error: String },
}

impl ProcessResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
