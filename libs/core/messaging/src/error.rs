//! Error types for job processing.

use thiserror::Error;

/// Failure while processing a job.
///
/// The variant decides what the worker does next: transient failures are
/// retried with backoff, permanent ones go straight to the dead-letter log.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("transient error: {message}")]
    Transient {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("permanent error: {message}")]
    Permanent {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProcessingError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            source: None,
        }
    }

    pub fn transient_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transient {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
            source: None,
        }
    }

    pub fn permanent_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Permanent {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether retrying can possibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Failure to hand a job to a worker.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue {0} is closed")]
    Closed(String),
}
