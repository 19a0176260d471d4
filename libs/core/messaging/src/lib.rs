//! Background job abstractions and an in-process worker.
//!
//! - [`Job`]: serializable unit of work with a retry counter
//! - [`Processor`]: executes one job type, classifying failures as
//!   transient or permanent through [`ProcessingError`]
//! - [`LocalWorker`] / [`JobQueue`]: bounded tokio channel drained by a
//!   single task, with [`RetryPolicy`] backoff and dead-letter logging
//!
//! # Example
//!
//! ```ignore
//! use messaging::{Job, LocalWorker, Processor, ProcessingError, WorkerConfig};
//!
//! let (queue, worker) = LocalWorker::spawn(WorkerConfig::new("reset_password"), processor);
//! queue.enqueue(job).await?;
//! worker.shutdown().await;
//! ```

mod config;
mod error;
mod event;
mod job;
mod local;
mod processor;

pub use config::{BackoffStrategy, RetryPolicy, WorkerConfig};
pub use error::{ProcessingError, QueueError};
pub use event::ProcessResult;
pub use job::Job;
pub use local::{process_with_retry, JobQueue, LocalWorker};
pub use processor::Processor;
