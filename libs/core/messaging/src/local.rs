//! In-process job queue backed by a bounded tokio channel.
//!
//! ```rust,ignore
//! let (queue, worker) = LocalWorker::spawn(WorkerConfig::new("reset_password"), processor);
//! queue.enqueue(SendResetLink::new(email)).await?;
//! // on shutdown: drains what is already queued, then stops
//! worker.shutdown().await;
//! ```
//!
//! Delivery is at-least-once within the process lifetime. Jobs still queued
//! when the process dies are lost.

use crate::config::WorkerConfig;
use crate::error::QueueError;
use crate::event::ProcessResult;
use crate::job::Job;
use crate::processor::Processor;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Producer side of a [`LocalWorker`]. Cheap to clone.
#[derive(Debug)]
pub struct JobQueue<J> {
    name: Arc<str>,
    tx: mpsc::Sender<J>,
}

impl<J> Clone for JobQueue<J> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<J: Job> JobQueue<J> {
    /// Queue a job, waiting for room when the channel is full.
    pub async fn enqueue(&self, job: J) -> Result<(), QueueError> {
        let job_id = job.job_id();
        self.tx
            .send(job)
            .await
            .map_err(|_| QueueError::Closed(self.name.to_string()))?;
        debug!(queue = %self.name, job_id = %job_id, "Job enqueued");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Handle to the spawned worker task.
pub struct LocalWorker {
    name: String,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LocalWorker {
    /// Spawn the worker loop and return its queue.
    ///
    /// Jobs are processed one at a time in arrival order.
    pub fn spawn<J, P>(config: WorkerConfig, processor: P) -> (JobQueue<J>, Self)
    where
        J: Job,
        P: Processor<J> + 'static,
    {
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let (stop, stop_rx) = watch::channel(false);
        let name = config.name.clone();

        info!(
            worker = %name,
            processor = processor.name(),
            capacity = config.capacity,
            "Starting local worker"
        );

        let task = tokio::spawn(run(config, Arc::new(processor), rx, stop_rx));
        let queue = JobQueue {
            name: Arc::from(name.as_str()),
            tx,
        };

        (queue, Self { name, stop, task })
    }

    /// Stop accepting work, finish jobs already queued, then exit.
    pub async fn shutdown(self) {
        info!(worker = %self.name, "Stopping local worker");
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            error!(worker = %self.name, error = %e, "Worker task failed");
        }
    }
}

async fn run<J, P>(
    config: WorkerConfig,
    processor: Arc<P>,
    mut rx: mpsc::Receiver<J>,
    mut stop: watch::Receiver<bool>,
) where
    J: Job,
    P: Processor<J> + ?Sized,
{
    loop {
        tokio::select! {
            biased;
            job = rx.recv() => match job {
                Some(job) => {
                    process_with_retry(&config, processor.as_ref(), job).await;
                }
                None => break,
            },
            _ = stop.changed() => {
                rx.close();
                while let Some(job) = rx.recv().await {
                    process_with_retry(&config, processor.as_ref(), job).await;
                }
                break;
            }
        }
    }

    info!(worker = %config.name, "Local worker stopped");
}

/// Run one job to completion: success, or dead letter after the retries
/// the job allows.
pub async fn process_with_retry<J, P>(config: &WorkerConfig, processor: &P, job: J) -> ProcessResult
where
    J: Job,
    P: Processor<J> + ?Sized,
{
    let mut job = job;

    loop {
        let started = Instant::now();
        let result = match processor.process(&job).await {
            Ok(()) => ProcessResult::Success {
                duration: started.elapsed(),
            },
            Err(e) if e.is_retryable() && job.can_retry() => ProcessResult::Retry {
                error: e.to_string(),
                delay: config.retry_policy.backoff.delay(job.retry_count()),
            },
            Err(e) => ProcessResult::DeadLetter {
                error: e.to_string(),
            },
        };

        match result {
            ProcessResult::Success { duration } => {
                debug!(
                    worker = %config.name,
                    job_id = %job.job_id(),
                    job_type = job.job_type(),
                    duration_ms = duration.as_millis() as u64,
                    "Job processed"
                );
                return ProcessResult::Success { duration };
            }
            ProcessResult::Retry { ref error, delay } => {
                warn!(
                    worker = %config.name,
                    job_id = %job.job_id(),
                    retry = job.retry_count() + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Job failed, retrying"
                );
                tokio::time::sleep(delay).await;
                job = job.with_retry();
            }
            ProcessResult::DeadLetter { ref error } => {
                error!(
                    worker = %config.name,
                    job_id = %job.job_id(),
                    job_type = job.job_type(),
                    retries = job.retry_count(),
                    error = %error,
                    "Job moved to dead letter"
                );
                return result;
            }
        }
    }
}
