//! Job trait for background processing.

use serde::{de::DeserializeOwned, Serialize};

/// A unit of background work.
///
/// Jobs are plain serializable values so the same type can travel through an
/// in-process channel today and a durable queue later.
///
/// ```rust
/// use messaging::Job;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct SendResetLink {
///     email: String,
///     retry_count: u32,
/// }
///
/// impl Job for SendResetLink {
///     fn job_id(&self) -> String {
///         self.email.clone()
///     }
///
///     fn retry_count(&self) -> u32 {
///         self.retry_count
///     }
///
///     fn with_retry(&self) -> Self {
///         Self {
///             retry_count: self.retry_count + 1,
///             ..self.clone()
///         }
///     }
/// }
/// ```
pub trait Job: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Stable identifier, used in logs.
    fn job_id(&self) -> String;

    /// Attempts already made; 0 for a fresh job.
    fn retry_count(&self) -> u32;

    /// Copy of the job with the retry count incremented.
    fn with_retry(&self) -> Self;

    fn max_retries(&self) -> u32 {
        3
    }

    fn can_retry(&self) -> bool {
        self.retry_count() < self.max_retries()
    }

    /// Name used in logs. Defaults to the type name.
    fn job_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
