//! Processor trait for job execution.

use crate::error::ProcessingError;
use crate::job::Job;
use async_trait::async_trait;

/// Executes jobs of one type.
///
/// Return [`ProcessingError::transient`] for failures worth retrying
/// (a mailer timing out) and [`ProcessingError::permanent`] for the rest.
///
/// ```rust,ignore
/// struct ResetLinkProcessor {
///     service: Arc<ResetPasswordService>,
/// }
///
/// #[async_trait]
/// impl Processor<SendResetLink> for ResetLinkProcessor {
///     async fn process(&self, job: &SendResetLink) -> Result<(), ProcessingError> {
///         self.service
///             .generate_reset_password_token(&job.email)
///             .await
///             .map_err(|e| ProcessingError::transient(e.to_string()))
///     }
///
///     fn name(&self) -> &'static str {
///         "reset_link_processor"
///     }
/// }
/// ```
#[async_trait]
pub trait Processor<J: Job>: Send + Sync {
    async fn process(&self, job: &J) -> Result<(), ProcessingError>;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}
