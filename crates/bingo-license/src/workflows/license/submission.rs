use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::LicenseApplication;

/// Outbound hook that accepts a validated application (county clerk inbox, e-mail, API).
///
/// Timeouts and retries are the implementor's concern; the wizard awaits a single outcome.
#[async_trait]
pub trait SubmissionCollaborator: Send + Sync {
    async fn submit_record(
        &self,
        application: LicenseApplication,
    ) -> Result<SubmissionReceipt, SubmissionError>;
}

/// Acknowledgement returned by the collaborator for an accepted application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub reference: String,
    pub received_at: DateTime<Utc>,
}

/// Failure reported by the collaborator. The draft is kept so the caller can retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("submission rejected: {0}")]
    Rejected(String),
    #[error("submission collaborator unavailable: {0}")]
    Unavailable(String),
}
