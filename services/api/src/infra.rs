use async_trait::async_trait;
use bingo_license::error::AppError;
use bingo_license::workflows::license::{
    ApplicationDraft, LicenseApplication, SubmissionCollaborator, SubmissionError,
    SubmissionReceipt,
};
use chrono::{NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-process stand-in for the county clerk inbox: waits out a configured dispatch latency,
/// logs the accepted application and issues sequential `FCB-` references.
pub(crate) struct LoggingSubmissionCollaborator {
    latency: Duration,
    sequence: AtomicU64,
}

impl LoggingSubmissionCollaborator {
    pub(crate) fn new(latency: Duration) -> Self {
        Self {
            latency,
            sequence: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl SubmissionCollaborator for LoggingSubmissionCollaborator {
    async fn submit_record(
        &self,
        application: LicenseApplication,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        let reference = format!("FCB-{id:06}");
        info!(
            %reference,
            applicant = application.display_name(),
            license_type = application.license_type.label(),
            municipality = application.municipality_name(),
            sessions = application.sessions_per_year,
            "license application received"
        );

        Ok(SubmissionReceipt {
            reference,
            received_at: Utc::now(),
        })
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Read a JSON application from disk. Unknown keys are dropped.
pub(crate) fn load_draft(path: &Path) -> Result<ApplicationDraft, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let draft = serde_json::from_str::<ApplicationDraft>(&raw)?;
    Ok(draft)
}
