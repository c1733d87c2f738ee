use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::workflows::license::{
    ApplicationDraft, ApplicationSchema, Calendar, FieldErrors, FieldName, LicenseApplication,
    LicenseApplicationService, SubmissionCollaborator, SubmissionError, SubmissionReceipt,
    WizardController,
};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 1).expect("valid date")
}

pub(super) fn calendar() -> Calendar {
    Calendar::Fixed(today())
}

pub(super) fn schema() -> ApplicationSchema {
    ApplicationSchema::standard()
}

pub(super) fn applicant_values() -> Value {
    json!({
        "applicantName": "Margaret Hollis",
        "entityType": "Organization",
        "organizationName": "St. Andrew's Parish Guild",
        "email": "m.hollis@standrews-guild.org",
        "phone": "717-555-0134",
        "addressStreet": "118 Lincoln Way East",
        "city": "Chambersburg",
        "state": "PA",
        "zip": "17201",
        "municipality": "Chambersburg",
    })
}

pub(super) fn license_terms_values() -> Value {
    json!({
        "licenseType": "Charitable Bingo",
        "sessionsPerYear": "52",
        "startDate": "2026-05-02",
        "expirationDate": "2026-06-01",
        "isNonProfit": true,
        "ein": "23-1234567",
        "agreeToRules": true,
    })
}

/// Every field valid as of [`today`]: start tomorrow, thirty-day term, rules accepted.
pub(super) fn valid_draft() -> ApplicationDraft {
    let mut draft = ApplicationDraft::from_json(applicant_values());
    for (field, value) in ApplicationDraft::from_json(license_terms_values()).iter() {
        draft.set(field, value.clone());
    }
    draft
}

pub(super) fn wizard() -> WizardController {
    WizardController::new(Arc::new(schema())).with_calendar(calendar())
}

/// Wizard with every field already entered, still on the first step.
pub(super) fn filled_wizard() -> WizardController {
    let mut wizard = wizard();
    for (field, value) in valid_draft().iter() {
        wizard
            .set_field(field.as_str(), value.clone())
            .expect("known field");
    }
    wizard
}

pub(super) fn receipt(reference: &str) -> SubmissionReceipt {
    SubmissionReceipt {
        reference: reference.to_string(),
        received_at: Utc
            .with_ymd_and_hms(2026, 5, 1, 14, 30, 0)
            .single()
            .expect("valid timestamp"),
    }
}

#[derive(Default)]
pub(super) struct MemoryCollaborator {
    records: Mutex<Vec<LicenseApplication>>,
}

impl MemoryCollaborator {
    pub(super) fn records(&self) -> Vec<LicenseApplication> {
        self.records.lock().expect("records mutex poisoned").clone()
    }
}

#[async_trait]
impl SubmissionCollaborator for MemoryCollaborator {
    async fn submit_record(
        &self,
        application: LicenseApplication,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let mut records = self.records.lock().expect("records mutex poisoned");
        records.push(application);
        Ok(receipt(&format!("FCB-TEST-{:04}", records.len())))
    }
}

pub(super) struct RejectingCollaborator;

#[async_trait]
impl SubmissionCollaborator for RejectingCollaborator {
    async fn submit_record(
        &self,
        _application: LicenseApplication,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        Err(SubmissionError::Unavailable("clerk inbox offline".to_string()))
    }
}

/// Holds every submission until the test releases it.
#[derive(Default)]
pub(super) struct GatedCollaborator {
    pub(super) dispatched: Notify,
    pub(super) release: Notify,
}

#[async_trait]
impl SubmissionCollaborator for GatedCollaborator {
    async fn submit_record(
        &self,
        _application: LicenseApplication,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        self.dispatched.notify_one();
        self.release.notified().await;
        Ok(receipt("FCB-GATED-0001"))
    }
}

pub(super) fn build_service() -> (
    Arc<LicenseApplicationService<MemoryCollaborator>>,
    Arc<MemoryCollaborator>,
) {
    let collaborator = Arc::new(MemoryCollaborator::default());
    let service =
        LicenseApplicationService::new(collaborator.clone()).with_calendar(calendar());
    (Arc::new(service), collaborator)
}

pub(super) fn expect_message(errors: &FieldErrors, field: FieldName) -> &str {
    errors
        .get(field)
        .unwrap_or_else(|| panic!("expected a message for {field}, got {errors}"))
}

pub(super) fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serializable body")))
        .expect("request builds")
}

pub(super) fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
