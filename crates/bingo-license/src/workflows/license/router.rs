use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Map, Value};

use super::domain::ApplicationDraft;
use super::service::{LicenseApplicationService, ServiceError, SessionId};
use super::submission::SubmissionCollaborator;
use super::wizard::WizardError;

/// Router builder exposing the wizard sessions and stateless validation over HTTP.
pub fn license_router<C>(service: Arc<LicenseApplicationService<C>>) -> Router
where
    C: SubmissionCollaborator + 'static,
{
    Router::new()
        .route("/api/v1/license/applications", post(open_handler::<C>))
        .route(
            "/api/v1/license/applications/:session_id",
            get(view_handler::<C>).delete(close_handler::<C>),
        )
        .route(
            "/api/v1/license/applications/:session_id/fields",
            patch(fields_handler::<C>),
        )
        .route(
            "/api/v1/license/applications/:session_id/advance",
            post(advance_handler::<C>),
        )
        .route(
            "/api/v1/license/applications/:session_id/retreat",
            post(retreat_handler::<C>),
        )
        .route(
            "/api/v1/license/applications/:session_id/reset",
            post(reset_handler::<C>),
        )
        .route(
            "/api/v1/license/applications/:session_id/submit",
            post(submit_handler::<C>),
        )
        .route("/api/v1/license/validate", post(validate_handler::<C>))
        .with_state(service)
}

pub(crate) async fn open_handler<C>(
    State(service): State<Arc<LicenseApplicationService<C>>>,
) -> Response
where
    C: SubmissionCollaborator + 'static,
{
    let view = service.open();
    (StatusCode::CREATED, axum::Json(view)).into_response()
}

pub(crate) async fn view_handler<C>(
    State(service): State<Arc<LicenseApplicationService<C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: SubmissionCollaborator + 'static,
{
    match service.view(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn fields_handler<C>(
    State(service): State<Arc<LicenseApplicationService<C>>>,
    Path(session_id): Path<String>,
    axum::Json(updates): axum::Json<Map<String, Value>>,
) -> Response
where
    C: SubmissionCollaborator + 'static,
{
    match service.set_fields(&SessionId(session_id), updates) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn advance_handler<C>(
    State(service): State<Arc<LicenseApplicationService<C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: SubmissionCollaborator + 'static,
{
    match service.advance(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn retreat_handler<C>(
    State(service): State<Arc<LicenseApplicationService<C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: SubmissionCollaborator + 'static,
{
    match service.retreat(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reset_handler<C>(
    State(service): State<Arc<LicenseApplicationService<C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: SubmissionCollaborator + 'static,
{
    match service.reset(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<C>(
    State(service): State<Arc<LicenseApplicationService<C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: SubmissionCollaborator + 'static,
{
    match service.submit(&SessionId(session_id)).await {
        Ok((receipt, session)) => {
            let payload = json!({
                "receipt": receipt,
                "session": session,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn close_handler<C>(
    State(service): State<Arc<LicenseApplicationService<C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: SubmissionCollaborator + 'static,
{
    match service.close(&SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn validate_handler<C>(
    State(service): State<Arc<LicenseApplicationService<C>>>,
    axum::Json(draft): axum::Json<ApplicationDraft>,
) -> Response
where
    C: SubmissionCollaborator + 'static,
{
    match service.validate(&draft) {
        Ok(application) => {
            let payload = json!({
                "valid": true,
                "application": application,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(errors) => {
            let payload = json!({
                "valid": false,
                "errors": errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    }
}

fn error_response(error: ServiceError) -> Response {
    let status = match &error {
        ServiceError::SessionNotFound => StatusCode::NOT_FOUND,
        ServiceError::Invalid { .. } | ServiceError::Wizard(WizardError::UnknownField(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ServiceError::Wizard(
            WizardError::SubmissionInFlight
            | WizardError::AlreadySubmitted
            | WizardError::StaleSubmission { .. },
        ) => StatusCode::CONFLICT,
        ServiceError::Wizard(WizardError::Submission(_)) => StatusCode::BAD_GATEWAY,
        ServiceError::Wizard(WizardError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
    };

    let payload = match error {
        ServiceError::Invalid { errors, session } => json!({
            "error": "validation failed",
            "fields": errors,
            "session": session,
        }),
        ServiceError::Wizard(WizardError::StaleSubmission {
            receipt: Some(receipt),
        }) => json!({
            "error": "submission is no longer pending",
            "receipt": receipt,
        }),
        other => json!({
            "error": other.to_string(),
        }),
    };
    (status, axum::Json(payload)).into_response()
}
