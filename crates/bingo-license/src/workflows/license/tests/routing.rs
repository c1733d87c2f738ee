use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::license::router::submit_handler;
use crate::workflows::license::{license_router, LicenseApplicationService};

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("route executes");
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return (status, Value::Null);
    }
    (status, read_json_body(response).await)
}

async fn open_session(router: &Router) -> String {
    let (status, body) = call(
        router,
        empty_request(Method::POST, "/api/v1/license/applications"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"]
        .as_str()
        .expect("session id present")
        .to_string()
}

fn session_uri(session: &str, action: &str) -> String {
    if action.is_empty() {
        format!("/api/v1/license/applications/{session}")
    } else {
        format!("/api/v1/license/applications/{session}/{action}")
    }
}

#[tokio::test]
async fn open_route_returns_the_initial_view() {
    let (service, _) = build_service();
    let router = license_router(service);

    let (status, body) = call(
        &router,
        empty_request(Method::POST, "/api/v1/license/applications"),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["current_step"], 0);
    assert_eq!(body["step"], "applicant");
    assert_eq!(body["submitted"], false);
    assert_eq!(body["values"], json!({}));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let (service, _) = build_service();
    let router = license_router(service);

    let (status, body) = call(
        &router,
        empty_request(Method::GET, &session_uri("session-404404", "")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "session not found");
}

#[tokio::test]
async fn patch_rejects_unknown_fields() {
    let (service, _) = build_service();
    let router = license_router(service);
    let session = open_session(&router).await;

    let (status, body) = call(
        &router,
        json_request(
            Method::PATCH,
            &session_uri(&session, "fields"),
            json!({ "favoriteColor": "green" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "unknown field 'favoriteColor'");
}

#[tokio::test]
async fn advance_returns_field_messages_and_the_session() {
    let (service, _) = build_service();
    let router = license_router(service);
    let session = open_session(&router).await;

    call(
        &router,
        json_request(
            Method::PATCH,
            &session_uri(&session, "fields"),
            json!({ "zip": "172" }),
        ),
    )
    .await;
    let (status, body) = call(
        &router,
        empty_request(Method::POST, &session_uri(&session, "advance")),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"]["zip"], "ZIP code must be 5 digits");
    assert_eq!(body["session"]["step"], "applicant");
    assert_eq!(body["session"]["values"]["zip"], "172");
}

#[tokio::test]
async fn full_wizard_flow_submits_once() {
    let (service, collaborator) = build_service();
    let router = license_router(service);
    let session = open_session(&router).await;

    for values in [applicant_values(), license_terms_values()] {
        let (status, _) = call(
            &router,
            json_request(Method::PATCH, &session_uri(&session, "fields"), values),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    for expected in ["license_terms", "review"] {
        let (status, body) = call(
            &router,
            empty_request(Method::POST, &session_uri(&session, "advance")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step"], expected);
    }

    let (status, body) = call(
        &router,
        empty_request(Method::POST, &session_uri(&session, "retreat")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "license_terms");

    let (status, body) = call(
        &router,
        empty_request(Method::POST, &session_uri(&session, "submit")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["receipt"]["reference"], "FCB-TEST-0001");
    assert_eq!(body["session"]["submitted"], true);
    assert_eq!(body["session"]["application"]["sessionsPerYear"], 52);
    assert_eq!(collaborator.records().len(), 1);

    let (status, _) = call(
        &router,
        empty_request(Method::POST, &session_uri(&session, "submit")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        &router,
        empty_request(Method::POST, &session_uri(&session, "reset")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_step"], 0);
    assert_eq!(body["submitted"], false);
}

#[tokio::test]
async fn submit_handler_maps_collaborator_failure_to_bad_gateway() {
    let service = Arc::new(
        LicenseApplicationService::new(Arc::new(RejectingCollaborator)).with_calendar(calendar()),
    );
    let session = service.open().session_id;
    for (field, value) in valid_draft().iter() {
        let mut update = serde_json::Map::new();
        update.insert(field.to_string(), value.clone());
        service.set_fields(&session, update).expect("field accepted");
    }

    let response =
        submit_handler::<RejectingCollaborator>(State(service.clone()), Path(session.0.clone()))
            .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = read_json_body(response).await;
    assert_eq!(
        body["error"],
        "submission collaborator unavailable: clerk inbox offline"
    );

    let view = service.view(&session).expect("session kept");
    assert!(view.wizard.last_failure.is_some());
}

#[tokio::test]
async fn submit_overtaken_by_reset_is_a_conflict_with_the_receipt() {
    let collaborator = Arc::new(GatedCollaborator::default());
    let service = Arc::new(
        LicenseApplicationService::new(collaborator.clone()).with_calendar(calendar()),
    );
    let router = license_router(service.clone());
    let session = service.open().session_id;
    for (field, value) in valid_draft().iter() {
        let mut update = serde_json::Map::new();
        update.insert(field.to_string(), value.clone());
        service.set_fields(&session, update).expect("field accepted");
    }

    let submitting = {
        let router = router.clone();
        let uri = session_uri(&session.0, "submit");
        tokio::spawn(async move { call(&router, empty_request(Method::POST, &uri)).await })
    };
    collaborator.dispatched.notified().await;

    let (status, _) = call(
        &router,
        empty_request(Method::POST, &session_uri(&session.0, "reset")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    collaborator.release.notify_one();
    let (status, body) = submitting.await.expect("task joins");
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "submission is no longer pending");
    assert_eq!(body["receipt"]["reference"], "FCB-GATED-0001");
}

#[tokio::test]
async fn submit_with_invalid_draft_is_unprocessable() {
    let (service, collaborator) = build_service();
    let router = license_router(service);
    let session = open_session(&router).await;

    let (status, body) = call(
        &router,
        empty_request(Method::POST, &session_uri(&session, "submit")),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"]["agreeToRules"], "Agreement is required");
    assert!(collaborator.records().is_empty());
}

#[tokio::test]
async fn validate_route_is_stateless() {
    let (service, _) = build_service();
    let router = license_router(service);

    let mut payload = applicant_values();
    for (field, value) in license_terms_values().as_object().expect("object") {
        payload[field] = value.clone();
    }
    let (status, body) = call(
        &router,
        json_request(Method::POST, "/api/v1/license/validate", payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["application"]["licenseType"], "Charitable Bingo");

    payload["sessionsPerYear"] = json!("400");
    let (status, body) = call(
        &router,
        json_request(Method::POST, "/api/v1/license/validate", payload),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["valid"], false);
    assert_eq!(
        body["errors"]["sessionsPerYear"],
        "Sessions per year cannot exceed 365"
    );
}

#[tokio::test]
async fn delete_closes_the_session() {
    let (service, _) = build_service();
    let router = license_router(service);
    let session = open_session(&router).await;

    let (status, _) = call(
        &router,
        empty_request(Method::DELETE, &session_uri(&session, "")),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(
        &router,
        empty_request(Method::GET, &session_uri(&session, "")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
