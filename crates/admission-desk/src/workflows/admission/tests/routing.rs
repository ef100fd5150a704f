use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::workflows::admission::PropositionStatus;

fn json_request(method: &str, uri: &str, payload: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn initiate_route_creates_a_proposition() {
    let (service, _, _, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/admissions",
            json!({
                "admission_type": "admission",
                "candidate": {
                    "registration_id": "00412345",
                    "first_name": "Marie",
                    "last_name": "Dupont",
                    "email": "marie.dupont@mail.example",
                },
                "training": {
                    "acronym": "SC3DP",
                    "title": "Doctorate in Sciences",
                    "academic_year": 2025,
                },
                "author": "candidate",
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert!(payload.get("proposition_id").is_some());
    assert_eq!(
        payload.get("status").and_then(serde_json::Value::as_str),
        Some(PropositionStatus::Draft.label()),
    );
}

#[tokio::test]
async fn detail_route_returns_not_found_for_missing_records() {
    let (service, _, _, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/admissions/missing")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn opinion_route_maps_guard_failures_to_conflict() {
    let (service, _, _, _, _) = build_service();
    let id = draft_with_group(&service);
    let router = router_with_service(service);

    // Signing was never requested, so an opinion is premature.
    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/admissions/{}/signatures/opinion", id.0),
            json!({
                "signatory": "p1",
                "decision": "approve",
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn opinion_route_reports_unknown_signatories_as_missing() {
    let (service, _, _, _, _) = build_service();
    let id = draft_with_group(&service);
    service
        .request_signatures(&id, "candidate")
        .expect("signatures requested");
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/admissions/{}/signatures/opinion", id.0),
            json!({
                "signatory": "stranger",
                "decision": "approve",
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn checklist_route_rejects_unknown_identifiers() {
    let (service, _, _, _, _) = build_service();
    let id = confirmed_proposition(&service, &[]);
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/admissions/{}/checklist/status", id.0),
            json!({
                "tab": "cdd_decision",
                "identifier": "NO_SUCH_STATUS",
                "author": "manager",
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn search_route_filters_by_checklist_criteria() {
    let (service, _, _, _, _) = build_service();
    let refused = confirmed_proposition(&service, &[]);
    service
        .cdd_take_charge(&refused, "cdd-manager")
        .expect("taken in charge");
    service
        .cdd_refuse(&refused, &[], "cdd-manager")
        .expect("refused");
    confirmed_proposition(&service, &[]);
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/admissions/search",
            json!({
                "checklist": {
                    "mode": "inclusion",
                    "selections": { "cdd_decision": ["REFUSAL"] },
                },
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("total").and_then(serde_json::Value::as_u64), Some(1));
    let rows = payload
        .get("rows")
        .and_then(serde_json::Value::as_array)
        .expect("rows array");
    assert_eq!(
        rows[0].get("proposition_id").and_then(serde_json::Value::as_str),
        Some(refused.0.as_str()),
    );
}

#[tokio::test]
async fn export_route_streams_csv() {
    let (service, _, _, _, _) = build_service();
    confirmed_proposition(&service, &[]);
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request("POST", "/api/v1/admissions/search/export", json!({})))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/csv; charset=utf-8"),
    );
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let csv = String::from_utf8(body.to_vec()).expect("utf-8 body");
    assert!(csv.starts_with("reference,candidate,training,status"));
    assert!(csv.contains("Marie Dupont"));
}

#[tokio::test]
async fn cdd_decision_route_drives_the_workflow() {
    let (service, repository, _, _, _) = build_service();
    let id = confirmed_proposition(&service, &[]);
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/admissions/{}/cdd/decision", id.0),
            json!({ "author": "cdd-manager", "decision": "take_charge" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/admissions/{}/cdd/decision", id.0),
            json!({
                "author": "cdd-manager",
                "decision": "refuse",
                "reasons": ["Missing funding plan"],
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(status_of(&repository, &id), PropositionStatus::ReturnedFromCdd);
}
