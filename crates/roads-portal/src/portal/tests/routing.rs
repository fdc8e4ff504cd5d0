use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::portal::router::{application_handler, portal_router};

fn router() -> (Router, Arc<TestPortal>) {
    let (portal, _) = portal();
    let portal = Arc::new(portal);
    (portal_router(portal.clone()), portal)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn submit_route_creates_application_view() {
    let (router, _) = router();

    let response = router
        .oneshot(post_json(
            "/api/v1/applications",
            json!({
                "kind": "utility_excavation_permit",
                "applicant": "Shanice Reid",
                "location": "Half Way Tree Road, St. Andrew"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("submitted"));
    assert_eq!(body["kind_label"], json!("Utility Excavation Permit"));
    assert_eq!(body["fee"], json!(25_000));
    assert_eq!(body["display"]["icon"], json!("file-text"));
    assert!(body["reference_number"]
        .as_str()
        .is_some_and(|reference| reference.starts_with("RP-")));
}

#[tokio::test(start_paused = true)]
async fn malformed_body_is_a_bad_request() {
    let (router, _) = router();
    let request = Request::post("/api/v1/applications")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"kind\":"))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn validation_failures_are_unprocessable() {
    let (router, _) = router();

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/v1/applications",
            json!({
                "kind": "road_closure_permit",
                "applicant": "",
                "location": "Hope Road"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!("applicant name is required"));

    let response = router
        .oneshot(post_json(
            "/api/v1/documents",
            json!({
                "name": "plans.zip",
                "size_bytes": 1024,
                "category": "site_plan"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test(start_paused = true)]
async fn status_route_applies_and_refuses_transitions() {
    let (router, portal) = router();
    let application = portal.submit_application(submission()).expect("submit");
    let uri = format!("/api/v1/applications/{}/status", application.id);

    let response = router
        .clone()
        .oneshot(post_json(&uri, json!({ "status": "pending_payment" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], json!("pending-payment"));

    let response = router
        .clone()
        .oneshot(post_json(&uri, json!({ "status": "submitted" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = router
        .oneshot(post_json(&uri, json!({ "status": "misplaced" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test(start_paused = true)]
async fn unknown_ids_are_not_found() {
    let (router, _) = router();

    let response = router
        .clone()
        .oneshot(get("/api/v1/applications/app-404404"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .oneshot(post_empty("/api/v1/documents/doc-404404/process"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn application_handler_renders_review_progress() {
    let (_, portal) = router();
    let application = portal.submit_application(submission()).expect("submit");
    portal.begin_review(&application.id).expect("review");
    tokio::time::sleep(config().progress.tick * 3).await;

    let response = application_handler::<Arc<CountingRemote>>(
        State(portal.clone()),
        Path(application.id.0.clone()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("under-review"));
    let progress = body["progress"].as_u64().expect("progress reported");
    assert!(progress > 0 && progress < 100);
}

#[tokio::test(start_paused = true)]
async fn document_routes_follow_the_processing_lifecycle() {
    let (router, _) = router();

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/v1/documents",
            json!({
                "name": "insurance.pdf",
                "size_bytes": 90_000,
                "category": "insurance_certificate"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("pending"));
    assert_eq!(body["content_type"], json!("application/pdf"));
    let id = body["id"].as_str().expect("id").to_string();

    let response = router
        .clone()
        .oneshot(post_empty(&format!("/api/v1/documents/{id}/process")))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["progress"], json!(0));

    settle().await;
    let response = router
        .clone()
        .oneshot(get(&format!("/api/v1/documents/{id}")))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("approved"));
    assert_eq!(body["progress"], json!(100));
    assert!(body["ocr_confidence"].is_u64());

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/documents/{id}/status"),
            json!({ "status": "verified" }),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], json!("verified"));
}

#[tokio::test(start_paused = true)]
async fn sync_routes_track_connectivity() {
    let (router, _) = router();

    let response = router
        .clone()
        .oneshot(post_json("/api/v1/sync/connectivity", json!({ "online": false })))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["online"], json!(false));
    assert_eq!(body["status"], json!("pending"));

    let response = router
        .clone()
        .oneshot(post_empty("/api/v1/sync/changes"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["pending_changes"], json!(1));

    let response = router
        .clone()
        .oneshot(post_empty("/api/v1/sync/retry"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = router
        .clone()
        .oneshot(post_json("/api/v1/sync/connectivity", json!({ "online": true })))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], json!("syncing"));

    settle().await;
    let response = router.oneshot(get("/api/v1/sync")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("synced"));
    assert_eq!(body["pending_changes"], json!(0));
    assert!(body["last_sync_time"].is_string());
}

#[tokio::test(start_paused = true)]
async fn status_lookup_route_falls_back_for_unknown_values() {
    let (router, _) = router();

    let response = router
        .clone()
        .oneshot(get("/api/v1/statuses/documents/failed"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["key"], json!("rejected"));

    let response = router
        .clone()
        .oneshot(get("/api/v1/statuses/application/teleported"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["key"], json!("submitted"));

    let response = router
        .oneshot(get("/api/v1/statuses/vehicle/parked"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn list_route_filters_by_status() {
    let (router, portal) = router();
    let first = portal.submit_application(submission()).expect("submit");
    portal.submit_application(submission()).expect("submit");
    portal.reject_application(&first.id).expect("reject");

    let response = router
        .clone()
        .oneshot(get("/api/v1/applications?status=rejected"))
        .await
        .unwrap();
    let body = body_json(response).await;
    let listed = body.as_array().expect("array");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], json!(first.id.0));

    let response = router
        .oneshot(get("/api/v1/applications?status=lost"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
