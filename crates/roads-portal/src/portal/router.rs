use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Application, ApplicationId, ApplicationSubmission, Document, DocumentId, DocumentUpload,
};
use super::service::{PortalError, PortalService};
use super::views::{ApplicationView, DocumentView, SyncView};
use crate::status::{ApplicationStatus, DocumentStatus, StatusKind};
use crate::sync::{RemoteSink, SyncError, SyncState};

type SharedPortal<R> = Arc<PortalService<R>>;

impl PortalError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PortalError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PortalError::ApplicationNotFound(_) | PortalError::DocumentNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            PortalError::Conflict(_)
            | PortalError::Transition(_)
            | PortalError::Sync(SyncError::NotInError(_)) => StatusCode::CONFLICT,
            PortalError::Sync(SyncError::Disposed) | PortalError::Disposed => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": self.to_string(),
        });
        (self.status_code(), Json(payload)).into_response()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityRequest {
    pub online: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationFilter {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentFilter {
    pub application_id: Option<String>,
}

/// Router exposing the portal under `/api/v1`.
pub fn portal_router<R: RemoteSink>(service: SharedPortal<R>) -> Router {
    Router::new()
        .route(
            "/api/v1/applications",
            get(list_applications_handler::<R>).post(submit_application_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            post(application_status_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/review",
            post(review_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/reject",
            post(reject_handler::<R>),
        )
        .route(
            "/api/v1/documents",
            get(list_documents_handler::<R>).post(upload_document_handler::<R>),
        )
        .route("/api/v1/documents/:document_id", get(document_handler::<R>))
        .route(
            "/api/v1/documents/:document_id/process",
            post(process_document_handler::<R>),
        )
        .route(
            "/api/v1/documents/:document_id/status",
            post(document_status_handler::<R>),
        )
        .route("/api/v1/sync", get(sync_handler::<R>))
        .route(
            "/api/v1/sync/connectivity",
            post(connectivity_handler::<R>),
        )
        .route("/api/v1/sync/changes", post(record_change_handler::<R>))
        .route("/api/v1/sync/retry", post(retry_sync_handler::<R>))
        .route("/api/v1/statuses/:kind/:value", get(status_display_handler::<R>))
        .with_state(service)
}

fn bad_request(rejection: JsonRejection) -> Response {
    let payload = json!({
        "error": rejection.body_text(),
    });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn unprocessable(message: String) -> Response {
    let payload = json!({
        "error": message,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
}

fn application_response<R: RemoteSink>(
    service: &PortalService<R>,
    status: StatusCode,
    result: Result<Application, PortalError>,
) -> Response {
    match result {
        Ok(application) => {
            let view = ApplicationView::new(&application, service.language());
            (status, Json(view)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

fn document_response<R: RemoteSink>(
    service: &PortalService<R>,
    status: StatusCode,
    result: Result<Document, PortalError>,
) -> Response {
    match result {
        Ok(document) => {
            let view = DocumentView::new(&document, service.language());
            (status, Json(view)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

fn sync_response<R: RemoteSink>(
    service: &PortalService<R>,
    result: Result<SyncState, PortalError>,
) -> Response {
    match result {
        Ok(state) => {
            let view = SyncView::new(&state, service.language());
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn list_applications_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
    Query(filter): Query<ApplicationFilter>,
) -> Response {
    let status = match filter.status.as_deref().map(str::parse::<ApplicationStatus>) {
        None => None,
        Some(Ok(status)) => Some(status),
        Some(Err(error)) => return unprocessable(error.to_string()),
    };
    let views: Vec<ApplicationView> = service
        .list_applications(status)
        .iter()
        .map(|application| ApplicationView::new(application, service.language()))
        .collect();
    (StatusCode::OK, Json(views)).into_response()
}

pub(crate) async fn submit_application_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
    payload: Result<Json<ApplicationSubmission>, JsonRejection>,
) -> Response {
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection),
    };
    let result = service.submit_application(submission);
    application_response(&service, StatusCode::CREATED, result)
}

pub(crate) async fn application_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
    Path(application_id): Path<String>,
) -> Response {
    let result = service.get_application(&ApplicationId(application_id));
    application_response(&service, StatusCode::OK, result)
}

pub(crate) async fn application_status_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
    Path(application_id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection),
    };
    let status = match request.status.parse::<ApplicationStatus>() {
        Ok(status) => status,
        Err(error) => return unprocessable(error.to_string()),
    };
    let result = service.transition_application(&ApplicationId(application_id), status);
    application_response(&service, StatusCode::OK, result)
}

pub(crate) async fn review_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
    Path(application_id): Path<String>,
) -> Response {
    let result = service.begin_review(&ApplicationId(application_id));
    application_response(&service, StatusCode::OK, result)
}

pub(crate) async fn reject_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
    Path(application_id): Path<String>,
) -> Response {
    let result = service.reject_application(&ApplicationId(application_id));
    application_response(&service, StatusCode::OK, result)
}

pub(crate) async fn list_documents_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
    Query(filter): Query<DocumentFilter>,
) -> Response {
    let application = filter.application_id.map(ApplicationId);
    let views: Vec<DocumentView> = service
        .list_documents(application.as_ref())
        .iter()
        .map(|document| DocumentView::new(document, service.language()))
        .collect();
    (StatusCode::OK, Json(views)).into_response()
}

pub(crate) async fn upload_document_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
    payload: Result<Json<DocumentUpload>, JsonRejection>,
) -> Response {
    let Json(upload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection),
    };
    let result = service.upload_document(upload);
    document_response(&service, StatusCode::CREATED, result)
}

pub(crate) async fn document_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
    Path(document_id): Path<String>,
) -> Response {
    let result = service.get_document(&DocumentId(document_id));
    document_response(&service, StatusCode::OK, result)
}

pub(crate) async fn process_document_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
    Path(document_id): Path<String>,
) -> Response {
    let result = service.process_document(&DocumentId(document_id));
    document_response(&service, StatusCode::OK, result)
}

pub(crate) async fn document_status_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
    Path(document_id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection),
    };
    let status = match request.status.parse::<DocumentStatus>() {
        Ok(status) => status,
        Err(error) => return unprocessable(error.to_string()),
    };
    let result = service.transition_document(&DocumentId(document_id), status);
    document_response(&service, StatusCode::OK, result)
}

pub(crate) async fn sync_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
) -> Response {
    let state = service.sync_status();
    sync_response(&service, Ok(state))
}

pub(crate) async fn connectivity_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
    payload: Result<Json<ConnectivityRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection),
    };
    let result = service.set_connectivity(request.online);
    sync_response(&service, result)
}

pub(crate) async fn record_change_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
) -> Response {
    let result = service.record_change();
    sync_response(&service, result)
}

pub(crate) async fn retry_sync_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
) -> Response {
    let result = service.retry_sync();
    sync_response(&service, result)
}

pub(crate) async fn status_display_handler<R: RemoteSink>(
    State(service): State<SharedPortal<R>>,
    Path((kind, value)): Path<(String, String)>,
) -> Response {
    match kind.parse::<StatusKind>() {
        Ok(kind) => {
            let display = service.status_display(kind, &value);
            (StatusCode::OK, Json(display)).into_response()
        }
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
    }
}
