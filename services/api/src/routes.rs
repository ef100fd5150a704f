use std::sync::Arc;

use admission_desk::workflows::admission::history::HistoryStore;
use admission_desk::workflows::admission::notification::NotificationPublisher;
use admission_desk::workflows::admission::repository::{AdmissionRepository, TaskQueue};
use admission_desk::workflows::admission::{admission_router, AdmissionService};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;

use crate::infra::AppState;

pub(crate) fn with_admission_routes<R, H, N, Q>(
    service: Arc<AdmissionService<R, H, N, Q>>,
) -> axum::Router
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    admission_router(service.clone())
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/admissions/checklist/catalog",
            axum::routing::get(catalog_endpoint::<R, H, N, Q>).with_state(service),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// The per-tab status catalog, so front-ends render the same identifiers the
/// workflow accepts.
pub(crate) async fn catalog_endpoint<R, H, N, Q>(
    State(service): State<Arc<AdmissionService<R, H, N, Q>>>,
) -> impl IntoResponse
where
    R: AdmissionRepository + 'static,
    H: HistoryStore + 'static,
    N: NotificationPublisher + 'static,
    Q: TaskQueue + 'static,
{
    Json(service.catalog().tabs().to_vec())
}
