use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use proposal_flow::workflows::proposals::{
    proposal_router, DocumentAssembler, Notifier, PaymentGateway, ProposalRepository,
    ProposalService,
};
use serde_json::json;

use crate::infra::AppState;

pub(crate) fn with_proposal_routes<R, D, G, N>(
    service: Arc<ProposalService<R, D, G, N>>,
) -> axum::Router
where
    R: ProposalRepository + 'static,
    D: DocumentAssembler + 'static,
    G: PaymentGateway + 'static,
    N: Notifier + 'static,
{
    proposal_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
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
