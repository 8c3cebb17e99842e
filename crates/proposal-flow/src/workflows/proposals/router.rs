//! HTTP surface for the proposal workflow.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::assemble::DocumentAssembler;
use super::domain::{AccessMetadata, PaymentMethod, ProposalId, ProposalRecord};
use super::gateway::{GatewayError, PaymentGateway};
use super::lifecycle::LifecycleError;
use super::notify::Notifier;
use super::pricing::fmt_currency;
use super::repository::{ProposalRepository, StorageError};
use super::service::{PaymentNotice, ProposalService, ProposalServiceError, SignatureRequest};
use super::tax;

impl IntoResponse for ProposalServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) | Self::Pricing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Lifecycle(LifecycleError::AlreadySigned) => StatusCode::CONFLICT,
            Self::Lifecycle(LifecycleError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            Self::Storage(StorageError::NotFound) => StatusCode::NOT_FOUND,
            Self::Storage(StorageError::Conflict) => StatusCode::CONFLICT,
            Self::Storage(StorageError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Gateway(GatewayError::InvalidAmount) => StatusCode::BAD_REQUEST,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
        };
        let payload = json!({ "error": self.to_string() });
        (status, Json(payload)).into_response()
    }
}

/// Router builder exposing the proposal workflow endpoints.
pub fn proposal_router<R, D, G, N>(service: Arc<ProposalService<R, D, G, N>>) -> Router
where
    R: ProposalRepository + 'static,
    D: DocumentAssembler + 'static,
    G: PaymentGateway + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/proposals",
            post(create_handler::<R, D, G, N>).get(list_handler::<R, D, G, N>),
        )
        .route("/api/v1/proposals/:id", get(view_handler::<R, D, G, N>))
        .route(
            "/api/v1/proposals/:id/document",
            get(document_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/proposals/:id/quote",
            get(quote_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/proposals/:id/events",
            get(events_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/proposals/:id/send",
            post(send_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/proposals/:id/accept",
            post(accept_handler::<R, D, G, N>),
        )
        .route(
            "/api/v1/proposals/:id/payment-confirm",
            post(payment_confirm_handler::<R, D, G, N>),
        )
        .route("/api/v1/checkout", post(checkout_handler::<R, D, G, N>))
        .route("/api/v1/tax-rate", get(tax_rate_handler))
        .with_state(service)
}

fn access_metadata(headers: &HeaderMap) -> AccessMetadata {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    AccessMetadata {
        ip_address,
        user_agent,
    }
}

fn record_summary(record: &ProposalRecord) -> Value {
    json!({
        "id": record.id().0,
        "proposal_number": record.config.proposal_number(),
        "project_name": record.config.project.name,
        "client_company": record.config.client.company,
        "status": record.status.label(),
        "created_at": record.created_at,
        "sent_at": record.sent_at,
        "viewed_at": record.viewed_at,
        "signed_at": record.signed_at,
        "paid_at": record.paid_at,
    })
}

async fn create_handler<R, D, G, N>(
    State(service): State<Arc<ProposalService<R, D, G, N>>>,
    Json(draft): Json<super::domain::ProposalDraft>,
) -> Result<Response, ProposalServiceError>
where
    R: ProposalRepository + 'static,
    D: DocumentAssembler + 'static,
    G: PaymentGateway + 'static,
    N: Notifier + 'static,
{
    let record = service.create(&draft)?;
    let quote = service.quote(record.id())?;
    let payload = json!({
        "id": record.id().0,
        "proposal_number": record.config.proposal_number(),
        "status": record.status.label(),
        "grand_total": fmt_currency(quote.grand_total_cents),
        "quote": quote,
    });
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

async fn list_handler<R, D, G, N>(
    State(service): State<Arc<ProposalService<R, D, G, N>>>,
) -> Result<Response, ProposalServiceError>
where
    R: ProposalRepository + 'static,
    D: DocumentAssembler + 'static,
    G: PaymentGateway + 'static,
    N: Notifier + 'static,
{
    let records = service.list()?;
    let payload: Vec<Value> = records.iter().map(record_summary).collect();
    Ok((StatusCode::OK, Json(json!({ "proposals": payload }))).into_response())
}

/// Counterparty proposal view: returns the full record and quote and
/// advances the lifecycle on first open.
async fn view_handler<R, D, G, N>(
    State(service): State<Arc<ProposalService<R, D, G, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ProposalServiceError>
where
    R: ProposalRepository + 'static,
    D: DocumentAssembler + 'static,
    G: PaymentGateway + 'static,
    N: Notifier + 'static,
{
    let id = ProposalId(id);
    let metadata = access_metadata(&headers);
    let record = service.view(&id, &metadata)?;
    let quote = service.quote(&id)?;
    let signature = service.signature(&id)?;
    let payload = json!({
        "proposal": record_summary(&record),
        "config": record.config,
        "quote": quote,
        "signed": signature.is_some(),
        "signature": signature,
    });
    Ok((StatusCode::OK, Json(payload)).into_response())
}

async fn document_handler<R, D, G, N>(
    State(service): State<Arc<ProposalService<R, D, G, N>>>,
    Path(id): Path<String>,
) -> Result<Response, ProposalServiceError>
where
    R: ProposalRepository + 'static,
    D: DocumentAssembler + 'static,
    G: PaymentGateway + 'static,
    N: Notifier + 'static,
{
    let bytes = service.document(&ProposalId(id))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        bytes,
    )
        .into_response())
}

async fn quote_handler<R, D, G, N>(
    State(service): State<Arc<ProposalService<R, D, G, N>>>,
    Path(id): Path<String>,
) -> Result<Response, ProposalServiceError>
where
    R: ProposalRepository + 'static,
    D: DocumentAssembler + 'static,
    G: PaymentGateway + 'static,
    N: Notifier + 'static,
{
    let quote = service.quote(&ProposalId(id))?;
    Ok((StatusCode::OK, Json(quote)).into_response())
}

async fn events_handler<R, D, G, N>(
    State(service): State<Arc<ProposalService<R, D, G, N>>>,
    Path(id): Path<String>,
) -> Result<Response, ProposalServiceError>
where
    R: ProposalRepository + 'static,
    D: DocumentAssembler + 'static,
    G: PaymentGateway + 'static,
    N: Notifier + 'static,
{
    let events = service.events(&ProposalId(id))?;
    let payload: Vec<Value> = events
        .iter()
        .map(|event| {
            json!({
                "kind": event.kind.label(),
                "detail": event.detail,
                "at": event.at,
            })
        })
        .collect();
    Ok((StatusCode::OK, Json(json!({ "events": payload }))).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SendRequest {
    recipient: Option<String>,
}

async fn send_handler<R, D, G, N>(
    State(service): State<Arc<ProposalService<R, D, G, N>>>,
    Path(id): Path<String>,
    body: Option<Json<SendRequest>>,
) -> Result<Response, ProposalServiceError>
where
    R: ProposalRepository + 'static,
    D: DocumentAssembler + 'static,
    G: PaymentGateway + 'static,
    N: Notifier + 'static,
{
    let recipient = body.and_then(|Json(request)| request.recipient);
    let outcome = service.send(&ProposalId(id), recipient)?;
    let payload = json!({
        "status": outcome.record.status.label(),
        "recipient": outcome.recipient,
        "client_notified": outcome.client_notified,
        "admin_notified": outcome.admin_notified,
    });
    Ok((StatusCode::OK, Json(payload)).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AcceptRequest {
    signature_name: String,
    #[serde(default)]
    signature_date: String,
    selected_option: u8,
}

async fn accept_handler<R, D, G, N>(
    State(service): State<Arc<ProposalService<R, D, G, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<AcceptRequest>,
) -> Result<Response, ProposalServiceError>
where
    R: ProposalRepository + 'static,
    D: DocumentAssembler + 'static,
    G: PaymentGateway + 'static,
    N: Notifier + 'static,
{
    let signature = service.sign(
        &ProposalId(id),
        &SignatureRequest {
            signer_name: request.signature_name,
            signer_date: request.signature_date,
            selected_option: request.selected_option,
            metadata: access_metadata(&headers),
        },
    )?;
    let payload = json!({
        "signer": signature.signer_name,
        "option": signature.selected_option.label(),
        "accepted_at": signature.accepted_at,
    });
    Ok((StatusCode::OK, Json(payload)).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentConfirmRequest {
    option: u8,
    installment: u8,
    method: PaymentMethod,
}

async fn payment_confirm_handler<R, D, G, N>(
    State(service): State<Arc<ProposalService<R, D, G, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<PaymentConfirmRequest>,
) -> Result<Response, ProposalServiceError>
where
    R: ProposalRepository + 'static,
    D: DocumentAssembler + 'static,
    G: PaymentGateway + 'static,
    N: Notifier + 'static,
{
    let payment = service.confirm_payment(
        &ProposalId(id),
        &PaymentNotice {
            option: request.option,
            installment: request.installment,
            method: request.method,
            metadata: access_metadata(&headers),
        },
    )?;
    let payload = json!({
        "installment": payment.option.installment_label(payment.installment),
        "amount": fmt_currency(payment.amount_cents),
        "paid_at": payment.paid_at,
    });
    Ok((StatusCode::OK, Json(payload)).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutBody {
    proposal_id: String,
    option: u8,
    installment: u8,
    method: PaymentMethod,
}

async fn checkout_handler<R, D, G, N>(
    State(service): State<Arc<ProposalService<R, D, G, N>>>,
    Json(request): Json<CheckoutBody>,
) -> Result<Response, ProposalServiceError>
where
    R: ProposalRepository + 'static,
    D: DocumentAssembler + 'static,
    G: PaymentGateway + 'static,
    N: Notifier + 'static,
{
    let session = service.checkout(
        &ProposalId(request.proposal_id),
        request.option,
        request.installment,
        request.method,
    )?;
    let payload = json!({
        "url": session.url,
        "session_id": session.session_id,
    });
    Ok((StatusCode::OK, Json(payload)).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TaxRateQuery {
    state: Option<String>,
}

/// Lookup endpoint the builder UI calls while an operator types an address.
async fn tax_rate_handler(Query(query): Query<TaxRateQuery>) -> Response {
    let rate = query
        .state
        .as_deref()
        .and_then(tax::rate_for_state)
        .unwrap_or(0.0);
    let payload = json!({
        "state": query.state,
        "rate": rate,
    });
    (StatusCode::OK, Json(payload)).into_response()
}
