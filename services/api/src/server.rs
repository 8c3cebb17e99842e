use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use proposal_flow::config::AppConfig;
use proposal_flow::error::AppError;
use proposal_flow::telemetry;
use proposal_flow::workflows::proposals::{
    InMemoryProposalRepository, NullPaymentGateway, ProposalService, SummaryDocumentAssembler,
};
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{notification_settings, AppState, ConsoleNotifier};
use crate::routes::with_proposal_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    if config.collaborators.payment_secret_key.is_none() {
        info!("STRIPE_SECRET_KEY not set; checkout sessions will be refused");
    }

    let repository = Arc::new(InMemoryProposalRepository::default());
    let assembler = Arc::new(SummaryDocumentAssembler);
    let gateway = Arc::new(NullPaymentGateway);
    let notifier = Arc::new(ConsoleNotifier::from_config(&config.collaborators));
    let proposal_service = Arc::new(ProposalService::new(
        repository,
        assembler,
        gateway,
        notifier,
        notification_settings(&config.collaborators),
    ));

    let app = with_proposal_routes(proposal_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "proposal service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
