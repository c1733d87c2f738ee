use crate::cli::ServeArgs;
use crate::infra::{AppState, LoggingSubmissionCollaborator};
use crate::routes::with_license_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use bingo_license::config::AppConfig;
use bingo_license::error::AppError;
use bingo_license::telemetry;
use bingo_license::workflows::license::LicenseApplicationService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let collaborator = Arc::new(LoggingSubmissionCollaborator::new(
        config.submission.latency(),
    ));
    let license_service = Arc::new(LicenseApplicationService::new(collaborator));

    let app = with_license_routes(license_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        submission_latency_ms = config.submission.latency_ms,
        "bingo license intake ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
