use crate::cli::ServeArgs;
use crate::infra::{build_engine, AppState};
use crate::routes::preflight_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use contract_preflight::config::AppConfig;
use contract_preflight::error::AppError;
use contract_preflight::telemetry;
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
    let engine = build_engine(&config.preflight);
    info!(
        rules_version = %engine.rules().version,
        calibration_version = %engine.scorer().calibration().version(),
        resolver = engine.has_resolver(),
        "preflight engine configured"
    );
    let app_state = AppState::new(engine, prometheus_handle);

    let app = preflight_router()
        .layer(Extension(app_state.clone()))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    app_state.mark_ready();

    info!(?config.environment, %addr, "contract preflight service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
