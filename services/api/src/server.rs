use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::router;
use btcmi::config::AppConfig;
use btcmi::error::AppError;
use std::sync::atomic::Ordering;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs, mut config: AppConfig) -> Result<(), AppError> {
    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    let app_state = AppState::from_config(&config);
    let readiness_flag = app_state.readiness.clone();
    let app = router(app_state);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        default_mode = %config.engine.default_mode,
        "signal service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
