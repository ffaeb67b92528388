use std::net::SocketAddr;

use iter_bene::{
    GateState, build_router,
    config::Config,
    error::Result,
    utils::server::{init_tracing, shutdown_signal},
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = Config::from_env()?;
    config.validate()?;
    tracing::info!(
        api_base_url = %config.api.base_url,
        login_path = %config.server.login_path,
        public_paths = config.server.public_paths.len(),
        "Configuration loaded"
    );

    let server_addr = format!("{}:{}", config.server.host, config.server.port);
    let app = build_router(GateState::new(config));

    let listener = TcpListener::bind(server_addr).await?;
    tracing::info!("Gate listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    tracing::info!("Gate shutdown complete");

    Ok(())
}
