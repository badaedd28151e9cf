use std::net::SocketAddr;
use std::time::Duration;

use testify_backend::{
    build_router,
    config::{get_config, init_config, LogFormat},
    database::pool::{create_pool, run_migrations},
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_format);

    let pool = create_pool().await?;
    run_migrations(&pool).await?;

    let app_state = AppState::new(pool, config);
    app_state.auth_service.ensure_admin(config).await?;

    {
        let sessions = app_state.session_service.clone();
        let every = Duration::from_secs(config.session_sweep_seconds.max(1));
        tokio::spawn(async move {
            loop {
                if let Err(e) = sessions.sweep_expired().await {
                    tracing::error!(error = ?e, "Session deadline sweeper error");
                }
                tokio::time::sleep(every).await;
            }
        });
    }

    let app = build_router(app_state, config.api_rps);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
