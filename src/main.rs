use quiz_ai_service::{build_state, config::Config, routes::build_router};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let upload_dir = config.upload_dir.clone();

    let state = build_state(config)?;
    tracing::info!(
        provider = %state.generator.provider().kind(),
        upload_dir = %upload_dir.display(),
        "quiz generation pipeline ready"
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("quiz ai service listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
