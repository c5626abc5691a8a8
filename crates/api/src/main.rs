use anyhow::Context;

use kitchenflow_api::{ApiConfig, app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kitchenflow_observability::init();

    let config = ApiConfig::from_env()?;
    let services = app::services::AppServices::from_config(&config).await?;
    let router = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router).await?;
    Ok(())
}
