use anyhow::Context;

use ridership_infra::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ridership_observability::init();

    let config = Config::from_env().context("invalid configuration")?;
    let listen_addr = config.listen_addr;

    let app = ridership_api::app::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
