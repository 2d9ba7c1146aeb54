use anyhow::Context;

use storefront_infra::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    storefront_observability::init();

    let settings = Settings::from_env().context("invalid configuration")?;
    let services = storefront_api::app::build_services(&settings)
        .await
        .context("failed to initialise order stores")?;
    let app = storefront_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
