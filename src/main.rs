//! OpenSASE Variants - nested product-variant inventory service

use anyhow::Result;
use opensase_variants::catalog::Catalog;
use opensase_variants::config::Settings;
use opensase_variants::domain::ports::{OnHandInventory, VariantRepository};
use opensase_variants::infrastructure::{MemoryStore, NatsPublisher, PgStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let publisher = NatsPublisher::connect(settings.nats_url.as_deref()).await;
    match settings.database_url.as_deref() {
        Some(url) => serve(PgStore::connect(url).await?, publisher, &settings).await,
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            serve(MemoryStore::new(), publisher, &settings).await
        }
    }
}

async fn serve<S>(store: S, publisher: NatsPublisher, settings: &Settings) -> Result<()>
where
    S: VariantRepository + OnHandInventory + 'static,
{
    let app = opensase_variants::api::router(Catalog::new(store, publisher, settings.max_depth));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.port)).await?;
    tracing::info!(max_depth = settings.max_depth.value(), "🚀 OpenSASE Variants listening on 0.0.0.0:{}", settings.port);
    axum::serve(listener, app).await?;
    Ok(())
}
