//! Agora API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use agora_api::config::Settings;
use agora_api::error::AppError;
use agora_api::state::AppState;
use agora_core::clock::SystemClock;
use agora_core::publisher::EventPublisher;
use agora_social::application::bootstrap::SocialServices;
use agora_social::domain::store::SocialStore;
use agora_social::infrastructure::in_memory::InMemorySocialStore;
use agora_store::blob_storage::LocalBlobStorage;
use agora_store::pg_store::PgSocialStore;
use agora_store::publisher::{RedisEventPublisher, TracingEventPublisher};
use agora_store::schema::ensure_schema;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

async fn open_store(settings: &Settings) -> Result<(Arc<dyn SocialStore>, &'static str), AppError> {
    match &settings.database_url {
        Some(url) => {
            let store = PgSocialStore::connect(url, settings.database_max_connections).await?;
            ensure_schema(store.pool()).await?;
            Ok((Arc::new(store), "postgres"))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping posts in memory");
            Ok((Arc::new(InMemorySocialStore::new()), "memory"))
        }
    }
}

async fn open_publisher(settings: &Settings) -> Result<Arc<dyn EventPublisher>, AppError> {
    match &settings.redis_url {
        Some(url) => Ok(Arc::new(RedisEventPublisher::connect(url).await?)),
        None => {
            tracing::info!("REDIS_URL not set, events are only logged");
            Ok(Arc::new(TracingEventPublisher))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Agora API server");

    let settings = Settings::from_env()?;

    let (store, backend) = open_store(&settings).await?;
    let services = SocialServices {
        store,
        publisher: open_publisher(&settings).await?,
        blob_storage: Arc::new(LocalBlobStorage::new(
            settings.blob_root.clone(),
            &settings.blob_public_url,
        )),
        clock: Arc::new(SystemClock),
    };
    let app_state = AppState::new(services, backend)?;

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = agora_api::app(app_state).layer(CorsLayer::permissive());

    let addr: SocketAddr = settings
        .bind_address()
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!(%addr, store = backend, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
