use cities_service::api_client::OpenMeteoClient;
use cities_service::auth::JwtVerifier;
use cities_service::cache::TemperatureCache;
use cities_service::config::Config;
use cities_service::search::SearchIndex;
use cities_service::store::{CityStore, MemoryCityStore, PgCityStore};
use cities_service::{create_router, handlers};
use common::errors::AppError;
use common::tracing::init_tracing_for;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    init_tracing_for(&config.log_format);

    let cancellation_token = CancellationToken::new();

    let store = open_store(&config).await?;
    let forecast_client = Arc::new(OpenMeteoClient::new(
        config.open_meteo_url.clone(),
        config.forecast_timeout(),
    )?);
    let cache = TemperatureCache::with_fetch_limit(
        forecast_client,
        Duration::from_secs(config.cache_ttl_seconds),
        config.max_concurrent_fetches,
    );
    let eviction = config
        .eviction_interval()
        .map(|interval| cache.spawn_eviction(interval, cancellation_token.clone()));

    let search = Arc::new(SearchIndex::new(
        store,
        cache.clone(),
        cancellation_token.clone(),
    ));

    let state = handlers::AppState {
        search,
        cache,
        verifier: Arc::new(JwtVerifier::new(&config.jwt_secret)),
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Cities service starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancellation_token))
        .await?;

    if let Some(handle) = eviction
        && let Err(e) = handle.await
    {
        error!(error = %e, "Cache eviction task failed");
    }

    info!("Cities service stopped");
    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<dyn CityStore>, AppError> {
    if let Some(url) = &config.database_url {
        info!("Using Postgres city store");
        return Ok(Arc::new(PgCityStore::connect(url).await?));
    }

    if let Some(path) = &config.cities_file {
        return Ok(Arc::new(MemoryCityStore::from_json_file(path).await?));
    }

    warn!("Neither DATABASE_URL nor CITIES_FILE set, serving an empty city directory");
    Ok(Arc::new(MemoryCityStore::default()))
}

async fn shutdown_signal(cancellation_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }

    // Cancel in-flight lookups and the eviction sweeper
    cancellation_token.cancel();
    warn!("Cancelled in-flight lookups, shutting down gracefully...");
}
