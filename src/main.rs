use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use career_track_backend::{
    build_router,
    config::{init_config, Config},
    database::pool::{create_pool, run_migrations},
    services::count_cache::TtlCountCache,
    AppState, HttpOptions,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &Config) {
    // RUST_LOG wins over LOG_LEVEL when both are set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = init_config()?;
    init_tracing(config);

    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    info!("database migrations applied");

    let count_cache = TtlCountCache::new();
    let app_state = AppState::new(pool, config, Arc::new(count_cache.clone()))?;

    {
        let cache = count_cache.clone();
        let period = config
            .count_cache_ttl()
            .clamp(Duration::from_secs(1), Duration::from_secs(3600));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let purged = cache.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "purged expired count cache entries");
                }
            }
        });
    }

    let app = build_router(app_state, &HttpOptions::from_config(config));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
