//! IFROF factory search API server.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ifrof_api::config::AppConfig;
use ifrof_api::maintenance::spawn_maintenance;
use ifrof_api::{router, AppState};
use ifrof_db::Database;
use ifrof_inference::{FirecrawlScraper, LlmGateway, PerplexitySearcher};
use ifrof_search::FactorySearchService;

/// Initialize tracing.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, daily rotation)
///   LOG_ANSI    - "true"/"false" override ANSI colors
///   RUST_LOG    - standard env filter (default: "ifrof=info,tower_http=info")
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "ifrof_api=info,ifrof_search=info,ifrof_inference=info,ifrof_db=info,tower_http=info".into()
    });
    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("ifrof-api.log");
        let (non_blocking, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(file_dir, file_name));

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(log_ansi.unwrap_or(false)),
                )
                .init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let config = AppConfig::from_env()?;

    info!("Connecting to database...");
    let db = Database::connect(&config.database_url, &config.pool)
        .await?
        .with_daily_limit(config.search_daily_limit);
    db.migrate().await?;
    info!("Database connected and migrated");

    let llm = Arc::new(LlmGateway::new(config.llm.clone())?);
    let searcher = Arc::new(PerplexitySearcher::new(config.search.clone())?);
    let scraper = Arc::new(FirecrawlScraper::new(config.scrape.clone())?);

    let service = FactorySearchService::new(
        llm,
        searcher,
        scraper,
        Arc::new(db.rate_limits.clone()),
        Arc::new(db.searches.clone()),
    );
    let state = AppState::new(service, Arc::new(db.access_tokens.clone()))
        .with_burst_limit(&config.http.burst);

    info!(
        daily_limit = config.search_daily_limit,
        burst_enabled = state.burst_limiter.is_some(),
        burst_requests = config.http.burst.requests,
        burst_period_secs = config.http.burst.period_secs,
        "Rate limiting configured"
    );

    let _maintenance = spawn_maintenance(db.maintenance.clone(), config.maintenance_interval_secs);

    let app = router(state, &config.http);

    let addr: SocketAddr = config.bind_addr().parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
