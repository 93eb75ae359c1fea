//! htcollector API Server
//!
//! HTTP surface for storing station readings, querying the last day of
//! readings, naming stations and scraping the latest values.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod error;
mod routes;
pub mod settings;
pub mod sink;

pub use settings::Settings;
pub use error::ApiError;
pub use sink::{MetricsSink, NoopSink, PrometheusSink};
pub use routes::names::NameResponse;
pub use routes::readings::{StoredReading, LOOKBACK_HOURS};

use data_validator::{ValidationConfig, Validator};
use storage::{ReadingStore, StoreConfig};

/// Application state shared across handlers
pub struct AppState {
    /// Reading store
    pub store: Arc<ReadingStore>,
    /// Gauge destination
    pub sink: Arc<dyn MetricsSink>,
    /// Parameter validation
    pub validator: Validator,
    /// Settings read at startup
    pub settings: Settings,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(store: Arc<ReadingStore>, sink: Arc<dyn MetricsSink>, settings: Settings) -> Self {
        let validation = if settings.strict_validation {
            ValidationConfig::strict()
        } else {
            ValidationConfig::default()
        };

        Self {
            store,
            sink,
            validator: Validator::new(validation),
            settings,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub reading_count: Option<i64>,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/storereading",
            get(routes::readings::store_reading).post(routes::readings::store_reading),
        )
        .route("/getreadings", get(routes::readings::get_readings))
        .route("/getallreadings", get(routes::readings::get_all_readings))
        .route("/getnames", get(routes::names::get_names))
        .route("/setname", post(routes::names::set_name))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Prometheus scrape endpoint
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.sink.render(),
    )
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let reading_count = match state.store.reading_count().await {
        Ok(count) => Some(count),
        Err(e) => {
            error!("Health check cannot reach store: {}", e);
            None
        }
    };

    Json(HealthResponse {
        status: (if reading_count.is_some() { "healthy" } else { "degraded" }).to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        reading_count,
    })
}

/// Initialize logging
pub fn init_logging(level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the server until Ctrl-C.
///
/// A store that cannot be opened is fatal: the error is returned before
/// anything listens.
pub async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let store = ReadingStore::open(&StoreConfig {
        path: settings.database_path.clone(),
        max_connections: settings.max_connections,
    })
    .await?;
    let store = Arc::new(store);

    let addr = settings.listen_addr.clone();
    let state = Arc::new(AppState::new(
        Arc::clone(&store),
        Arc::new(PrometheusSink::new()),
        settings,
    ));
    let app = create_router(state);

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    store.close().await;
    Ok(())
}
