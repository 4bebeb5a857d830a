//! BUD.ai API Gateway
//!
//! The HTTP entry point for the strain catalog.
//! Handles:
//! - Strain CRUD and search
//! - Imports from external strain sources
//! - Preference-based recommendations
//! - Rate limiting and observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use budai_common::{
    config::{AppConfig, ObservabilityConfig},
    db::create_store,
    metrics,
    source::create_source,
    Importer, RecommendationResolver, StrainSource, StrainStore,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tower::{limit::ConcurrencyLimitLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn StrainStore>,
    pub resolver: RecommendationResolver,
    pub importer: Importer,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn StrainStore>,
        source: Arc<dyn StrainSource>,
    ) -> Self {
        let resolver = RecommendationResolver::new(store.clone());
        let importer = Importer::new(store.clone(), source, config.import_delay());

        Self {
            config,
            store,
            resolver,
            importer,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    // Initialize tracing
    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting BUD.ai API Gateway v{}",
        budai_common::VERSION
    );

    // Initialize metrics
    init_metrics(&config.observability)?;

    // Initialize storage and the external source
    let store = create_store(&config.database).await?;
    let source = create_source(&config.source, config.import_delay())?;
    info!(store = store.backend(), source = source.name(), "Services initialized");

    let state = AppState::new(config.clone(), store, source);
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown = Arc::new(Notify::new());
    let signalled = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signalled.notify_one();
        })
        .into_future();

    // In-flight requests get `shutdown_timeout` to drain
    let drain_deadline = async {
        shutdown.notified().await;
        tokio::time::sleep(config.shutdown_timeout()).await;
    };

    tokio::select! {
        result = server => result?,
        _ = drain_deadline => warn!(
            timeout_secs = config.server.shutdown_timeout_secs,
            "Graceful shutdown timed out, dropping open connections"
        ),
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn init_metrics(config: &ObservabilityConfig) -> anyhow::Result<()> {
    if config.metrics_port == 0 {
        info!("Prometheus exporter disabled");
    } else {
        PrometheusBuilder::new()
            .with_http_listener(SocketAddr::from(([0, 0, 0, 0], config.metrics_port)))
            .set_buckets(metrics::LATENCY_BUCKETS)?
            .install()?;
        info!(port = config.metrics_port, "Prometheus exporter listening");
    }

    metrics::register_metrics();
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let request_timeout =
        TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, state.config.request_timeout());

    // Imports pace themselves against the source and always run to completion,
    // so they are registered after the timeout layer
    let api_routes = Router::new()
        .route(
            "/strains",
            get(handlers::strains::list_strains).post(handlers::strains::create_strain),
        )
        .route(
            "/strains/{id}",
            get(handlers::strains::get_strain)
                .put(handlers::strains::update_strain)
                .delete(handlers::strains::delete_strain),
        )
        .route("/recommendations", post(handlers::recommendations::recommend))
        .layer(request_timeout.clone())
        .route("/strains/import", post(handlers::imports::import_strains))
        .route("/strains/bulk-import", post(handlers::imports::bulk_import));

    let mut app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .layer(request_timeout)
        .nest("/api", api_routes);

    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        app = app.layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(ConcurrencyLimitLayer::new(state.config.server.max_concurrent_requests))
            .layer(axum::middleware::from_fn(middleware::metrics::track_requests)),
    )
    .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
