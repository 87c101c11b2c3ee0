//! Schema gateway service
//!
//! Connects to a relational database with credentials taken from the URL and
//! exposes:
//! - table and column listing through schema reflection
//! - distinct values of a column
//! - rows filtered by an exact match on one column

mod catalog;
mod handlers;
mod pool_manager;
mod routes;
mod service;
mod state;

use axum::{body::Body, http::Request, middleware, routing::get, Json, Router};
use common::config::{load_dotenv, AppConfig};
use common::errors::AppResult;
use common::middleware::request_id::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "schema-gateway";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Schema Gateway API",
        version = "0.1.0",
        description = "Schema reflection and ad-hoc queries over credentials supplied in the URL"
    ),
    paths(
        handlers::list_tables,
        handlers::list_columns,
        handlers::column_values,
        handlers::filtered_rows,
        handlers::health_check,
    ),
    components(schemas(
        common::response::TablesResponse,
        common::response::ColumnsResponse,
        common::response::ColumnValuesResponse,
        common::response::FilteredRowsResponse,
        common::errors::ErrorBody,
        common::errors::ColumnNotFoundBody,
        handlers::HealthResponse,
    )),
    tags(
        (name = "connect", description = "Reflection and query endpoints"),
        (name = "health", description = "Health check endpoint")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv(".env");

    let config = AppConfig::load_with_service(SERVICE_NAME)?;
    init_tracing(config.json_logs);

    let state = AppState::new(config.clone());
    let pool_manager = state.pool_manager.clone();
    let app = create_router(state, &config.allowed_origin)?;

    let addr = config.bind_addr();
    info!(
        service = SERVICE_NAME,
        address = %addr,
        driver = %config.db_driver,
        db_host = %config.db_host,
        "starting service"
    );

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool_manager.shutdown().await;
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn create_router(state: AppState, allowed_origin: &str) -> AppResult<Router> {
    // The default span would record the URI, which carries the password.
    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| tracing::debug_span!("http", method = %req.method()));

    Ok(Router::new()
        .merge(routes::router(allowed_origin)?)
        .route("/api-docs/openapi.json", get(openapi_json))
        .route_layer(middleware::from_fn(request_id_middleware))
        .layer(trace)
        .with_state(state))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
