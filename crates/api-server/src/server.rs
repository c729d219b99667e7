//! API server: router assembly, HTTP listener, and the metrics exporter.

use crate::files_rest;
use crate::rest::{self, AppState};
use crate::sms_rest;
use crate::swagger::ApiDoc;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use bulksms_core::config::AppConfig;
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// All routes with their middleware, bound to `state`.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        // Spreadsheet files
        .route("/upload", post(files_rest::handle_upload))
        .route("/columns", post(files_rest::handle_columns))
        .route("/download/:filename", get(files_rest::handle_download))
        // Sends
        .route("/send_sms", post(sms_rest::handle_tabular_send))
        .route("/excel_send_sms", post(sms_rest::handle_paired_send))
        .route("/advanced_send_sms", post(sms_rest::handle_templated_send))
        .route("/mongo_send_sms", post(sms_rest::handle_collection_send))
        // Document store
        .route("/collections", get(sms_rest::handle_collections))
        .route("/fields", get(sms_rest::handle_fields))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Main API server.
pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Start the HTTP REST server and serve until ctrl-c.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = build_router(self.state.clone(), self.config.uploads.max_upload_bytes);

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);
        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Start the Prometheus exporter on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        if !self.config.metrics.enabled {
            info!("Metrics exporter disabled");
            return Ok(());
        }

        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}
