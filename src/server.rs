// HTTP exposition server
//
// Serves a landing page, a liveness probe and the metrics endpoint. Every
// request to the metrics path runs one full scrape; upstream API failures
// never turn into HTTP errors.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::registry::ExporterRegistry;

/// Content type of the Prometheus text exposition format
const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Liveness probe path, not available as a metrics path
pub const HEALTH_PATH: &str = "/healthz";

#[derive(Clone)]
pub struct ServerState {
    registry: Arc<ExporterRegistry>,
    metrics_path: Arc<str>,
}

impl ServerState {
    pub fn new(registry: Arc<ExporterRegistry>, metrics_path: &str) -> Self {
        ServerState {
            registry,
            metrics_path: Arc::from(metrics_path),
        }
    }
}

/// Builds the router
pub fn router(state: ServerState) -> Router {
    let metrics_path = state.metrics_path.to_string();
    Router::new()
        .route("/", get(landing_handler))
        .route(HEALTH_PATH, get(health_handler))
        .route(&metrics_path, get(metrics_handler))
        .with_state(state)
}

async fn landing_handler(State(state): State<ServerState>) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>Sakura Cloud Exporter</title></head>\n<body>\n\
         <h1>Sakura Cloud Exporter</h1>\n<p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n</html>\n",
        path = state.metrics_path
    ))
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn metrics_handler(State(state): State<ServerState>) -> Response {
    match state.registry.encode_text().await {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Serves until Ctrl+C or SIGTERM
pub async fn serve(addr: SocketAddr, state: ServerState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCounter;

    fn state() -> ServerState {
        let errors = ErrorCounter::new().unwrap();
        errors.init_collector("server");
        let registry = ExporterRegistry::new(Vec::new(), errors, 1).unwrap();
        ServerState::new(Arc::new(registry), "/metrics")
    }

    #[tokio::test]
    async fn test_metrics_handler() {
        let response = metrics_handler(State(state())).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            TEXT_FORMAT
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("# TYPE sakuracloud_exporter_errors_total counter"));
    }

    #[tokio::test]
    async fn test_landing_page_links_metrics() {
        let Html(page) = landing_handler(State(state())).await;
        assert!(page.contains("href=\"/metrics\""));
        assert_eq!(health_handler().await, "ok");
    }
}
