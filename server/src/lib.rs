use std::sync::Arc;

use axum::{routing::post, Router};
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    classify::ServerErrorsFailureClass, limit::RequestBodyLimitLayer, trace::TraceLayer,
};
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod aggregate;
pub mod batch;
pub mod domain;
pub mod error;
pub mod fs_store;
pub mod handlers;
pub mod keys;
pub mod spool;

extern crate serde;

#[cfg(test)] // <-- not needed in integration tests
extern crate rstest;

use crate::fs_store::FsStore;
use crate::handlers::{AppState, Limits};
use axum::extract::DefaultBodyLimit;
use std::env;
use std::path::{Path, PathBuf};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONTAINER: &str = "documents";
const SCRATCH_DIR: &str = ".scratch";

extern crate tokio;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::upload_batch),
    components(schemas(
        kernel::UploadResponse,
        kernel::UploadResult,
        kernel::BatchSummary,
        kernel::ErrorResponse
    )),
    tags((name = "uploads", description = "Batch file upload API"))
)]
struct ApiDoc;

pub async fn run() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "server=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration from environment; the data dir is the backend
    // endpoint and its absence is fatal before any request is served.
    let data_dir = env::var("UPSTORE_DATA_DIR").expect("UPSTORE_DATA_DIR is not set");
    let container = env::var("UPSTORE_CONTAINER").unwrap_or_else(|_| String::from(DEFAULT_CONTAINER));
    let port = env::var("UPSTORE_PORT").unwrap_or_else(|_| String::from("5000"));
    let public_url =
        env::var("UPSTORE_PUBLIC_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

    let root = PathBuf::from(&data_dir);
    let scratch = scratch_dir(&root);
    tokio::fs::create_dir_all(&scratch)
        .await
        .expect("Scratch directory cannot be created");

    let store = FsStore::new(root, container, public_url);
    let state = Arc::new(AppState {
        store,
        scratch,
        limits: Limits::default(),
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("Port cannot be bound");
    tracing::debug!("listening on 0.0.0.0:{port}");

    let app = create_routes(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");
}

pub fn create_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/batch", post(handlers::upload_batch))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        tracing::error!("Server error: {error}");
                    },
                ))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(
                    2 * 1024 * 1024 * 1024, /* 2GB */
                ))
                .into_inner(),
        )
        .with_state(state)
}

/// Scratch directory used to spool incoming file parts below `data_dir`.
#[must_use]
pub fn scratch_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(SCRATCH_DIR)
}

pub async fn shutdown_signal() {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    println!("signal received, starting graceful shutdown");
}
