//! The HTTP surface.

mod error;
mod extractors;
mod records;
mod webhooks;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderName, Method, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::OnceCell;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use recsync_core::{ActionRunner, ChangeNotifier, RecordType};
use recsync_engine::{
    CancelSignal, ImportOptions, Importer, QueryService, RecordEditor, TenantResolver,
    WebhookIngest,
};
use recsync_file::FileStore;

pub use error::ApiError;

/// Collaborators shared by every request.
pub struct Services {
    pub data_dir: PathBuf,
    pub actions: Arc<dyn ActionRunner>,
    pub notifier: Arc<dyn ChangeNotifier>,
    pub tenants: TenantResolver,
    pub import_options: ImportOptions,
    pub import_types: Vec<RecordType>,
    pub import_timeout: Option<Duration>,
    pub page_size: usize,
}

struct Inner {
    services: Services,
    store: OnceCell<Arc<FileStore>>,
}

/// Shared request state. The store is opened on first use and reused.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self {
            inner: Arc::new(Inner {
                services,
                store: OnceCell::new(),
            }),
        }
    }

    /// The record store, opening it on first call.
    pub async fn store(&self) -> Result<Arc<FileStore>, ApiError> {
        let store = self
            .inner
            .store
            .get_or_try_init(|| async {
                let dir = &self.inner.services.data_dir;
                let store = FileStore::open(dir)?;
                info!(path = %dir.display(), "Opened record store");
                Ok::<_, recsync_core::Error>(Arc::new(store))
            })
            .await?;
        Ok(Arc::clone(store))
    }

    pub fn tenants(&self) -> &TenantResolver {
        &self.inner.services.tenants
    }

    pub fn import_types(&self) -> &[RecordType] {
        &self.inner.services.import_types
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        CancelSignal::from_timeout(self.inner.services.import_timeout)
    }

    pub async fn query(&self) -> Result<QueryService<FileStore>, ApiError> {
        Ok(QueryService::new(self.store().await?).with_page_size(self.inner.services.page_size))
    }

    pub async fn importer(&self) -> Result<Importer<FileStore, dyn ActionRunner>, ApiError> {
        Ok(Importer::new(
            self.store().await?,
            Arc::clone(&self.inner.services.actions),
            self.inner.services.import_options.clone(),
        ))
    }

    pub async fn ingest(&self) -> Result<WebhookIngest<FileStore>, ApiError> {
        Ok(WebhookIngest::new(
            self.store().await?,
            self.inner.services.tenants.clone(),
        ))
    }

    pub async fn editor(&self) -> Result<RecordEditor<FileStore, dyn ChangeNotifier>, ApiError> {
        Ok(RecordEditor::new(
            self.store().await?,
            Arc::clone(&self.inner.services.notifier),
        ))
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(webhooks::TOKEN_HEADER),
        ]);

    Router::new()
        .route("/health", get(health))
        .merge(records::router())
        .route("/webhooks", post(webhooks::receive))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");
}
