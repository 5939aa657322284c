//! HTTP transport for docstore resources.
//!
//! # Responsibility
//! - Route REST-style requests to the core resource handlers.
//! - Own the single store connection shared by all requests.
//!
//! # Invariants
//! - Store work runs on the blocking pool; the connection lock is held for
//!   one request and never across an `.await`.
//! - Response bodies come from the core codec; this crate adds no fields.

use axum::routing::get;
use axum::Router;
use log::{error, info};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub mod error;
mod handlers;

pub use error::ApiError;

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Server settings resolved by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    pub bind: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Shared request state.
#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` with exclusive access to the store connection on the
    /// blocking pool.
    pub(crate) async fn with_conn<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| ApiError::ConnectionPoisoned)?;
            f(&conn)
        })
        .await
        .map_err(|err| ApiError::TaskFailed(err.to_string()))?
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/topics/",
            get(handlers::list_topics).post(handlers::create_topic),
        )
        .route(
            "/topics/{id}",
            get(handlers::retrieve_topic)
                .put(handlers::replace_topic)
                .delete(handlers::delete_topic),
        )
        .route(
            "/folders/",
            get(handlers::list_folders).post(handlers::create_folder),
        )
        .route(
            "/folders/{id}",
            get(handlers::retrieve_folder)
                .put(handlers::replace_folder)
                .delete(handlers::delete_folder),
        )
        .route(
            "/documents/",
            get(handlers::list_documents).post(handlers::create_document),
        )
        .route(
            "/documents/{id}",
            get(handlers::retrieve_document)
                .put(handlers::replace_document)
                .delete(handlers::delete_document),
        )
        .with_state(state)
}

/// Binds `config.bind` and serves until Ctrl-C.
pub async fn serve(config: &ServeConfig, conn: Connection) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(
        "event=http_listen module=http status=ok addr={}",
        listener.local_addr()?
    );

    axum::serve(listener, router(AppState::new(conn)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("event=http_shutdown module=http status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("event=http_signal module=http status=error error={err}");
        std::future::pending::<()>().await;
    }
}
