//! # Presentation Layer
//!
//! An axum server exposing the explorer as HTML pages and a JSON API.
//!
//! | Path | Response |
//! |------|----------|
//! | `/` | landing page |
//! | `/healthz` | `ok` |
//! | `/tables` | table explorer with search, paging and downloads |
//! | `/api/tables`, `/api/tables/:table` | table catalog and search pages as JSON |
//! | `/export/:table/:format` | CSV or XLSX download |
//! | `/compounds`, `/api/compounds`, `/api/compounds/:id` | compound search |
//! | `/spectra`, `/api/spectra/:peak_id`, `/spectra/:peak_id/plot.svg` | spectrum viewer |
//! | `/detect`, `/api/detect` | PFAS detector |
//!
//! The single [`Database`] handle is shared through [`AppState`]. Every
//! query runs on tokio's blocking pool, and the connection mutex serializes
//! them. The detection library is read on the first detector request and
//! kept for the life of the server.

mod error;
mod handlers;
mod pages;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use axum::routing::get;
use axum::Router;
use log::info;

use crate::config::Config;
use crate::database::Database;
use crate::detect::{FingerprintGrid, Library};

pub use error::AppError;
pub use handlers::EXPORT_TRUNCATED_HEADER;

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    /// The open database
    pub db: Arc<Database>,
    /// Effective configuration
    pub config: Arc<Config>,
    library: Arc<OnceLock<Library>>,
}

impl AppState {
    /// Wrap an open database and its configuration
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            library: Arc::new(OnceLock::new()),
        }
    }

    /// Run `f` against the database on the blocking pool
    pub(crate) async fn with_db<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Database) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    /// Run `f` against the detection library, loading it on first use
    pub(crate) async fn with_library<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Library) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let cell = Arc::clone(&self.library);
        let source = self.config.spectra.clone();
        tokio::task::spawn_blocking(move || {
            let library = match cell.get() {
                Some(library) => library,
                None => {
                    let loaded = Library::load(&db, &source, FingerprintGrid::default())?;
                    cell.get_or_init(|| loaded)
                }
            };
            f(library)
        })
        .await?
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::landing_handler))
        .route("/healthz", get(handlers::healthz_handler))
        .route("/tables", get(handlers::tables_page_handler))
        .route("/api/tables", get(handlers::tables_api_handler))
        .route("/api/tables/:table", get(handlers::table_search_api_handler))
        .route("/export/:table/:format", get(handlers::export_handler))
        .route("/compounds", get(handlers::compounds_page_handler))
        .route("/api/compounds", get(handlers::compounds_api_handler))
        .route("/api/compounds/:id", get(handlers::compound_details_handler))
        .route("/spectra", get(handlers::spectra_page_handler))
        .route("/api/spectra/:peak_id", get(handlers::spectrum_api_handler))
        .route("/spectra/:peak_id/plot.svg", get(handlers::spectrum_plot_handler))
        .route("/detect", get(handlers::detect_page_handler))
        .route("/api/detect", get(handlers::detect_api_handler))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C
///
/// The database handle is dropped, closing the connection, once the last
/// in-flight request has finished.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
