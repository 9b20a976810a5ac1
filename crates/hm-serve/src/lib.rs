pub mod config;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod ttl_sweep;

use axum::Router;
use config::ServeConfig;
use hm_core::{Clock, HazardError, Hazardmap, SystemClock};
use hm_db::schema;
use hm_db::store::DbStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub db_path: String,
    pub clock: Arc<dyn Clock>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            clock: Arc::new(SystemClock),
            max_upload_bytes: config::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn from_config(config: &ServeConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            ..Self::new(config.db_path.clone())
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Opens a connection for one unit of work.
pub fn build_hazardmap(state: &AppState) -> Result<Hazardmap<DbStore>, HazardError> {
    let conn = schema::open_and_migrate(&state.db_path).map_err(|err| HazardError::Internal {
        message: err.to_string(),
    })?;
    Ok(Hazardmap::with_clock(DbStore::new(conn), state.clock.clone()))
}

pub fn app(state: AppState) -> Router {
    routes::router(state)
}

pub async fn serve(config: ServeConfig) -> Result<(), std::io::Error> {
    config.ensure_db_dir()?;
    let state = AppState::from_config(&config);
    if let Some(interval) = config.sweep_interval() {
        tokio::spawn(ttl_sweep::run(state.clone(), interval));
    }

    let listener = TcpListener::bind(config.addr()).await?;
    info!(addr = %config.addr(), db_path = %config.db_path, "listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutting down");
}
