// src/server/mod.rs

//! Development server: static files from the output root, a live-reload
//! websocket and an optional browser launch.

mod browser;
mod reload;
mod static_files;

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::ServerSection;
use crate::errors::{PipelineError, Result};

pub use browser::open_in_browser;
pub use static_files::{inject_live_reload, resolve_request_path};

/// Websocket endpoint live-reload clients connect to.
pub const LIVE_RELOAD_PATH: &str = "/__sitepipe/livereload";

/// Shared state for request handlers.
#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub root: PathBuf,
    pub live_reload: bool,
    pub reload_tx: broadcast::Sender<()>,
}

/// Static file server for a build's output root.
#[derive(Debug, Clone)]
pub struct DevServer {
    root: PathBuf,
    config: ServerSection,
    open_browser: bool,
}

impl DevServer {
    pub fn new(root: impl Into<PathBuf>, config: ServerSection) -> Self {
        Self {
            root: root.into(),
            config,
            open_browser: true,
        }
    }

    /// Whether to launch a browser at `config.open` once listening.
    pub fn open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }

    /// Bind the listener and serve in the background.
    ///
    /// Returns once the socket is bound; the returned handle keeps the
    /// server (and its reload watcher) alive.
    pub async fn serve(self) -> Result<ServerHandle> {
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);

        tokio::fs::create_dir_all(&self.root).await?;
        let root = tokio::fs::canonicalize(&self.root).await?;

        let listener =
            TcpListener::bind(&bind_addr)
                .await
                .map_err(|e| PipelineError::ServerStartFailure {
                    addr: bind_addr.clone(),
                    reason: e.to_string(),
                })?;
        let addr = listener.local_addr()?;

        let (reload_tx, _) = broadcast::channel(16);
        let reload_watcher = if self.config.live_reload {
            Some(
                reload::spawn_reload_watcher(&root, reload_tx.clone()).map_err(|e| {
                    PipelineError::WatchSubscriptionFailure {
                        path: root.clone(),
                        reason: e.to_string(),
                    }
                })?,
            )
        } else {
            None
        };

        let state = AppState {
            root: root.clone(),
            live_reload: self.config.live_reload,
            reload_tx: reload_tx.clone(),
        };
        let router = build_router(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let join = tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = server.await {
                warn!(error = %err, "dev server stopped with an error");
            }
            debug!("dev server stopped");
        });

        let url = format!("http://{}:{}/", self.config.host, addr.port());
        info!(%url, root = ?root, live_reload = self.config.live_reload, "dev server listening");

        if self.open_browser {
            if let Some(page) = self.config.open.as_deref().filter(|p| !p.is_empty()) {
                let target = format!("{url}{}", page.trim_start_matches(['.', '/']));
                tokio::spawn(async move {
                    if let Err(err) = open_in_browser(&target).await {
                        warn!(url = %target, error = %format!("{err:#}"), "could not open browser");
                    }
                });
            }
        }

        Ok(ServerHandle {
            addr,
            url,
            reload_tx,
            shutdown: Some(shutdown_tx),
            join,
            _reload_watcher: reload_watcher,
        })
    }
}

fn build_router(state: AppState) -> Router {
    let mut router = Router::new();
    if state.live_reload {
        router = router.route(LIVE_RELOAD_PATH, get(reload::live_reload_socket));
    }
    router
        .fallback(static_files::serve_file)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle to a running [`DevServer`]. Dropping it leaves the server running
/// until the runtime shuts down but stops live reload.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    url: String,
    reload_tx: broadcast::Sender<()>,
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
    _reload_watcher: Option<reload::ReloadWatcher>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ask connected pages to reload now.
    pub fn reload(&self) {
        // No subscribers simply means no open pages.
        let _ = self.reload_tx.send(());
    }

    /// Stop accepting connections and wait for the server task to end.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(err) = (&mut self.join).await {
            warn!(error = %err, "dev server task ended abnormally");
        }
    }
}
