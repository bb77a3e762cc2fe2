// src/server/reload.rs

use std::path::Path;
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::AppState;
use crate::watch::is_content_event;

/// Quiet period after the last change before clients are told to reload.
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

/// Keeps the output-root watcher alive.
pub(crate) struct ReloadWatcher {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for ReloadWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadWatcher").finish()
    }
}

/// Watch `root` and broadcast a reload after every burst of changes.
pub(crate) fn spawn_reload_watcher(
    root: &Path,
    reload_tx: broadcast::Sender<()>,
) -> notify::Result<ReloadWatcher> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_content_event(&event.kind) {
                    let _ = event_tx.send(event);
                }
            }
            Err(err) => warn!(error = %err, "output watch error"),
        },
        Config::default(),
    )?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    info!(?root, "live reload watching output");

    tokio::spawn(async move {
        while let Some(first) = event_rx.recv().await {
            debug!(paths = ?first.paths, "output changed");
            loop {
                match tokio::time::timeout(RELOAD_DEBOUNCE, event_rx.recv()).await {
                    Ok(Some(_)) => continue,
                    Ok(None) => return,
                    Err(_quiet) => break,
                }
            }
            let clients = reload_tx.receiver_count();
            if clients > 0 {
                debug!(clients, "sending reload");
                let _ = reload_tx.send(());
            }
        }
    });

    Ok(ReloadWatcher { _inner: watcher })
}

pub(crate) async fn live_reload_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    let rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| reload_client(socket, rx))
}

async fn reload_client(mut socket: WebSocket, mut rx: broadcast::Receiver<()>) {
    debug!("live reload client connected");
    loop {
        tokio::select! {
            signal = rx.recv() => match signal {
                Ok(()) | Err(RecvError::Lagged(_)) => {
                    if socket.send(Message::Text("reload".to_string())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("live reload client disconnected");
}
