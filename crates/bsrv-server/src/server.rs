//! C10 — owns the listener, the router, the expiry sweep task, and
//! ordered shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::connection::handle_connection;
use crate::state::{ServerState, now_secs};

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cleanup_interval_seconds: u64,
}

/// Binds the listener, serves connections until `shutdown_tx` fires, and
/// tears the manager down before returning.
pub async fn run(config: ServerConfig, state: Arc<ServerState>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app = Router::new()
        .route("/", get(|| async { "OK" }))
        .route(
            "/ws",
            get({
                let shutdown_rx = shutdown_rx.clone();
                move |ws: WebSocketUpgrade,
                      State(state): State<Arc<ServerState>>,
                      ConnectInfo(addr): ConnectInfo<SocketAddr>| {
                    let shutdown_rx = shutdown_rx.clone();
                    async move {
                        ws.on_upgrade(move |socket| {
                            handle_connection(socket, state, addr.to_string(), shutdown_rx)
                        })
                    }
                }
            }),
        )
        .with_state(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid host/port combination: {}:{}", config.host, config.port))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind command server to {addr}"))?;

    info!(host = %config.host, port = config.port, "command server listening");

    let sweep_handle = spawn_expiry_sweep(Arc::clone(&state), config.cleanup_interval_seconds, shutdown_rx.clone());

    let serve = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>());

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;

        tokio::select! {
            result = serve => { result.context("command server error")?; }
            _ = sigterm.recv() => { info!("received SIGTERM, shutting down"); }
            _ = sigint.recv() => { info!("received SIGINT, shutting down"); }
        }
    }

    #[cfg(windows)]
    {
        tokio::select! {
            result = serve => { result.context("command server error")?; }
            _ = tokio::signal::ctrl_c() => { info!("received Ctrl+C, shutting down"); }
        }
    }

    let _ = shutdown_tx.send(true);
    sweep_handle.abort();
    state.manager.shutdown(now_secs()).await;
    info!("command server stopped");
    Ok(())
}

fn spawn_expiry_sweep(
    state: Arc<ServerState>,
    interval_seconds: u64,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds.max(1)));
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let now = now_secs();
                    let closed = state.manager.sweep_expired(now).await;
                    if closed > 0 {
                        warn!(closed, "expired idle sessions during sweep");
                    }
                    state.rate_limiter.lock().await.cleanup(now);
                }
            }
        }
    })
}
