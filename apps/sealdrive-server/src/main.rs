//! SealDrive server - end-to-end encrypted file and folder service.
//!
//! Serves the `/api/v1` surface over HTTP and runs the pending-upload reaper
//! in the background.
//!
//! # Usage
//!
//! ```text
//! SEALDRIVE_LISTEN=0.0.0.0:8080 sealdrive-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SEALDRIVE_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `SEALDRIVE_AUTH_SECRET` | `dev-secret` | Bearer-token HMAC secret |
//! | `SEALDRIVE_PRESIGN_SECRET` | `dev-presign-secret` | Presigned-URL HMAC secret |
//! | `SEALDRIVE_PENDING_TTL_SECS` | `86400` | Pending-upload TTL |
//! | `SEALDRIVE_REAP_INTERVAL_SECS` | `3600` | Reaper sweep interval |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sealdrive_auth::TokenAuthority;
use sealdrive_core::{ServiceConfig, ServiceError};
use sealdrive_engine::SealDrive;
use sealdrive_http::ApiHttpService;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config
/// value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Run the accept loop, serving connections until a shutdown signal arrives.
async fn serve(listener: TcpListener, service: ApiHttpService) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Spawn the background reaper sweeping abandoned pending uploads.
fn spawn_reaper(drive: SealDrive) {
    let interval = drive.config().reap_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a fleet restart does
        // not stampede the lock.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match drive.reap_pending_once().await {
                Ok(stats) => {
                    if stats.completed > 0 || stats.deleted > 0 {
                        info!(
                            completed = stats.completed,
                            deleted = stats.deleted,
                            "reaper sweep finished"
                        );
                    }
                }
                Err(ServiceError::LockUnavailable { .. }) => {
                    // Another replica is reaping; try again next interval.
                }
                Err(e) => warn!(error = %e, "reaper sweep failed"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::from_env();

    init_tracing(&config.log_level)?;

    info!(
        listen = %config.listen,
        bucket = %config.bucket,
        pending_ttl_secs = config.pending_ttl_secs,
        sync_page_limit_default = config.sync_page_limit_default,
        version = VERSION,
        "starting SealDrive server",
    );

    let tokens = TokenAuthority::new(config.auth_secret.as_bytes().to_vec());
    let drive = SealDrive::new(config.clone());
    let service = ApiHttpService::new(drive.clone(), tokens);

    spawn_reaper(drive);

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
