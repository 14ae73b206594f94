//! Listener, instance lock, and signal-driven shutdown.
//!
//! [`Server::bind`] acquires the single-instance lock, loads the TLS
//! context, and binds the listening socket; [`Server::serve`] then loops
//! accepting connections, spawning one session task per socket, until a
//! termination signal arrives. Startup failures propagate to the caller;
//! per-session failures never do.

use std::io;
use std::net::SocketAddr;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_rustls::TlsAcceptor;

use crate::config::Config;
use crate::error::{Error, Result};

pub mod routes;
pub mod session;
pub mod tls;

pub use routes::{build_router, AppContext};

/// Process-exclusive lock backed by a named Unix socket: binding fails
/// while another live process holds the name. The socket file is removed
/// when the lock drops.
pub struct InstanceLock {
    path: PathBuf,
    _listener: UnixListener,
}

impl InstanceLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        match UnixListener::bind(path) {
            Ok(listener) => {
                tracing::info!(lock = %path.display(), "instance lock acquired");
                Ok(Self {
                    path: path.to_path_buf(),
                    _listener: listener,
                })
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => Err(Error::Lock(format!(
                "another instance is already running (lock {})",
                path.display()
            ))),
            Err(e) => Err(Error::Lock(format!(
                "failed to bind lock socket {}: {e}",
                path.display()
            ))),
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        tracing::info!(lock = %self.path.display(), "instance lock released");
    }
}

/// A bound but not yet serving HLS server.
pub struct Server {
    listener: TcpListener,
    acceptor: TlsAcceptor,
    app: Router,
    _lock: InstanceLock,
}

impl Server {
    /// Acquire the instance lock, load TLS, and bind the listening socket.
    pub async fn bind(config: Config) -> Result<Server> {
        let lock = InstanceLock::acquire(&config.server.lock_path)?;
        let acceptor = tls::load_acceptor(&config.server.cert_path, &config.server.key_path)?;

        let listener = TcpListener::bind(("0.0.0.0", config.server.port)).await?;
        tracing::info!(port = config.server.port, "starting HLS server");

        let ctx = AppContext {
            config: Arc::new(config),
        };
        let app = build_router(ctx);

        Ok(Server {
            listener,
            acceptor,
            app,
            _lock: lock,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until a termination signal arrives. Accept
    /// errors are logged and the loop continues.
    pub async fn serve(self) -> Result<()> {
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("termination signal received, cleaning up");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            tracing::info!(peer = %addr, "accepted new connection");
                            tokio::spawn(session::run(
                                stream,
                                addr.ip(),
                                self.acceptor.clone(),
                                self.app.clone(),
                            ));
                        }
                        Err(e) => {
                            tracing::error!("accept failed: {e}");
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Start the server and run until shutdown.
pub async fn start_server(config: Config) -> Result<()> {
    let server = Server::bind(config).await?;
    let result = server.serve().await;
    tracing::info!("server shutdown complete");
    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    let hangup = async {
        match signal::unix::signal(signal::unix::SignalKind::hangup()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGHUP handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = hangup => {},
    }

    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_is_exclusive_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wavy.lock");

        let lock = InstanceLock::acquire(&path).unwrap();
        assert!(matches!(
            InstanceLock::acquire(&path),
            Err(Error::Lock(_))
        ));

        drop(lock);
        assert!(!path.exists());
        // Re-acquirable once released.
        let _lock = InstanceLock::acquire(&path).unwrap();
    }
}
