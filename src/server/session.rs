//! Per-connection session lifecycle.
//!
//! Each accepted socket is driven by exactly one task: TLS handshake,
//! one HTTP/1.1 request/response exchange, TLS shutdown, close. Running
//! the whole session on a single task keeps its stages strictly ordered
//! and ties the session's lifetime to the task's.
//!
//! A handshake failure is logged and the connection dropped without a
//! reply. Every response carries `Connection: close`, so the exchange
//! ends with hyper shutting down the TLS stream (close_notify) and the
//! socket closing when the task returns.

use axum::{Extension, Router};
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use socket2::SockRef;
use std::net::IpAddr;
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;

/// Owner identity carried into handlers: the peer address at accept time.
#[derive(Debug, Clone, Copy)]
pub struct Peer(pub IpAddr);

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Drive one connection from handshake to close.
pub async fn run(stream: TcpStream, peer: IpAddr, acceptor: TlsAcceptor, app: Router) {
    tracing::info!(%peer, "starting new session");

    if let Err(e) = SockRef::from(&stream).set_keepalive(true) {
        tracing::warn!(%peer, "failed to set keep-alive: {e}");
    }

    let tls_stream = match acceptor.accept(stream).await {
        Ok(tls_stream) => tls_stream,
        Err(e) => {
            tracing::error!(%peer, "TLS handshake failed: {e}");
            return;
        }
    };
    tracing::debug!(%peer, "TLS handshake successful");

    let service = TowerToHyperService::new(app.layer(Extension(Peer(peer))));
    if let Err(e) = hyper::server::conn::http1::Builder::new()
        .serve_connection(TokioIo::new(tls_stream), service)
        .await
    {
        tracing::error!(%peer, "session error: {e}");
    }

    tracing::debug!(%peer, "session closed");
}
