//! Request routing and handlers.
//!
//! Two routes are matched literally (`/toml/upload`, `/hls/clients`);
//! everything else falls through to [`dispatch`], which sends POSTs to
//! the archive-upload handler, GETs to the segment-fetch handler, and
//! rejects other methods with 405. Uploaders may POST an archive to any
//! path that is not the metadata route.

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::server::session::Peer;
use crate::{ingest, metadata, storage};

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
}

/// Create the router with all routes and response-identity layers.
pub fn build_router(ctx: AppContext) -> Router {
    let body_limit = ctx.config.server.body_limit_bytes();

    Router::new()
        .route(
            config::ROUTE_CLIENT_LIST,
            get(list_clients).fallback(dispatch),
        )
        .route(
            config::ROUTE_METADATA_UPLOAD,
            post(upload_metadata).fallback(dispatch),
        )
        .fallback(dispatch)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static(config::SERVER_NAME),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONNECTION,
            HeaderValue::from_static("close"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Method-based dispatch for every path without a literal route.
async fn dispatch(
    State(ctx): State<AppContext>,
    Extension(peer): Extension<Peer>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Result<Response> {
    match method {
        Method::POST => upload_archive(ctx, peer, body).await,
        Method::GET => fetch_segment(ctx, uri).await,
        _ => Err(Error::MethodNotAllowed),
    }
}

/// Archive upload: stage the body, extract-validate-promote, answer with
/// the generated asset id in the `Client-ID` header.
async fn upload_archive(ctx: AppContext, peer: Peer, body: Bytes) -> Result<Response> {
    let owner = peer.to_string();
    let asset_id = Uuid::new_v4().to_string();
    tracing::info!(%owner, %asset_id, size = body.len(), "handling archive upload");

    let temp_root = &ctx.config.storage.temp_root;
    tokio::fs::create_dir_all(temp_root).await?;
    let archive_path = temp_root.join(format!("{asset_id}{}", config::ARCHIVE_SUFFIX));
    tokio::fs::write(&archive_path, &body).await?;

    if body.is_empty() {
        let _ = tokio::fs::remove_file(&archive_path).await;
        return Err(Error::Validation("archive upload is empty".into()));
    }

    let config = ctx.config.clone();
    let ingest_path = archive_path.clone();
    let ingest_owner = owner.clone();
    let ingest_id = asset_id.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        ingest::ingest_archive(&config, &ingest_path, &ingest_id, &ingest_owner)
    })
    .await;

    // The staged archive never outlives the request, success or not.
    if let Err(e) = tokio::fs::remove_file(&archive_path).await {
        tracing::error!(archive = %archive_path.display(), "failed to remove staged archive: {e}");
    }

    let promoted = outcome.map_err(|e| Error::Internal(format!("ingest task failed: {e}")))??;
    tracing::info!(%owner, %asset_id, promoted, "upload stored");

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(config::CLIENT_ID_HEADER, asset_id.as_str())
        .body(Body::empty())?)
}

/// Metadata upload: strip the body framing, parse the inner TOML, and
/// acknowledge. The parsed document is not persisted here.
async fn upload_metadata(body: String) -> Result<Response> {
    let doc = metadata::strip_boundaries(&body);
    let parsed = metadata::parse(doc)?;
    tracing::info!(path = %parsed.audio.path, "metadata parsed");

    Ok((StatusCode::OK, "metadata parsed\n").into_response())
}

/// Owner/asset listing for the whole storage tree.
async fn list_clients(State(ctx): State<AppContext>) -> Result<Response> {
    tracing::info!("handling client listing request");

    let root = ctx.config.storage.root.clone();
    let listing = tokio::task::spawn_blocking(move || storage::render_listing(&root))
        .await
        .map_err(|e| Error::Internal(format!("listing task failed: {e}")))??;

    match listing {
        Some(text) => Ok(([(header::CONTENT_TYPE, "text/plain")], text).into_response()),
        None => Err(Error::not_found("owner listing", "storage is empty")),
    }
}

/// Segment fetch: `/hls/<owner>/<asset-id>/<file>`, exactly that shape.
async fn fetch_segment(ctx: AppContext, uri: Uri) -> Result<Response> {
    let path = uri.path();
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if parts.len() != 4 || parts[0] != "hls" || !parts[1..].iter().all(|c| is_safe_component(c)) {
        tracing::error!(%path, "invalid request path");
        return Err(Error::Validation(format!("invalid request path: {path}")));
    }
    let (owner, asset_id, filename) = (parts[1], parts[2], parts[3]);

    let file_path = storage::segment_path(&ctx.config.storage.root, owner, asset_id, filename);
    let meta = match tokio::fs::metadata(&file_path).await {
        Ok(meta) if meta.is_file() => meta,
        _ => {
            tracing::error!(file = %file_path.display(), "file not found");
            return Err(Error::not_found("segment", filename));
        }
    };

    let file = tokio::fs::File::open(&file_path).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    tracing::info!(%owner, %asset_id, file = %filename, "serving segment");

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, storage::media_type_for(filename))
        .header(header::CONTENT_LENGTH, meta.len())
        .body(body)?)
}

/// A path component may not traverse upward or smuggle a separator.
fn is_safe_component(component: &str) -> bool {
    !component.contains("..") && !component.contains('\\')
}
