// SPDX-License-Identifier: AGPL-3.0-or-later
//! Protocol server
//!
//! Translates each request into a single backend operation and encodes the
//! outcome as a status code. Requests are handled concurrently and share
//! nothing but the backend.

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};
use hfs_core::{HfsError, HfsResult, ResourcePath, StorageBackend};
use std::future::{Future, IntoFuture};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

/// Methods the server answers; everything else is `405`.
const ALLOWED_METHODS: &str = "GET, POST, DELETE";

/// HTTP file server over a storage backend
pub struct FileServer {
    backend: Arc<dyn StorageBackend>,
    span: Span,
    abandon: CancellationToken,
}

#[derive(Clone)]
struct ServerState {
    backend: Arc<dyn StorageBackend>,
    span: Span,
    /// Cancelled when the shutdown grace period runs out
    abandon: CancellationToken,
}

impl FileServer {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        let span = tracing::info_span!("hfs_server", backend = backend.id());
        Self {
            backend,
            span,
            abandon: CancellationToken::new(),
        }
    }

    /// Record every request under `span` instead of the default server span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Build the router. Every path is routed to the same handler.
    pub fn router(&self) -> Router {
        Router::new().fallback(handle).with_state(ServerState {
            backend: Arc::clone(&self.backend),
            span: self.span.clone(),
            abandon: self.abandon.clone(),
        })
    }

    /// Serve connections from `listener` until `shutdown` resolves.
    ///
    /// After shutdown is requested no new connections are accepted and
    /// in-flight requests get `grace` to finish. Requests still running past
    /// the deadline are abandoned: their handlers stop touching the backend
    /// and the call fails with [`HfsError::ShutdownTimeout`].
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F, grace: Duration) -> HfsResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let span = self.span.clone();
        let abandon = self.abandon.clone();
        tracing::info!(parent: &span, addr = %addr, "hfs is now ready for requests");

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = axum::serve(listener, self.router()).with_graceful_shutdown(async move {
            let _ = stop_rx.await;
        });
        let mut server = tokio::spawn(server.into_future());

        tokio::select! {
            result = &mut server => return server_exit(result),
            _ = shutdown => {}
        }

        tracing::info!(parent: &span, timeout = ?grace, "shutting down");
        let _ = stop_tx.send(());

        match tokio::time::timeout(grace, &mut server).await {
            Ok(result) => {
                server_exit(result)?;
                tracing::info!(parent: &span, "successfully shutdown");
                Ok(())
            }
            Err(_) => {
                abandon.cancel();
                server.abort();
                Err(HfsError::ShutdownTimeout(grace))
            }
        }
    }
}

fn server_exit(result: Result<std::io::Result<()>, JoinError>) -> HfsResult<()> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HfsError::Io(e)),
        Err(e) => Err(HfsError::Other(format!("server task failed: {e}"))),
    }
}

async fn handle(State(state): State<ServerState>, method: Method, uri: Uri, body: Body) -> Response {
    let span = tracing::info_span!(parent: &state.span, "request", method = %method, path = %uri.path());

    async move {
        tracing::info!("received request");
        let abandon = &state.abandon;
        let result = tokio::select! {
            biased;
            _ = abandon.cancelled() => Err(HfsError::Other("request abandoned at shutdown".to_string())),
            result = dispatch(state.backend.as_ref(), &method, uri.path(), body, abandon) => result,
        };
        let response = match result {
            Ok(response) => response,
            Err(err) => ServerError(err).into_response(),
        };
        tracing::info!(status = response.status().as_u16(), "response sent");
        response
    }
    .instrument(span)
    .await
}

async fn dispatch(
    backend: &dyn StorageBackend,
    method: &Method,
    raw_path: &str,
    body: Body,
    abandon: &CancellationToken,
) -> HfsResult<Response> {
    if !matches!(*method, Method::GET | Method::POST | Method::DELETE) {
        return Err(HfsError::MethodNotSupported(method.to_string()));
    }

    // No file can exist under a name that does not decode, and none can be
    // created there either.
    let path = match ResourcePath::from_url_path(raw_path) {
        Ok(path) => path,
        Err(err) if *method == Method::POST => return Err(err),
        Err(_) => return Err(HfsError::NotFound(raw_path.to_string())),
    };
    match *method {
        Method::GET => get_file(backend, &path, abandon).await,
        Method::POST => upsert_file(backend, &path, body).await,
        _ => delete_file(backend, &path).await,
    }
}

async fn get_file(backend: &dyn StorageBackend, path: &ResourcePath, abandon: &CancellationToken) -> HfsResult<Response> {
    if !backend.exists(path).await? {
        return Err(HfsError::NotFound(path.to_string()));
    }
    let reader = backend.open_read(path).await?;

    // The status line is committed before the first body byte, so a read
    // failure past this point can only truncate the body.
    let span = Span::current();
    let error_span = span.clone();
    let total = Arc::new(AtomicU64::new(0));
    let counted = Arc::clone(&total);

    let body = ReaderStream::new(reader)
        .inspect_ok(move |chunk| {
            counted.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        })
        .inspect_err(move |err| {
            error_span.in_scope(|| tracing::error!(error = %err, "unexpected error when writing file to response"));
        })
        .take_until(abandon.clone().cancelled_owned())
        .chain(stream::poll_fn(move |_| {
            span.in_scope(|| tracing::info!(total_bytes = total.load(Ordering::Relaxed), "wrote file to response"));
            Poll::<Option<std::io::Result<Bytes>>>::Ready(None)
        }));

    Ok((StatusCode::OK, Body::from_stream(body)).into_response())
}

async fn upsert_file(backend: &dyn StorageBackend, path: &ResourcePath, body: Body) -> HfsResult<Response> {
    // Must be decided before open_write truncates or creates the file.
    let existed = backend.exists(path).await?;
    let mut file = backend.open_write(path).await?;

    let mut body = body.into_data_stream();
    let mut total_bytes = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| HfsError::Transport(e.to_string()))?;
        file.write_all(&chunk).await?;
        total_bytes += chunk.len() as u64;
    }
    file.sync().await?;

    tracing::info!(total_bytes, created = !existed, "successfully saved file");
    let status = if existed { StatusCode::OK } else { StatusCode::CREATED };
    Ok(status.into_response())
}

async fn delete_file(backend: &dyn StorageBackend, path: &ResourcePath) -> HfsResult<Response> {
    if !backend.exists(path).await? {
        return Err(HfsError::NotFound(path.to_string()));
    }
    backend.remove(path).await?;

    tracing::info!("successfully deleted file");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Per-request failure, rendered as a plain-text response.
struct ServerError(HfsError);

impl ServerError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Body safe to hand to clients, without backend details
    fn user_message(&self) -> &'static str {
        match self.0.root_cause() {
            HfsError::NotFound(_) => "file not found",
            HfsError::MethodNotSupported(_) => "method not supported",
            _ => "internal server error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self.0.root_cause() {
            HfsError::NotFound(_) => tracing::warn!("file not found"),
            HfsError::MethodNotSupported(_) => tracing::error!("received request with unsupported method"),
            HfsError::InvalidPath(_) => tracing::warn!(error = %self.0, "invalid request path"),
            err => tracing::error!(error = %err, "request failed"),
        }

        let status = self.status_code();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            return (status, [(header::ALLOW, ALLOWED_METHODS)], self.user_message()).into_response();
        }
        (status, self.user_message()).into_response()
    }
}
