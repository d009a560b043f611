//! Framed JSON RPC over a Unix domain socket.
//!
//! Wire format: 4-byte big-endian length followed by a JSON body. Clients
//! send [`Request`] frames; the server answers with [`ServerMessage`]
//! frames — zero or more `progress` notifications followed by exactly one
//! `reply` carrying the result for the request id.

use crate::error::{ApiError, RpcError};
use crate::progress::ProgressEvent;
use crate::routes::Route;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, Mutex};

/// Upper bound on a single frame. Large payloads (image content, logs)
/// never ride this channel, so the bound is generous.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub route: Route,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ServerMessage {
    Progress {
        id: u64,
        event: ProgressEvent,
    },
    Reply {
        id: u64,
        result: Result<serde_json::Value, ApiError>,
    },
}

pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    body: &[u8],
) -> Result<(), RpcError> {
    if body.len() > MAX_FRAME_LEN {
        return Err(RpcError::FrameTooLarge(body.len()));
    }
    writer.write_all(&(body.len() as u32).to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame; `Ok(None)` on a clean end of stream.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>, RpcError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(RpcError::FrameTooLarge(len));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Channel a handler pushes progress updates into; the server forwards
/// them to the requesting client as `progress` frames.
pub type ProgressSink = mpsc::UnboundedSender<ProgressEvent>;

type HandlerFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value, ApiError>> + Send>>;
type Handler = Box<dyn Fn(serde_json::Value, ProgressSink) -> HandlerFuture + Send + Sync>;

/// Immutable route table. Fully built during bootstrap, before the server
/// starts listening; handlers may run concurrently.
#[derive(Default)]
pub struct Router {
    handlers: HashMap<Route, Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a typed handler for a route. The payload is deserialized
    /// into `Req`; a shape mismatch is an invalid-argument failure.
    pub fn route<Req, Resp, F, Fut>(&mut self, route: Route, handler: F)
    where
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + 'static,
        F: Fn(Req, ProgressSink) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, ApiError>> + Send + 'static,
    {
        let handler = Box::new(
            move |payload: serde_json::Value, progress: ProgressSink| -> HandlerFuture {
                let request = serde_json::from_value::<Req>(payload)
                    .map_err(|e| ApiError::invalid_argument(format!("malformed request: {e}")));
                match request {
                    Ok(request) => {
                        let fut = handler(request, progress);
                        Box::pin(async move {
                            let response = fut.await?;
                            serde_json::to_value(response).map_err(|e| {
                                ApiError::internal(format!("response serialization: {e}"))
                            })
                        })
                    }
                    Err(e) => Box::pin(async move { Err::<serde_json::Value, ApiError>(e) }),
                }
            },
        );
        self.handlers.insert(route, handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub async fn dispatch(
        &self,
        route: Route,
        payload: serde_json::Value,
        progress: ProgressSink,
    ) -> Result<serde_json::Value, ApiError> {
        match self.handlers.get(&route) {
            Some(handler) => handler(payload, progress).await,
            None => Err(ApiError::not_found(format!("no handler for {route:?}"))),
        }
    }
}

/// The daemon's RPC listener.
pub struct ApiServer {
    socket_path: PathBuf,
    router: Arc<Router>,
}

impl ApiServer {
    pub fn new(socket_path: impl Into<PathBuf>, router: Arc<Router>) -> Self {
        Self {
            socket_path: socket_path.into(),
            router,
        }
    }

    /// Accept loop; runs until the listener fails.
    pub async fn serve(&self) -> Result<(), RpcError> {
        if self.socket_path.exists() {
            tokio::fs::remove_file(&self.socket_path).await?;
        }
        if let Some(parent) = self.socket_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!(path = %self.socket_path.display(), "API server listening");

        loop {
            let (stream, _) = listener.accept().await?;
            let router = self.router.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, router).await {
                    tracing::debug!(error = %e, "connection closed");
                }
            });
        }
    }
}

async fn handle_connection(stream: UnixStream, router: Arc<Router>) -> Result<(), RpcError> {
    let (mut reader, writer) = stream.into_split();
    let writer = Arc::new(Mutex::new(writer));

    while let Some(body) = read_frame(&mut reader).await? {
        let request: Request = match serde_json::from_slice(&body) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed request frame");
                continue;
            }
        };

        let router = router.clone();
        let writer = writer.clone();
        tokio::spawn(async move {
            let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
            let forward_writer = writer.clone();
            let request_id = request.id;

            let forwarder = tokio::spawn(async move {
                while let Some(event) = progress_rx.recv().await {
                    let message = ServerMessage::Progress {
                        id: request_id,
                        event,
                    };
                    if let Ok(body) = serde_json::to_vec(&message) {
                        let mut w = forward_writer.lock().await;
                        if write_frame(&mut *w, &body).await.is_err() {
                            break;
                        }
                    }
                }
            });

            let result = router
                .dispatch(request.route, request.payload, progress_tx)
                .await;
            // All progress senders are gone once dispatch returns; drain
            // pending updates before the reply so ordering is stable.
            let _ = forwarder.await;

            let message = ServerMessage::Reply {
                id: request_id,
                result,
            };
            if let Ok(body) = serde_json::to_vec(&message) {
                let mut w = writer.lock().await;
                let _ = write_frame(&mut *w, &body).await;
            }
        });
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot reach the daemon: {0}. Is it running?")]
    Connect(std::io::Error),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("daemon closed the connection before replying")]
    Disconnected,
}

/// One-request-per-connection client used by the CLI.
pub struct ApiClient {
    socket_path: PathBuf,
    next_id: AtomicU64,
}

impl ApiClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn call<Req, Resp>(&self, route: Route, request: &Req) -> Result<Resp, ClientError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        self.call_with_progress(route, request, |_| {}).await
    }

    /// Issues a request and feeds progress notifications to `on_event`
    /// until the reply arrives.
    pub async fn call_with_progress<Req, Resp>(
        &self,
        route: Route,
        request: &Req,
        mut on_event: impl FnMut(&ProgressEvent),
    ) -> Result<Resp, ClientError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(ClientError::Connect)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = serde_json::to_value(request).map_err(RpcError::from)?;
        let frame = serde_json::to_vec(&Request { id, route, payload }).map_err(RpcError::from)?;
        write_frame(&mut stream, &frame).await?;

        loop {
            let body = read_frame(&mut stream)
                .await?
                .ok_or(ClientError::Disconnected)?;
            let message: ServerMessage = serde_json::from_slice(&body).map_err(RpcError::from)?;
            match message {
                ServerMessage::Progress { id: msg_id, event } if msg_id == id => {
                    on_event(&event);
                }
                ServerMessage::Progress { .. } => {}
                ServerMessage::Reply { id: msg_id, result } if msg_id == id => {
                    let value = result?;
                    return Ok(serde_json::from_value(value).map_err(RpcError::from)?);
                }
                ServerMessage::Reply { .. } => {}
            }
        }
    }
}
