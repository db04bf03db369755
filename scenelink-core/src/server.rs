//! The host-side command server.
//!
//! Accepts controller connections on the command endpoint and runs
//! the request/response loop on each: decode one document, execute,
//! write exactly one response, repeat. The next command is not read
//! until the previous response is flushed, so pipelined commands are
//! answered strictly in arrival order.
//!
//! The two preview commands are intercepted here and applied to the
//! host's single [`PreviewSession`]; everything else goes to the
//! embedding application's [`CommandRouter`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::codec::DocumentCodec;
use crate::error::LinkError;
use crate::message::{Command, Response, commands};
use crate::network::{Endpoint, PortProbe};
use crate::preview::{PreviewConfig, PreviewSession};
use crate::router::CommandRouter;

// ── CommandServer ────────────────────────────────────────────────

/// TCP server for the command stream.
///
/// # Lifetime
///
/// [`bind`](Self::bind) reserves the port eagerly so a taken command
/// port fails the host at startup instead of at first use. Call
/// [`run`](Self::run) to serve until [`stop`](Self::stop); stopping
/// the server also tears down any live preview session.
pub struct CommandServer {
    listener: tokio::net::TcpListener,
    local: Endpoint,
    router: Arc<dyn CommandRouter>,
    preview: PreviewSession,
    running: Arc<AtomicBool>,
}

impl std::fmt::Debug for CommandServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandServer")
            .field("local", &self.local)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl CommandServer {
    /// Binds the command endpoint and prepares the server.
    pub async fn bind(endpoint: &Endpoint, router: Arc<dyn CommandRouter>) -> Result<Self, LinkError> {
        let listener = PortProbe::reserve(endpoint).await?;
        let local_addr = listener.local_addr()?;
        let local = Endpoint::new(endpoint.host(), local_addr.port());

        Ok(Self {
            listener,
            local,
            router,
            preview: PreviewSession::new(),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The endpoint actually bound. With a port-0 bind this is where
    /// the OS put us.
    pub fn local_endpoint(&self) -> &Endpoint {
        &self.local
    }

    /// Handle to the host's preview session, shared with every
    /// connection the server accepts.
    pub fn preview(&self) -> PreviewSession {
        self.preview.clone()
    }

    /// A cloneable handle that can stop the server from another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal the server to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the accept loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Serve connections until stopped.
    ///
    /// Each connection runs independently; a protocol error on one
    /// closes that connection only. Intended to be spawned:
    ///
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use scenelink_core::server::CommandServer;
    /// # async fn example(server: CommandServer) {
    /// let server = Arc::new(server);
    /// let handle = server.stop_handle();
    /// tokio::spawn({
    ///     let server = Arc::clone(&server);
    ///     async move { server.run().await }
    /// });
    /// // … later …
    /// handle.store(false, std::sync::atomic::Ordering::SeqCst);
    /// # }
    /// ```
    pub async fn run(&self) -> Result<(), LinkError> {
        self.running.store(true, Ordering::SeqCst);
        info!("command server listening on {}", self.local);

        while self.running.load(Ordering::SeqCst) {
            let accept = tokio::select! {
                result = self.listener.accept() => result,
                _ = Self::wait_for_stop(&self.running) => break,
            };

            let (stream, peer) = match accept {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept error: {e}");
                    continue;
                }
            };

            info!("controller connected from {peer}");
            let router = Arc::clone(&self.router);
            let preview = self.preview.clone();
            let bind_host = self.local.host().to_string();
            tokio::spawn(async move {
                handle_connection(stream, peer, router, preview, bind_host).await;
            });
        }

        // The preview session does not outlive the server.
        let _ = self.preview.stop().await;
        self.running.store(false, Ordering::SeqCst);
        info!("command server stopped");
        Ok(())
    }

    /// Async helper: resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}

// ── Connection loop ──────────────────────────────────────────────

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Arc<dyn CommandRouter>,
    preview: PreviewSession,
    bind_host: String,
) {
    let mut framed = Framed::new(stream, DocumentCodec::new());

    while let Some(item) = framed.next().await {
        let value = match item {
            Ok(v) => v,
            // Unparseable bytes poison the framing; drop the
            // connection, the preview session is unaffected.
            Err(e) => {
                warn!(%peer, "command stream error: {e}");
                break;
            }
        };

        let response = respond(value, &router, &preview, &bind_host).await;
        if let Err(e) = framed.send(response).await {
            warn!(%peer, "response write failed: {e}");
            break;
        }
    }

    debug!(%peer, "controller disconnected");
}

/// Executes one decoded document and produces its response.
///
/// Never returns an Err: every failure mode a controller can trigger
/// becomes an error response so the connection stays usable.
async fn respond(
    value: Value,
    router: &Arc<dyn CommandRouter>,
    preview: &PreviewSession,
    bind_host: &str,
) -> Response {
    let command = match Command::from_value(value) {
        Ok(c) => c,
        Err(e) => return Response::error(e.to_string()),
    };
    debug!(command = %command, "dispatching");

    let Command { kind, params } = command;
    match kind.as_str() {
        commands::START_LIVE_PREVIEW => start_preview(&params, router, preview, bind_host).await,
        commands::STOP_LIVE_PREVIEW => stop_preview(preview).await,
        _ => match router.dispatch(&kind, params).await {
            Ok(result) => Response::success(result),
            Err(e) => Response::error(e.to_string()),
        },
    }
}

async fn start_preview(
    params: &Map<String, Value>,
    router: &Arc<dyn CommandRouter>,
    preview: &PreviewSession,
    bind_host: &str,
) -> Response {
    let config = match PreviewConfig::from_params(params, bind_host) {
        Ok(c) => c,
        Err(e) => return Response::error(e.to_string()),
    };

    match preview.start(config, Arc::clone(router)).await {
        Ok(port) => {
            let mut result = Map::new();
            result.insert("port".into(), port.into());
            result.insert(
                "message".into(),
                format!("Live preview started on port {port}").into(),
            );
            Response::success(result)
        }
        // The session rejected the start (already running).
        Err(LinkError::Application(msg)) => Response::error(msg),
        Err(e) => Response::error(e.to_string()),
    }
}

async fn stop_preview(preview: &PreviewSession) -> Response {
    match preview.stop().await {
        Ok(stopped) => {
            let mut result = Map::new();
            result.insert("stopped".into(), stopped.into());
            result.insert(
                "message".into(),
                if stopped {
                    "Live preview stopped"
                } else {
                    "Live preview was not running"
                }
                .into(),
            );
            Response::success(result)
        }
        Err(e) => Response::error(e.to_string()),
    }
}

// ── Tests ────────────────────────────────────────────────────────
