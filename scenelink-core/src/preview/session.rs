//! The host's single live preview session.
//!
//! A successful `start_live_preview` binds a second listener and
//! spawns one streamer task. The streamer owns the listener and every
//! subscriber connection; each tick it captures the viewport by
//! dispatching `get_viewport_image` through the host's own
//! [`CommandRouter`], so scene access stays serialized behind the one
//! seam the host already guards.
//!
//! The session ends when a stop command arrives between frames, when
//! the last subscriber disconnects, or when the host shuts down.
//! Subscribers learn about the end by reading end-of-stream.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::SinkExt;
use serde_json::Map;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use crate::codec::FrameCodec;
use crate::error::LinkError;
use crate::message::{PreviewFrame, commands};
use crate::network::{DEFAULT_HOST, DEFAULT_PREVIEW_PORT, Endpoint, PortProbe};
use crate::preview::phase::SessionPhase;
use crate::router::{CommandRouter, DispatchError};

// ── Constants ────────────────────────────────────────────────────

/// Slowest supported preview rate.
pub const MIN_FPS: u8 = 1;

/// Fastest supported preview rate.
pub const MAX_FPS: u8 = 60;

/// Rate used when a start command omits `fps`.
pub const DEFAULT_FPS: u8 = 5;

// ── PreviewConfig ────────────────────────────────────────────────

/// Configuration for one preview session.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Interface the preview listener binds.
    pub host: String,
    /// Suggested port. 0 asks the OS for any free port, and a taken
    /// port falls back to an OS-assigned one; the start response
    /// always announces the port actually bound.
    pub port: u16,
    /// Target frames per second, clamped to `MIN_FPS..=MAX_FPS`.
    pub fps: u8,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PREVIEW_PORT,
            fps: DEFAULT_FPS,
        }
    }
}

impl PreviewConfig {
    pub fn new(host: impl Into<String>, port: u16, fps: u8) -> Self {
        Self {
            host: host.into(),
            port,
            fps: fps.clamp(MIN_FPS, MAX_FPS),
        }
    }

    /// Reads `port` and `fps` out of a `start_live_preview` params
    /// object. Missing fields take the conventional defaults;
    /// out-of-range rates clamp; non-numeric fields are rejected.
    pub fn from_params(
        params: &Map<String, serde_json::Value>,
        bind_host: &str,
    ) -> Result<Self, DispatchError> {
        let port = match params.get("port") {
            None => DEFAULT_PREVIEW_PORT,
            Some(v) => v
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .ok_or_else(|| {
                    DispatchError::InvalidParams("port must be an integer in 0..=65535".into())
                })?,
        };

        let fps = match params.get("fps") {
            None => DEFAULT_FPS,
            Some(v) => v
                .as_u64()
                .ok_or_else(|| {
                    DispatchError::InvalidParams("fps must be a positive integer".into())
                })?
                .clamp(MIN_FPS as u64, MAX_FPS as u64) as u8,
        };

        Ok(Self {
            host: bind_host.to_string(),
            port,
            fps,
        })
    }

    /// Time between frames at the configured rate.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.clamp(MIN_FPS, MAX_FPS) as f64)
    }
}

// ── PreviewSession ───────────────────────────────────────────────

struct SessionInner {
    phase: SessionPhase,
    port: Option<u16>,
    stop: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

/// Cloneable handle to the host's one preview session.
///
/// All clones share state: whichever connection issues the stop
/// command tears down the session every other connection sees.
#[derive(Clone)]
pub struct PreviewSession {
    inner: Arc<Mutex<SessionInner>>,
}

impl Default for PreviewSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewSession {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                phase: SessionPhase::Idle,
                port: None,
                stop: None,
                task: None,
            })),
        }
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> SessionPhase {
        self.inner.lock().await.phase.clone()
    }

    /// Port the active session is serving on, if streaming.
    pub async fn port(&self) -> Option<u16> {
        self.inner.lock().await.port
    }

    /// Starts the session: binds the preview listener and spawns the
    /// streamer. Returns the port actually bound.
    ///
    /// A second start while the session is live is rejected with
    /// [`LinkError::Application`] naming the active port; the running
    /// session is untouched. A bind failure (including the ephemeral
    /// fallback) leaves the session idle.
    pub async fn start(
        &self,
        config: PreviewConfig,
        router: Arc<dyn CommandRouter>,
    ) -> Result<u16, LinkError> {
        // The lock is held across the bind so a concurrent start or
        // stop can never observe a half-started session.
        let mut inner = self.inner.lock().await;

        if inner.phase.begin_start().is_err() {
            let msg = match inner.port {
                Some(port) => format!("live preview already running on port {port}"),
                None => "live preview already starting".to_string(),
            };
            return Err(LinkError::Application(msg));
        }

        let listener = match Self::bind_listener(&config).await {
            Ok(l) => l,
            Err(e) => {
                inner.phase.force_idle();
                return Err(e);
            }
        };
        let port = match listener.local_addr() {
            Ok(addr) => addr.port(),
            Err(e) => {
                inner.phase.force_idle();
                return Err(e.into());
            }
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(stream_frames(
            listener,
            config.frame_interval(),
            router,
            stop_rx,
            Arc::clone(&self.inner),
        ));

        inner.phase.begin_streaming()?;
        inner.port = Some(port);
        inner.stop = Some(stop_tx);
        inner.task = Some(task);

        tracing::info!(port, fps = config.fps, "live preview started");
        Ok(port)
    }

    /// Stops the session and waits for the streamer to wind down.
    ///
    /// Returns `Ok(true)` if a session was stopped, `Ok(false)` if
    /// none was running — a stop with nothing to do succeeds, so
    /// controllers can always clean up blindly.
    pub async fn stop(&self) -> Result<bool, LinkError> {
        let (stop_tx, task) = {
            let mut inner = self.inner.lock().await;
            if inner.phase.is_idle() {
                return Ok(false);
            }
            (inner.stop.take(), inner.task.take())
        };

        if let Some(tx) = stop_tx {
            let _ = tx.send(true);
        }
        if let Some(task) = task {
            if let Err(e) = task.await {
                if e.is_panic() {
                    return Err(LinkError::Session("preview streamer panicked"));
                }
            }
        }

        tracing::info!("live preview stopped");
        Ok(true)
    }

    async fn bind_listener(config: &PreviewConfig) -> Result<TcpListener, LinkError> {
        let suggested = Endpoint::new(config.host.clone(), config.port);
        match PortProbe::reserve(&suggested).await {
            Ok(listener) => Ok(listener),
            Err(e) if config.port == 0 => Err(e),
            Err(e) => {
                tracing::warn!(
                    endpoint = %suggested,
                    "suggested preview port unavailable, asking the OS for one"
                );
                PortProbe::reserve(&suggested.with_port(0))
                    .await
                    .map_err(|_| e)
            }
        }
    }
}

// ── Streamer ─────────────────────────────────────────────────────

/// The per-session streaming loop.
///
/// Each tick: capture once, fan the frame out to every subscriber,
/// then sleep out the remainder of the frame interval while accepting
/// new subscribers and watching for stop. Stop is only honored here,
/// between frames — a frame being written is always written in full.
async fn stream_frames(
    listener: TcpListener,
    interval: Duration,
    router: Arc<dyn CommandRouter>,
    mut stop_rx: watch::Receiver<bool>,
    inner: Arc<Mutex<SessionInner>>,
) {
    let mut subscribers: Vec<Framed<TcpStream, FrameCodec>> = Vec::new();
    let mut served_any = false;

    'session: loop {
        let loop_start = Instant::now();

        if !subscribers.is_empty() {
            match capture(router.as_ref()).await {
                Ok(frame) => {
                    let mut alive = Vec::with_capacity(subscribers.len());
                    for mut sub in subscribers.drain(..) {
                        match sub.send(frame.clone()).await {
                            Ok(()) => alive.push(sub),
                            Err(e) => tracing::debug!("preview subscriber dropped: {e}"),
                        }
                    }
                    subscribers = alive;
                }
                // A failed capture skips this tick; the session lives on.
                Err(e) => tracing::warn!("viewport capture failed: {e}"),
            }
        }

        if served_any && subscribers.is_empty() {
            tracing::info!("last preview subscriber left, closing session");
            break 'session;
        }

        let pace = tokio::time::sleep(interval.saturating_sub(loop_start.elapsed()));
        tokio::pin!(pace);
        loop {
            tokio::select! {
                _ = &mut pace => break,
                _ = stop_rx.changed() => break 'session,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::info!(%peer, "preview subscriber connected");
                        subscribers.push(Framed::new(stream, FrameCodec::new()));
                        served_any = true;
                    }
                    Err(e) => tracing::warn!("preview accept error: {e}"),
                },
            }
        }
    }

    // Close subscriber streams and release the port before the idle
    // phase becomes observable.
    drop(subscribers);
    drop(listener);

    let mut inner = inner.lock().await;
    inner.phase.force_idle();
    inner.port = None;
    inner.stop = None;
    inner.task = None;
}

/// One viewport capture, routed through the host's dispatch seam.
async fn capture(router: &dyn CommandRouter) -> Result<PreviewFrame, LinkError> {
    let result = router
        .dispatch(commands::GET_VIEWPORT_IMAGE, Map::new())
        .await
        .map_err(|e| LinkError::Application(e.to_string()))?;
    PreviewFrame::from_result(&result)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::FrameReceiver;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};

    const TICK: Duration = Duration::from_millis(20);
    const WAIT: Duration = Duration::from_secs(5);

    /// Renders a fixed 2×2 raster; optionally fails every Nth capture.
    struct TestRouter {
        calls: AtomicU32,
        fail_every: Option<u32>,
    }

    impl TestRouter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                fail_every: None,
            })
        }

        fn failing_every(n: u32) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                fail_every: Some(n),
            })
        }
    }

    #[async_trait]
    impl CommandRouter for TestRouter {
        async fn dispatch(
            &self,
            kind: &str,
            _params: Map<String, Value>,
        ) -> Result<Map<String, Value>, DispatchError> {
            match kind {
                commands::GET_VIEWPORT_IMAGE => {
                    let call = self.calls.fetch_add(1, Ordering::SeqCst);
                    if let Some(n) = self.fail_every {
                        if call % n == 0 {
                            return Err(DispatchError::failed("render device busy"));
                        }
                    }
                    let frame = PreviewFrame::from_bytes(b"\x00\x01\x02\x03", 2, 2);
                    match serde_json::to_value(&frame).unwrap() {
                        Value::Object(map) => Ok(map),
                        _ => unreachable!(),
                    }
                }
                other => Err(DispatchError::UnknownCommand(other.to_string())),
            }
        }
    }

    fn fast_config() -> PreviewConfig {
        // Port 0 avoids collisions; 50 fps keeps the test short.
        PreviewConfig::new(DEFAULT_HOST, 0, 50)
    }

    async fn wait_until_idle(session: &PreviewSession) {
        let deadline = Instant::now() + WAIT;
        while !session.phase().await.is_idle() {
            assert!(Instant::now() < deadline, "session never went idle");
            tokio::time::sleep(TICK).await;
        }
    }

    #[tokio::test]
    async fn streams_frames_then_stops_cleanly() {
        let session = PreviewSession::new();
        let port = session.start(fast_config(), TestRouter::new()).await.unwrap();
        assert!(session.phase().await.is_streaming());
        assert_eq!(session.port().await, Some(port));

        let mut rx = FrameReceiver::connect(&Endpoint::loopback(port), WAIT)
            .await
            .unwrap();
        for _ in 0..3 {
            let frame = rx.next_frame(WAIT).await.unwrap().unwrap();
            assert_eq!((frame.width, frame.height), (2, 2));
            assert_eq!(frame.image_bytes().unwrap(), b"\x00\x01\x02\x03");
        }

        assert!(session.stop().await.unwrap());
        assert!(session.phase().await.is_idle());
        assert_eq!(session.port().await, None);

        // The subscriber sees end-of-stream, not an error.
        let mut saw_eof = false;
        for _ in 0..20 {
            match rx.next_frame(WAIT).await.unwrap() {
                Some(_) => continue, // frames already in flight
                None => {
                    saw_eof = true;
                    break;
                }
            }
        }
        assert!(saw_eof);

        // And the port is free again.
        assert!(PortProbe::is_free(&Endpoint::loopback(port)).await);
    }

    #[tokio::test]
    async fn second_start_is_rejected_and_stream_survives() {
        let session = PreviewSession::new();
        let port = session.start(fast_config(), TestRouter::new()).await.unwrap();

        let err = session
            .start(fast_config(), TestRouter::new())
            .await
            .unwrap_err();
        match err {
            LinkError::Application(msg) => {
                assert!(msg.contains("already running"));
                assert!(msg.contains(&port.to_string()));
            }
            other => panic!("expected Application error, got {other:?}"),
        }

        // First session is untouched.
        let mut rx = FrameReceiver::connect(&Endpoint::loopback(port), WAIT)
            .await
            .unwrap();
        assert!(rx.next_frame(WAIT).await.unwrap().is_some());
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_when_idle_is_idempotent() {
        let session = PreviewSession::new();
        assert!(!session.stop().await.unwrap());
        assert!(!session.stop().await.unwrap());
        assert!(session.phase().await.is_idle());
    }

    #[tokio::test]
    async fn session_ends_when_last_subscriber_leaves() {
        let session = PreviewSession::new();
        let port = session.start(fast_config(), TestRouter::new()).await.unwrap();

        let mut rx = FrameReceiver::connect(&Endpoint::loopback(port), WAIT)
            .await
            .unwrap();
        assert!(rx.next_frame(WAIT).await.unwrap().is_some());
        drop(rx);

        wait_until_idle(&session).await;
        assert!(PortProbe::is_free(&Endpoint::loopback(port)).await);
    }

    #[tokio::test]
    async fn capture_failure_skips_the_tick() {
        let session = PreviewSession::new();
        let port = session
            .start(fast_config(), TestRouter::failing_every(2))
            .await
            .unwrap();

        let mut rx = FrameReceiver::connect(&Endpoint::loopback(port), WAIT)
            .await
            .unwrap();
        // Every other capture fails, yet frames keep arriving.
        for _ in 0..3 {
            assert!(rx.next_frame(WAIT).await.unwrap().is_some());
        }
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn taken_port_falls_back_to_os_assigned() {
        let held = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let taken = held.local_addr().unwrap().port();

        let session = PreviewSession::new();
        let config = PreviewConfig::new(DEFAULT_HOST, taken, 50);
        let port = session.start(config, TestRouter::new()).await.unwrap();
        assert_ne!(port, taken);

        let mut rx = FrameReceiver::connect(&Endpoint::loopback(port), WAIT)
            .await
            .unwrap();
        assert!(rx.next_frame(WAIT).await.unwrap().is_some());
        session.stop().await.unwrap();
    }

    #[test]
    fn config_from_params_defaults_and_clamps() {
        let params = Map::new();
        let config = PreviewConfig::from_params(&params, DEFAULT_HOST).unwrap();
        assert_eq!(config.port, DEFAULT_PREVIEW_PORT);
        assert_eq!(config.fps, DEFAULT_FPS);

        let mut params = Map::new();
        params.insert("port".into(), 9900.into());
        params.insert("fps".into(), 500.into());
        let config = PreviewConfig::from_params(&params, DEFAULT_HOST).unwrap();
        assert_eq!(config.port, 9900);
        assert_eq!(config.fps, MAX_FPS);

        let mut params = Map::new();
        params.insert("fps".into(), 0.into());
        let config = PreviewConfig::from_params(&params, DEFAULT_HOST).unwrap();
        assert_eq!(config.fps, MIN_FPS);
    }

    #[test]
    fn config_from_params_rejects_non_numeric_fields() {
        let mut params = Map::new();
        params.insert("port".into(), "ninety-eight-seventy-seven".into());
        assert!(PreviewConfig::from_params(&params, DEFAULT_HOST).is_err());

        let mut params = Map::new();
        params.insert("fps".into(), (-5).into());
        assert!(PreviewConfig::from_params(&params, DEFAULT_HOST).is_err());
    }

    #[test]
    fn frame_interval_matches_rate() {
        let config = PreviewConfig::new(DEFAULT_HOST, 0, 5);
        assert_eq!(config.frame_interval(), Duration::from_millis(200));
    }
}
