//! Connection lifecycle: `Idle → Connecting → Open → Closed → Connecting …`.
//!
//! One [`ConnectionManager`] owns one logical realtime channel. It keeps at
//! most one dial in flight, turns every transport failure into a `Closed`
//! status plus exactly one reconnect timer, and tags each socket with a
//! generation so events from a socket torn down by [`ConnectionManager::clear`]
//! (or superseded by a reconnect) are ignored.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tessera_core::TaskSlot;
use tessera_core::ids::DeviceId;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::ConnectionError;
use crate::transport::{Connector, Frame, FrameSink, FrameStream};

/// Default delay before a reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Default inbound fan-out buffer.
pub const DEFAULT_INBOUND_CAPACITY: usize = 256;

/// Channel lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    /// No endpoint, or cleared.
    Idle,
    /// A dial is in flight.
    Connecting,
    /// The socket is open.
    Open,
    /// The socket closed or failed; a reconnect is scheduled.
    Closed,
}

/// Opaque credential appended to the dial URL.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Connection timing and buffering.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Fixed delay between a failure and the reconnect attempt.
    pub reconnect_delay: Duration,
    /// Inbound broadcast capacity; slow subscribers lag past this.
    pub inbound_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
        }
    }
}

/// Connection counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    /// Dials started.
    pub dial_attempts: u64,
    /// Reconnect timers armed.
    pub reconnects_scheduled: u64,
    /// Sockets that reached `Open`.
    pub opened: u64,
}

struct State {
    status: ConnectionStatus,
    endpoint: Option<Url>,
    token: Option<AuthToken>,
    device_id: DeviceId,
    generation: u64,
    in_flight: bool,
    dial_cancel: Option<CancellationToken>,
    outbound: Option<mpsc::UnboundedSender<Frame>>,
    io_cancel: Option<CancellationToken>,
    stats: ConnectionStats,
}

struct Inner {
    connector: Arc<dyn Connector>,
    config: ConnectionConfig,
    state: Mutex<State>,
    status_tx: watch::Sender<ConnectionStatus>,
    inbound: broadcast::Sender<Frame>,
    reconnect: TaskSlot,
}

impl Inner {
    fn set_status(&self, state: &mut State, status: ConnectionStatus) {
        if state.status != status {
            debug!(from = ?state.status, to = ?status, "connection status");
            state.status = status;
            let _ = self.status_tx.send_replace(status);
        }
    }
}

/// Resilient realtime channel. Cheap to clone; clones share the channel.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ConnectionManager")
            .field("status", &state.status)
            .field("endpoint", &state.endpoint.as_ref().map(Url::as_str))
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Create an idle manager. A fresh device id is generated; override it
    /// with [`set_credentials`](Self::set_credentials).
    pub fn new(connector: Arc<dyn Connector>, config: ConnectionConfig) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Idle);
        let (inbound, _) = broadcast::channel(config.inbound_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                connector,
                config,
                state: Mutex::new(State {
                    status: ConnectionStatus::Idle,
                    endpoint: None,
                    token: None,
                    device_id: DeviceId::new(),
                    generation: 0,
                    in_flight: false,
                    dial_cancel: None,
                    outbound: None,
                    io_cancel: None,
                    stats: ConnectionStats::default(),
                }),
                status_tx,
                inbound,
                reconnect: TaskSlot::new(),
            }),
        }
    }

    /// Set the credentials used by the next dial.
    pub fn set_credentials(&self, token: Option<AuthToken>, device_id: DeviceId) {
        let mut state = self.inner.state.lock();
        state.token = token;
        state.device_id = device_id;
    }

    /// Store `endpoint` and connect unless a socket is connecting or open.
    pub fn set_endpoint(&self, endpoint: &str) -> Result<(), ConnectionError> {
        let url = parse_endpoint(endpoint)?;
        let idle = {
            let mut state = self.inner.state.lock();
            state.endpoint = Some(url);
            !matches!(
                state.status,
                ConnectionStatus::Connecting | ConnectionStatus::Open
            )
        };
        if idle {
            let _ = self.connect();
        }
        Ok(())
    }

    /// Start a dial. Returns `false` when no attempt was started: one is
    /// already in flight, the socket is open, or no endpoint is set.
    pub fn connect(&self) -> bool {
        let (url, generation, cancel) = {
            let mut state = self.inner.state.lock();
            if state.in_flight || state.status == ConnectionStatus::Open {
                return false;
            }
            let Some(endpoint) = state.endpoint.clone() else {
                debug!("connect requested without an endpoint");
                return false;
            };
            state.in_flight = true;
            let cancel = CancellationToken::new();
            state.dial_cancel = Some(cancel.clone());
            state.generation += 1;
            state.stats.dial_attempts += 1;
            self.inner.set_status(&mut state, ConnectionStatus::Connecting);
            let url = dial_url(&endpoint, state.token.as_ref(), &state.device_id);
            info!(endpoint = %endpoint, generation = state.generation, "connecting");
            (url, state.generation, cancel)
        };

        let manager = self.clone();
        let _ = tokio::spawn(async move {
            let result = tokio::select! {
                () = cancel.cancelled() => {
                    debug!(generation, "dial abandoned");
                    return;
                }
                result = manager.inner.connector.dial(&url) => result,
            };
            manager.on_dial_result(generation, result);
        });
        true
    }

    /// Force-close, reset to `Idle`, forget the endpoint, and cancel any
    /// pending reconnect. A dial still in flight is abandoned.
    pub fn clear(&self) {
        {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.in_flight = false;
            if let Some(cancel) = state.dial_cancel.take() {
                cancel.cancel();
            }
            state.endpoint = None;
            state.outbound = None;
            if let Some(cancel) = state.io_cancel.take() {
                cancel.cancel();
            }
            self.inner.set_status(&mut state, ConnectionStatus::Idle);
        }
        if self.inner.reconnect.cancel() {
            debug!("pending reconnect cancelled");
        }
        info!("connection cleared");
    }

    /// Queue `frame` on the open socket. Frames are written in call order.
    pub fn send(&self, frame: Frame) -> Result<(), ConnectionError> {
        let state = self.inner.state.lock();
        match (&state.status, &state.outbound) {
            (ConnectionStatus::Open, Some(tx)) => {
                tx.send(frame).map_err(|_| ConnectionError::NotOpen)
            }
            _ => Err(ConnectionError::NotOpen),
        }
    }

    /// Receive inbound frames from every socket this manager opens.
    pub fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.inner.inbound.subscribe()
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.state.lock().status
    }

    /// Status updates.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status_tx.subscribe()
    }

    /// The stored endpoint, without auth parameters.
    pub fn endpoint(&self) -> Option<Url> {
        self.inner.state.lock().endpoint.clone()
    }

    /// Whether a reconnect timer is armed.
    pub fn reconnect_pending(&self) -> bool {
        self.inner.reconnect.is_pending()
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> ConnectionStats {
        self.inner.state.lock().stats
    }

    // ── Socket events ───────────────────────────────────────────────

    fn on_dial_result(
        &self,
        generation: u64,
        result: Result<(FrameSink, FrameStream), ConnectionError>,
    ) {
        let mut state = self.inner.state.lock();
        if state.generation != generation {
            debug!(generation, "discarding dial result from a cleared channel");
            return;
        }
        state.in_flight = false;
        state.dial_cancel = None;
        let (sink, stream) = match result {
            Ok(socket) => socket,
            Err(error) => {
                warn!(%error, generation, "dial failed");
                self.close_locked(&mut state);
                drop(state);
                self.schedule_reconnect();
                return;
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        state.outbound = Some(tx);
        state.io_cancel = Some(cancel.clone());
        state.stats.opened += 1;
        self.inner.set_status(&mut state, ConnectionStatus::Open);
        drop(state);

        if self.inner.reconnect.cancel() {
            debug!("open socket cancelled pending reconnect");
        }
        info!(generation, "connection open");

        let _ = tokio::spawn(write_loop(
            Arc::downgrade(&self.inner),
            sink,
            rx,
            cancel.clone(),
            generation,
        ));
        let _ = tokio::spawn(read_loop(
            Arc::downgrade(&self.inner),
            stream,
            cancel,
            generation,
        ));
    }

    /// Error or close on socket `generation`. Moves to `Closed` and arms
    /// the reconnect timer unless one is already armed.
    fn on_disconnect(&self, generation: u64) {
        {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                return;
            }
            self.close_locked(&mut state);
        }
        self.schedule_reconnect();
    }

    fn close_locked(&self, state: &mut State) {
        state.outbound = None;
        if let Some(cancel) = state.io_cancel.take() {
            cancel.cancel();
        }
        self.inner.set_status(state, ConnectionStatus::Closed);
    }

    fn schedule_reconnect(&self) {
        let delay = self.inner.config.reconnect_delay;
        let weak = Arc::downgrade(&self.inner);
        let scheduled = self.inner.reconnect.start_after_if_idle(delay, move || {
            if let Some(inner) = weak.upgrade() {
                let _ = ConnectionManager { inner }.connect();
            }
        });
        if scheduled {
            self.inner.state.lock().stats.reconnects_scheduled += 1;
            info!(delay_ms = delay.as_millis(), "reconnect scheduled");
        }
    }
}

fn is_current(inner: &Inner, generation: u64) -> bool {
    inner.state.lock().generation == generation
}

async fn write_loop(
    inner: Weak<Inner>,
    mut sink: FrameSink,
    mut rx: mpsc::UnboundedReceiver<Frame>,
    cancel: CancellationToken,
    generation: u64,
) {
    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => break,
            frame = rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        if let Err(error) = sink.send(frame).await {
            warn!(%error, generation, "write failed");
            if let Some(inner) = inner.upgrade() {
                ConnectionManager { inner }.on_disconnect(generation);
            }
            return;
        }
    }
    let _ = sink.close().await;
}

async fn read_loop(
    inner: Weak<Inner>,
    mut stream: FrameStream,
    cancel: CancellationToken,
    generation: u64,
) {
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return,
            next = stream.next() => next,
        };
        let Some(inner) = inner.upgrade() else {
            return;
        };
        match next {
            Some(Ok(frame)) => {
                if !is_current(&inner, generation) {
                    return;
                }
                let _ = inner.inbound.send(frame);
            }
            Some(Err(error)) => {
                warn!(%error, generation, "socket error");
                ConnectionManager { inner }.on_disconnect(generation);
                return;
            }
            None => {
                info!(generation, "socket closed by peer");
                ConnectionManager { inner }.on_disconnect(generation);
                return;
            }
        }
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ConnectionError> {
    let invalid = |reason: String| ConnectionError::InvalidEndpoint {
        endpoint: endpoint.to_owned(),
        reason,
    };
    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => {}
        other => return Err(invalid(format!("scheme must be ws or wss, got {other}"))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".into()));
    }
    Ok(url)
}

/// `<endpoint>?token=<token>&device_id=<device>`. Existing query pairs are kept.
fn dial_url(endpoint: &Url, token: Option<&AuthToken>, device_id: &DeviceId) -> Url {
    let mut url = endpoint.clone();
    {
        let mut pairs = url.query_pairs_mut();
        if let Some(token) = token {
            let _ = pairs.append_pair("token", token.expose());
        }
        let _ = pairs.append_pair("device_id", device_id.as_str());
    }
    url
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use futures::channel::mpsc as fmpsc;
    use tessera_core::test_utils::settle;
    use tokio::sync::oneshot;

    use super::*;

    /// Remote side of a mock socket.
    struct Remote {
        to_client: fmpsc::UnboundedSender<Result<Frame, ConnectionError>>,
        from_client: fmpsc::UnboundedReceiver<Frame>,
    }

    enum Script {
        /// Open a socket and hand its remote side to the test.
        Open,
        /// Fail the dial.
        Refuse,
        /// Hold the dial until released.
        Hang(oneshot::Receiver<()>),
    }

    /// Counts a dial as live until its future completes or is dropped.
    struct LiveDial<'a>(&'a AtomicUsize);

    impl Drop for LiveDial<'_> {
        fn drop(&mut self) {
            let _ = self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct MockConnector {
        dials: AtomicUsize,
        live: AtomicUsize,
        urls: Mutex<Vec<Url>>,
        script: Mutex<Vec<Script>>,
        remotes: Mutex<Vec<Remote>>,
    }

    impl MockConnector {
        fn scripted(script: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                ..Self::default()
            })
        }

        fn dials(&self) -> usize {
            self.dials.load(Ordering::SeqCst)
        }

        fn live(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }

        fn take_remote(&self) -> Remote {
            self.remotes.lock().remove(0)
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn dial(&self, url: &Url) -> Result<(FrameSink, FrameStream), ConnectionError> {
            let _ = self.dials.fetch_add(1, Ordering::SeqCst);
            let _ = self.live.fetch_add(1, Ordering::SeqCst);
            let _live = LiveDial(&self.live);
            self.urls.lock().push(url.clone());
            let step = {
                let mut script = self.script.lock();
                if script.is_empty() { Script::Open } else { script.remove(0) }
            };
            match step {
                Script::Refuse => return Err(ConnectionError::Dial("refused".into())),
                Script::Hang(release) => {
                    let _ = release.await;
                }
                Script::Open => {}
            }
            let (to_client, client_rx) = fmpsc::unbounded();
            let (client_tx, from_client) = fmpsc::unbounded();
            self.remotes.lock().push(Remote {
                to_client,
                from_client,
            });
            let sink = client_tx.sink_map_err(|e| ConnectionError::Transport(e.to_string()));
            Ok((Box::pin(sink), Box::pin(client_rx)))
        }
    }

    fn manager(connector: Arc<MockConnector>) -> ConnectionManager {
        ConnectionManager::new(connector, ConnectionConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn endpoint_assignment_opens_socket() {
        let connector = MockConnector::scripted(vec![]);
        let conn = manager(connector.clone());
        conn.set_credentials(Some(AuthToken::new("s3cret")), DeviceId::from("dev-1"));
        conn.set_endpoint("wss://viz.example.com/realtime").unwrap();
        assert_eq!(conn.status(), ConnectionStatus::Connecting);

        settle().await;
        assert_eq!(conn.status(), ConnectionStatus::Open);
        assert_eq!(connector.dials(), 1);
        assert_eq!(
            connector.urls.lock()[0].as_str(),
            "wss://viz.example.com/realtime?token=s3cret&device_id=dev-1"
        );
        assert_eq!(
            conn.endpoint().map(|u| u.to_string()),
            Some("wss://viz.example.com/realtime".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_endpoint_rejected() {
        let conn = manager(MockConnector::scripted(vec![]));
        assert_matches!(
            conn.set_endpoint("not a url"),
            Err(ConnectionError::InvalidEndpoint { .. })
        );
        assert_matches!(
            conn.set_endpoint("https://viz.example.com/rt"),
            Err(ConnectionError::InvalidEndpoint { .. })
        );
        assert_eq!(conn.status(), ConnectionStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_while_connecting_is_single_flight() {
        let (release, hold) = oneshot::channel();
        let connector = MockConnector::scripted(vec![Script::Hang(hold)]);
        let conn = manager(connector.clone());
        conn.set_endpoint("ws://localhost:9/rt").unwrap();
        settle().await;
        assert_eq!(conn.status(), ConnectionStatus::Connecting);

        for _ in 0..5 {
            assert!(!conn.connect());
        }
        conn.set_endpoint("ws://localhost:9/other").unwrap();
        settle().await;
        assert_eq!(connector.dials(), 1);

        let _ = release.send(());
        settle().await;
        assert_eq!(conn.status(), ConnectionStatus::Open);
        assert!(!conn.connect());
        assert_eq!(connector.dials(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_close_reconnects_after_exactly_delay() {
        let connector = MockConnector::scripted(vec![]);
        let conn = manager(connector.clone());
        conn.set_endpoint("ws://localhost:9/rt").unwrap();
        settle().await;
        assert_eq!(conn.status(), ConnectionStatus::Open);

        drop(connector.take_remote());
        settle().await;
        assert_eq!(conn.status(), ConnectionStatus::Closed);
        assert!(conn.reconnect_pending());

        tokio::time::sleep(Duration::from_millis(2999)).await;
        settle().await;
        assert_eq!(connector.dials(), 1);

        tokio::time::sleep(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(connector.dials(), 2);
        assert_eq!(conn.status(), ConnectionStatus::Open);

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(connector.dials(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn error_then_close_schedules_one_timer() {
        let connector = MockConnector::scripted(vec![]);
        let conn = manager(connector.clone());
        conn.set_endpoint("ws://localhost:9/rt").unwrap();
        settle().await;

        let remote = connector.take_remote();
        remote
            .to_client
            .unbounded_send(Err(ConnectionError::Transport("reset".into())))
            .unwrap();
        drop(remote);
        settle().await;

        assert_eq!(conn.stats().reconnects_scheduled, 1);
        tokio::time::sleep(DEFAULT_RECONNECT_DELAY).await;
        settle().await;
        assert_eq!(connector.dials(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_dial_failures_never_stack_timers() {
        let connector = MockConnector::scripted(vec![
            Script::Refuse,
            Script::Refuse,
            Script::Refuse,
        ]);
        let conn = manager(connector.clone());
        conn.set_endpoint("ws://localhost:9/rt").unwrap();
        settle().await;
        assert_eq!(conn.status(), ConnectionStatus::Closed);

        // Failures inside the backoff window do not arm a second timer.
        assert!(conn.connect());
        settle().await;
        assert_eq!(connector.dials(), 2);
        assert_eq!(conn.stats().reconnects_scheduled, 1);

        tokio::time::sleep(DEFAULT_RECONNECT_DELAY).await;
        settle().await;
        assert_eq!(connector.dials(), 3);
        assert_eq!(conn.stats().reconnects_scheduled, 2);

        tokio::time::sleep(DEFAULT_RECONNECT_DELAY).await;
        settle().await;
        assert_eq!(connector.dials(), 4);
        assert_eq!(conn.status(), ConnectionStatus::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_cancels_reconnect_and_ignores_old_socket() {
        let connector = MockConnector::scripted(vec![]);
        let conn = manager(connector.clone());
        let mut inbound = conn.subscribe();
        conn.set_endpoint("ws://localhost:9/rt").unwrap();
        settle().await;
        let remote = connector.take_remote();

        conn.clear();
        assert_eq!(conn.status(), ConnectionStatus::Idle);
        assert!(conn.endpoint().is_none());

        // Late traffic from the torn-down socket is ignored.
        let _ = remote.to_client.unbounded_send(Ok(Frame::text("stale")));
        drop(remote);
        settle().await;
        assert_eq!(conn.status(), ConnectionStatus::Idle);
        assert!(!conn.reconnect_pending());
        assert!(inbound.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(connector.dials(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_abandons_hanging_dial() {
        let (first_release, first_hold) = oneshot::channel();
        let (_second_release, second_hold) = oneshot::channel();
        let connector =
            MockConnector::scripted(vec![Script::Hang(first_hold), Script::Hang(second_hold)]);
        let conn = manager(connector.clone());

        conn.set_endpoint("ws://localhost:9/rt").unwrap();
        settle().await;
        assert_eq!(connector.live(), 1);

        conn.clear();
        settle().await;
        assert_eq!(connector.live(), 0);

        conn.set_endpoint("ws://localhost:9/rt").unwrap();
        settle().await;
        assert_eq!(connector.dials(), 2);
        assert_eq!(connector.live(), 1);
        assert_eq!(conn.status(), ConnectionStatus::Connecting);

        // Releasing the abandoned dial opens nothing.
        let _ = first_release.send(());
        settle().await;
        assert!(connector.remotes.lock().is_empty());
        assert_eq!(conn.status(), ConnectionStatus::Connecting);
        assert_eq!(conn.stats().opened, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_during_backoff_cancels_timer() {
        let connector = MockConnector::scripted(vec![Script::Refuse]);
        let conn = manager(connector.clone());
        conn.set_endpoint("ws://localhost:9/rt").unwrap();
        settle().await;
        assert!(conn.reconnect_pending());

        conn.clear();
        assert!(!conn.reconnect_pending());
        tokio::time::sleep(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(connector.dials(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn frames_flow_both_ways_in_order() {
        let connector = MockConnector::scripted(vec![]);
        let conn = manager(connector.clone());
        let mut inbound = conn.subscribe();

        assert_matches!(conn.send(Frame::text("early")), Err(ConnectionError::NotOpen));

        conn.set_endpoint("ws://localhost:9/rt").unwrap();
        settle().await;
        let mut remote = connector.take_remote();

        for i in 0..3 {
            conn.send(Frame::text(format!("out-{i}"))).unwrap();
        }
        remote.to_client.unbounded_send(Ok(Frame::text("in-0"))).unwrap();
        remote
            .to_client
            .unbounded_send(Ok(Frame::Binary(bytes::Bytes::from_static(b"\x01"))))
            .unwrap();
        settle().await;

        for i in 0..3 {
            assert_eq!(
                remote.from_client.next().await,
                Some(Frame::text(format!("out-{i}")))
            );
        }
        assert_eq!(inbound.try_recv().unwrap(), Frame::text("in-0"));
        assert_eq!(
            inbound.try_recv().unwrap(),
            Frame::Binary(bytes::Bytes::from_static(b"\x01"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn status_watch_sees_transitions() {
        let connector = MockConnector::scripted(vec![]);
        let conn = manager(connector.clone());
        let mut status = conn.watch_status();
        assert_eq!(*status.borrow_and_update(), ConnectionStatus::Idle);

        conn.set_endpoint("ws://localhost:9/rt").unwrap();
        settle().await;
        assert!(status.has_changed().unwrap());
        assert_eq!(*status.borrow_and_update(), ConnectionStatus::Open);
    }

    #[test]
    fn dial_url_keeps_existing_query() {
        let endpoint = Url::parse("wss://h.example/rt?v=2").unwrap();
        let url = dial_url(&endpoint, None, &DeviceId::from("d"));
        assert_eq!(url.as_str(), "wss://h.example/rt?v=2&device_id=d");
    }

    #[test]
    fn auth_token_debug_is_redacted() {
        let token = AuthToken::new("s3cret");
        assert!(!format!("{token:?}").contains("s3cret"));
        assert_eq!(token.expose(), "s3cret");
    }
}
