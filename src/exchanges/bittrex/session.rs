use crate::core::errors::ExchangeError;
use crate::core::kernel::bootstrap::ChallengeSolver;
use crate::core::kernel::ws::{HubTransport, RetryPolicy};
use crate::core::types::SessionEvent;
use crate::exchanges::bittrex::dispatcher;
use serde_json::json;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Hub invocation issued once per market on every (re)connect.
const SUBSCRIBE_METHOD: &str = "SubscribeToExchangeDeltas";

/// Lifecycle of the single physical channel. Owned exclusively by
/// [`StreamingSession`]; observable, never externally mutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// What listeners receive: decoded events on the message lane, per-frame
/// parse failures on the rejection lane. A rejection never terminates the
/// session or drops the listener registration.
pub type SessionResult = Result<SessionEvent, ExchangeError>;

type Hook = Arc<dyn Fn() + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&ExchangeError) + Send + Sync>;
type ReconnectHook = Arc<dyn Fn(u32) -> bool + Send + Sync>;

/// Override hooks for connection lifecycle events.
///
/// Defaults log through `tracing` and keep retrying; `reconnecting` may veto
/// further retries by returning `false`.
#[derive(Clone)]
pub struct SessionHooks {
    pub bound: Hook,
    pub connect_failed: ErrorHook,
    pub disconnected: Hook,
    pub error: ErrorHook,
    pub binding_error: ErrorHook,
    pub connection_lost: ErrorHook,
    pub reconnecting: ReconnectHook,
}

impl Default for SessionHooks {
    fn default() -> Self {
        Self {
            bound: Arc::new(|| debug!("websocket bound")),
            connect_failed: Arc::new(|e| warn!(error = %e, "websocket connect failed")),
            disconnected: Arc::new(|| debug!("websocket disconnected")),
            error: Arc::new(|e| warn!(error = %e, "websocket error")),
            binding_error: Arc::new(|e| warn!(error = %e, "websocket binding error")),
            connection_lost: Arc::new(|e| warn!(error = %e, "connection lost")),
            reconnecting: Arc::new(|attempt| {
                debug!(attempt, "websocket retrying");
                true
            }),
        }
    }
}

impl fmt::Debug for SessionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHooks").finish_non_exhaustive()
    }
}

impl SessionHooks {
    pub fn with_bound(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.bound = Arc::new(hook);
        self
    }

    pub fn with_connect_failed(
        mut self,
        hook: impl Fn(&ExchangeError) + Send + Sync + 'static,
    ) -> Self {
        self.connect_failed = Arc::new(hook);
        self
    }

    pub fn with_disconnected(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.disconnected = Arc::new(hook);
        self
    }

    pub fn with_error(mut self, hook: impl Fn(&ExchangeError) + Send + Sync + 'static) -> Self {
        self.error = Arc::new(hook);
        self
    }

    pub fn with_binding_error(
        mut self,
        hook: impl Fn(&ExchangeError) + Send + Sync + 'static,
    ) -> Self {
        self.binding_error = Arc::new(hook);
        self
    }

    pub fn with_connection_lost(
        mut self,
        hook: impl Fn(&ExchangeError) + Send + Sync + 'static,
    ) -> Self {
        self.connection_lost = Arc::new(hook);
        self
    }

    /// Decide whether to keep retrying; return `false` to stop.
    pub fn with_reconnecting(mut self, hook: impl Fn(u32) -> bool + Send + Sync + 'static) -> Self {
        self.reconnecting = Arc::new(hook);
        self
    }
}

/// Session wiring that is not transport-specific.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Page fetched through the challenge solver before the handshake.
    pub root_url: String,
    /// Hub receiving subscribe invocations.
    pub hub: String,
}

enum Command {
    Subscribe(Vec<String>),
}

struct SessionShared {
    config: SessionConfig,
    hooks: SessionHooks,
    retry: RetryPolicy,
    state: Mutex<ConnectionState>,
    markets: Mutex<BTreeSet<String>>,
    listeners: Mutex<Vec<UnboundedSender<SessionResult>>>,
}

impl SessionShared {
    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = state;
        debug!(?state, "session state");
    }

    fn fan_out(&self, result: &SessionResult) {
        self.listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .retain(|tx| tx.send(result.clone()).is_ok());
    }
}

/// Owner of the single persistent hub channel: bootstrap, subscription
/// replay and reconnection policy.
///
/// The physical transport lives inside one spawned driver task; at most one
/// physical channel exists per session, no matter how many times
/// [`subscribe`](Self::subscribe) or [`listen`](Self::listen) is called.
/// Subscriptions are state of intent: they survive the physical connection
/// and are replayed after every successful (re)connect.
pub struct StreamingSession<T, S> {
    shared: Arc<SessionShared>,
    cmd_tx: UnboundedSender<Command>,
    stop_tx: watch::Sender<bool>,
    started: AtomicBool,
    boot: Mutex<Option<Boot<T, S>>>,
}

struct Boot<T, S> {
    transport: T,
    solver: S,
    cmd_rx: UnboundedReceiver<Command>,
    stop_rx: watch::Receiver<bool>,
}

impl<T, S> fmt::Debug for StreamingSession<T, S>
where
    T: HubTransport + Send + 'static,
    S: ChallengeSolver + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingSession")
            .field("state", &self.state())
            .field("started", &self.started.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<T, S> StreamingSession<T, S>
where
    T: HubTransport + Send + 'static,
    S: ChallengeSolver + Send + 'static,
{
    pub fn new(
        transport: T,
        solver: S,
        config: SessionConfig,
        hooks: SessionHooks,
        retry: RetryPolicy,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        Self {
            shared: Arc::new(SessionShared {
                config,
                hooks,
                retry,
                state: Mutex::new(ConnectionState::Disconnected),
                markets: Mutex::new(BTreeSet::new()),
                listeners: Mutex::new(Vec::new()),
            }),
            cmd_tx,
            stop_tx,
            started: AtomicBool::new(false),
            boot: Mutex::new(Some(Boot {
                transport,
                solver,
                cmd_rx,
                stop_rx,
            })),
        }
    }

    /// Current channel lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self
            .shared
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Register markets for exchange-delta subscriptions and start the
    /// channel if it is not already running.
    ///
    /// Newly-registered markets on a live connection are subscribed
    /// immediately; all registered markets are replayed after every
    /// reconnect. The returned receiver yields every fanned-out event.
    pub fn subscribe(
        &self,
        markets: &[impl AsRef<str> + Send + Sync],
    ) -> UnboundedReceiver<SessionResult> {
        let added: Vec<String> = {
            let mut registered = self
                .shared
                .markets
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            markets
                .iter()
                .map(|m| m.as_ref().to_string())
                .filter(|m| registered.insert(m.clone()))
                .collect()
        };

        let rx = self.listen();
        if !added.is_empty() {
            let _ = self.cmd_tx.send(Command::Subscribe(added));
        }
        rx
    }

    /// Attach a listener to the message fan-out without registering any
    /// market, starting the channel if needed.
    pub fn listen(&self) -> UnboundedReceiver<SessionResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(tx);
        self.ensure_started();
        rx
    }

    /// Signal the driver to stop; pending reconnect attempts are abandoned
    /// and the state settles at `Disconnected`.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Spawn the driver exactly once. Calling this while a connection is
    /// already open or in flight reuses the existing channel.
    fn ensure_started(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let boot = self
            .boot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(boot) = boot {
            let shared = Arc::clone(&self.shared);
            tokio::spawn(drive(shared, boot));
        }
    }
}

impl<T, S> Drop for StreamingSession<T, S> {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}

enum ExitReason {
    Stopped,
    ConnectionLost(Option<ExchangeError>),
}

enum Step {
    Stop,
    Command(Option<Command>),
    Frame(Option<Result<String, ExchangeError>>),
}

async fn drive<T, S>(shared: Arc<SessionShared>, boot: Boot<T, S>)
where
    T: HubTransport,
    S: ChallengeSolver,
{
    let Boot {
        mut transport,
        solver,
        mut cmd_rx,
        mut stop_rx,
    } = boot;

    let mut attempt: u32 = 0;
    let mut first = true;

    loop {
        if *stop_rx.borrow() {
            break;
        }
        shared.set_state(if first {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting
        });
        first = false;

        match establish(&shared, &mut transport, &solver).await {
            Ok(()) => {
                shared.set_state(ConnectionState::Connected);
                (shared.hooks.bound)();
                attempt = 0;

                // Replay intent: one invocation per registered market.
                let mut active = BTreeSet::new();
                let registered: Vec<String> = shared
                    .markets
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .iter()
                    .cloned()
                    .collect();
                for market in &registered {
                    subscribe_market(&shared, &mut transport, &mut active, market).await;
                }

                match run_connected(&shared, &mut transport, &mut cmd_rx, &mut stop_rx, &mut active)
                    .await
                {
                    ExitReason::Stopped => break,
                    ExitReason::ConnectionLost(cause) => {
                        (shared.hooks.disconnected)();
                        if let Some(e) = cause {
                            (shared.hooks.connection_lost)(&e);
                        }
                    }
                }
            }
            Err(e) => {
                (shared.hooks.connect_failed)(&e);
            }
        }

        if *stop_rx.borrow() {
            break;
        }
        if shared.retry.is_exhausted(attempt) {
            let e = ExchangeError::ChannelError(format!(
                "Failed to reconnect after {} attempts",
                attempt
            ));
            (shared.hooks.error)(&e);
            break;
        }
        if !(shared.hooks.reconnecting)(attempt) {
            debug!(attempt, "retry vetoed by reconnecting hook");
            break;
        }

        let delay = shared.retry.delay_for(attempt);
        attempt += 1;
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = stop_rx.changed() => {}
        }
    }

    let _ = transport.close().await;
    shared.set_state(ConnectionState::Disconnected);
}

/// Bootstrap through the anti-bot challenge, then open the channel with the
/// captured headers.
async fn establish<T, S>(
    shared: &SessionShared,
    transport: &mut T,
    solver: &S,
) -> Result<(), ExchangeError>
where
    T: HubTransport,
    S: ChallengeSolver,
{
    let headers = solver.solve(&shared.config.root_url).await?;
    transport.connect(&headers).await
}

/// Issue one subscribe invocation, tracking it against this connection.
/// A failed market logs and reports, but never blocks the others.
async fn subscribe_market<T>(
    shared: &SessionShared,
    transport: &mut T,
    active: &mut BTreeSet<String>,
    market: &str,
) where
    T: HubTransport,
{
    if active.contains(market) {
        return;
    }
    match transport
        .invoke(&shared.config.hub, SUBSCRIBE_METHOD, vec![json!(market)])
        .await
    {
        Ok(()) => {
            debug!(market, "subscribed to exchange deltas");
            active.insert(market.to_string());
        }
        Err(e) => {
            warn!(market, error = %e, "failed to subscribe");
            (shared.hooks.binding_error)(&e);
        }
    }
}

async fn run_connected<T>(
    shared: &SessionShared,
    transport: &mut T,
    cmd_rx: &mut UnboundedReceiver<Command>,
    stop_rx: &mut watch::Receiver<bool>,
    active: &mut BTreeSet<String>,
) -> ExitReason
where
    T: HubTransport,
{
    loop {
        let step = tokio::select! {
            _ = stop_rx.changed() => Step::Stop,
            cmd = cmd_rx.recv() => Step::Command(cmd),
            frame = transport.next_frame() => Step::Frame(frame),
        };

        match step {
            Step::Stop => {
                if *stop_rx.borrow() {
                    return ExitReason::Stopped;
                }
            }
            Step::Command(Some(Command::Subscribe(markets))) => {
                for market in markets {
                    subscribe_market(shared, transport, active, &market).await;
                }
            }
            // The session handle is gone; nobody can register listeners or
            // markets anymore.
            Step::Command(None) => return ExitReason::Stopped,
            Step::Frame(Some(Ok(raw))) => {
                let dispatched = dispatcher::dispatch(&raw, |event| shared.fan_out(&Ok(event)));
                if let Err(e) = dispatched {
                    // Rejection lane: the bad frame is reported, the
                    // session and listener registrations stay intact.
                    (shared.hooks.error)(&e);
                    shared.fan_out(&Err(e));
                }
            }
            Step::Frame(Some(Err(e))) => return ExitReason::ConnectionLost(Some(e)),
            Step::Frame(None) => return ExitReason::ConnectionLost(None),
        }
    }
}
