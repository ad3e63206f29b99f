use async_trait::async_trait;
use bittrex_connector::core::errors::ExchangeError;
use bittrex_connector::core::kernel::bootstrap::{BootstrapHeaders, ChallengeSolver};
use bittrex_connector::core::kernel::ws::{HubTransport, RetryPolicy};
use bittrex_connector::core::types::SessionEvent;
use bittrex_connector::exchanges::bittrex::session::{
    ConnectionState, SessionConfig, SessionHooks, StreamingSession,
};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// One scripted physical connection: the frames it yields, and whether it
/// closes once they are drained.
struct ScriptedConnection {
    frames: VecDeque<String>,
    drop_when_drained: bool,
}

impl ScriptedConnection {
    fn pending() -> Self {
        Self {
            frames: VecDeque::new(),
            drop_when_drained: false,
        }
    }

    fn dying(frames: &[&str]) -> Self {
        Self {
            frames: frames.iter().map(|f| (*f).to_string()).collect(),
            drop_when_drained: true,
        }
    }

    fn live(frames: &[&str]) -> Self {
        Self {
            frames: frames.iter().map(|f| (*f).to_string()).collect(),
            drop_when_drained: false,
        }
    }
}

#[derive(Default)]
struct MockState {
    connect_calls: usize,
    solve_calls: usize,
    invokes: Vec<(String, String, String)>,
    fail_markets: HashSet<String>,
    connections: Vec<ScriptedConnection>,
}

struct MockTransport {
    state: Arc<Mutex<MockState>>,
    conn: usize,
}

enum FrameAction {
    Frame(String),
    Close,
    Pend,
}

#[async_trait]
impl HubTransport for MockTransport {
    async fn connect(&mut self, _headers: &BootstrapHeaders) -> Result<(), ExchangeError> {
        let mut state = self.state.lock().unwrap();
        self.conn = state.connect_calls;
        state.connect_calls += 1;
        Ok(())
    }

    async fn invoke(
        &mut self,
        hub: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<(), ExchangeError> {
        let market = args
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut state = self.state.lock().unwrap();
        state
            .invokes
            .push((hub.to_string(), method.to_string(), market.clone()));
        if state.fail_markets.contains(&market) {
            return Err(ExchangeError::ChannelError(format!(
                "subscribe rejected for {market}"
            )));
        }
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<Result<String, ExchangeError>> {
        let action = {
            let mut state = self.state.lock().unwrap();
            match state.connections.get_mut(self.conn) {
                Some(conn) => conn.frames.pop_front().map_or(
                    if conn.drop_when_drained {
                        FrameAction::Close
                    } else {
                        FrameAction::Pend
                    },
                    FrameAction::Frame,
                ),
                None => FrameAction::Pend,
            }
        };

        match action {
            FrameAction::Frame(frame) => Some(Ok(frame)),
            FrameAction::Close => None,
            FrameAction::Pend => {
                std::future::pending::<()>().await;
                None
            }
        }
    }

    async fn close(&mut self) -> Result<(), ExchangeError> {
        Ok(())
    }
}

struct MockSolver {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl ChallengeSolver for MockSolver {
    async fn solve(&self, _url: &str) -> Result<BootstrapHeaders, ExchangeError> {
        self.state.lock().unwrap().solve_calls += 1;
        Ok(BootstrapHeaders {
            cookie: "__cfduid=abc".to_string(),
            user_agent: "test-agent".to_string(),
        })
    }
}

/// Challenge solver that never succeeds, for exercising the retry cap.
struct FailingSolver {
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl ChallengeSolver for FailingSolver {
    async fn solve(&self, _url: &str) -> Result<BootstrapHeaders, ExchangeError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ExchangeError::ChannelError("challenge failed".to_string()))
    }
}

/// Route session `tracing` output through the test harness capture.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn session_config() -> SessionConfig {
    SessionConfig {
        root_url: "https://bittrex.test/".to_string(),
        hub: "CoreHub".to_string(),
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::default().with_initial_delay(Duration::from_millis(1))
}

fn scripted_session(
    connections: Vec<ScriptedConnection>,
    fail_markets: &[&str],
    hooks: SessionHooks,
    retry: RetryPolicy,
) -> (
    StreamingSession<MockTransport, MockSolver>,
    Arc<Mutex<MockState>>,
) {
    init_tracing();
    let state = Arc::new(Mutex::new(MockState {
        fail_markets: fail_markets.iter().map(|m| (*m).to_string()).collect(),
        connections,
        ..MockState::default()
    }));
    let transport = MockTransport {
        state: Arc::clone(&state),
        conn: 0,
    };
    let solver = MockSolver {
        state: Arc::clone(&state),
    };
    let session = StreamingSession::new(transport, solver, session_config(), hooks, retry);
    (session, state)
}

/// Poll until `predicate` holds, failing the test after two seconds.
async fn wait_until(mut predicate: impl FnMut() -> bool, what: &str) {
    let deadline = timeout(Duration::from_secs(2), async {
        while !predicate() {
            sleep(Duration::from_millis(5)).await;
        }
    });
    assert!(deadline.await.is_ok(), "timed out waiting for: {what}");
}

const DELTA_FRAME: &str = r#"{"C":"d-1","M":[{"H":"CoreHub","M":"updateExchangeState","A":[{"MarketName":"BTC-ETH"}]}]}"#;

#[tokio::test]
async fn repeated_subscribes_share_one_physical_connection() {
    let (session, state) = scripted_session(
        vec![ScriptedConnection::pending()],
        &[],
        SessionHooks::default(),
        fast_retry(),
    );

    let _rx_a = session.subscribe(&["BTC-ETH"]);
    let _rx_b = session.subscribe(&["BTC-ETH"]);

    wait_until(
        || !state.lock().unwrap().invokes.is_empty(),
        "subscribe invocation",
    )
    .await;
    // Give a second connection the chance to show up if one were coming.
    sleep(Duration::from_millis(50)).await;

    let state = state.lock().unwrap();
    assert_eq!(state.connect_calls, 1);
    assert_eq!(state.solve_calls, 1);
    assert_eq!(
        state.invokes,
        vec![(
            "CoreHub".to_string(),
            "SubscribeToExchangeDeltas".to_string(),
            "BTC-ETH".to_string()
        )]
    );
    assert_eq!(session.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn registered_markets_are_replayed_after_reconnect() {
    let (session, state) = scripted_session(
        vec![
            ScriptedConnection::dying(&[]),
            ScriptedConnection::pending(),
        ],
        &[],
        SessionHooks::default(),
        fast_retry(),
    );

    let _rx = session.subscribe(&["BTC-ETH", "BTC-LTC"]);

    wait_until(
        || {
            let state = state.lock().unwrap();
            state.connect_calls == 2 && state.invokes.len() == 4
        },
        "both markets replayed on the second connection",
    )
    .await;

    let state = state.lock().unwrap();
    for market in ["BTC-ETH", "BTC-LTC"] {
        let count = state.invokes.iter().filter(|(_, _, m)| m == market).count();
        assert_eq!(count, 2, "{market} should be subscribed once per connection");
    }
    assert!(state
        .invokes
        .iter()
        .all(|(hub, method, _)| hub == "CoreHub" && method == "SubscribeToExchangeDeltas"));
    assert_eq!(session.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn one_failing_market_does_not_block_the_others() {
    let binding_errors = Arc::new(AtomicUsize::new(0));
    let hooks = {
        let binding_errors = Arc::clone(&binding_errors);
        SessionHooks::default().with_binding_error(move |_| {
            binding_errors.fetch_add(1, Ordering::SeqCst);
        })
    };
    let (session, state) = scripted_session(
        vec![ScriptedConnection::pending()],
        &["BTC-BAD"],
        hooks,
        fast_retry(),
    );

    let _rx = session.subscribe(&["BTC-BAD", "BTC-ETH"]);

    // Replay tries both; the queued subscribe command retries only the
    // market that was never acknowledged.
    wait_until(
        || state.lock().unwrap().invokes.len() == 3,
        "replay plus one retry of the rejected market",
    )
    .await;

    let state = state.lock().unwrap();
    let count = |market: &str| state.invokes.iter().filter(|(_, _, m)| m == market).count();
    assert_eq!(count("BTC-ETH"), 1, "accepted market is never re-sent");
    assert_eq!(count("BTC-BAD"), 2);
    assert_eq!(binding_errors.load(Ordering::SeqCst), 2);
    // The rejected market never takes the session down.
    assert_eq!(session.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn frames_fan_out_and_bad_frames_use_the_rejection_lane() {
    let (session, _state) = scripted_session(
        vec![ScriptedConnection::live(&[
            DELTA_FRAME,
            "not json at all",
            DELTA_FRAME,
        ])],
        &[],
        SessionHooks::default(),
        fast_retry(),
    );

    let mut rx = session.subscribe(&["BTC-ETH"]);

    let first = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    match first {
        Some(Ok(SessionEvent::Delta(invocation))) => {
            assert_eq!(invocation.method, "updateExchangeState");
            assert_eq!(invocation.args[0]["MarketName"], "BTC-ETH");
        }
        other => panic!("expected delta event, got {other:?}"),
    }

    let second = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    match second {
        Some(Err(ExchangeError::ParseError(_))) => {}
        other => panic!("expected parse rejection, got {other:?}"),
    }

    // The bad frame was isolated: the stream keeps flowing.
    let third = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    assert!(matches!(third, Some(Ok(SessionEvent::Delta(_)))));
    assert_eq!(session.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn stop_settles_the_session_disconnected() {
    let (session, state) = scripted_session(
        vec![ScriptedConnection::pending()],
        &[],
        SessionHooks::default(),
        fast_retry(),
    );

    let _rx = session.listen();
    wait_until(
        || session.state() == ConnectionState::Connected,
        "initial connect",
    )
    .await;

    session.stop();
    wait_until(
        || session.state() == ConnectionState::Disconnected,
        "disconnect after stop",
    )
    .await;
    assert_eq!(state.lock().unwrap().connect_calls, 1);
}

#[tokio::test]
async fn reconnecting_hook_can_veto_retries() {
    let hooks = SessionHooks::default().with_reconnecting(|_| false);
    let (session, state) = scripted_session(
        vec![
            ScriptedConnection::dying(&[]),
            ScriptedConnection::pending(),
        ],
        &[],
        hooks,
        fast_retry(),
    );

    let _rx = session.listen();
    wait_until(
        || session.state() == ConnectionState::Disconnected,
        "session settles after vetoed retry",
    )
    .await;

    assert_eq!(state.lock().unwrap().connect_calls, 1);
}

#[tokio::test]
async fn capped_retry_policy_gives_up_with_an_error() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let hooks = {
        let errors = Arc::clone(&errors);
        SessionHooks::default().with_error(move |_| {
            errors.fetch_add(1, Ordering::SeqCst);
        })
    };

    init_tracing();
    let state = Arc::new(Mutex::new(MockState::default()));
    let transport = MockTransport {
        state: Arc::clone(&state),
        conn: 0,
    };
    let solver = FailingSolver {
        attempts: Arc::clone(&attempts),
    };
    let session = StreamingSession::new(
        transport,
        solver,
        session_config(),
        hooks,
        fast_retry().with_max_attempts(2),
    );

    let _rx = session.listen();
    wait_until(
        || session.state() == ConnectionState::Disconnected && errors.load(Ordering::SeqCst) == 1,
        "session gives up after the retry cap",
    )
    .await;

    // Initial attempt plus two retries, then the policy is exhausted.
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(state.lock().unwrap().connect_calls, 0);
}
