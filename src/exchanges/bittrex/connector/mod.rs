use crate::core::errors::ExchangeError;
use crate::core::kernel::bootstrap::ChallengeSolver;
use crate::core::kernel::ws::HubTransport;
use crate::core::kernel::RestClient;
use crate::exchanges::bittrex::session::{ConnectionState, SessionResult, StreamingSession};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

pub mod account;
pub mod market_data;
pub mod trading;

pub use account::Account;
pub use market_data::MarketData;
pub use trading::Trading;

/// Composition root: public-call, private-call and streaming-subscribe
/// operations built on the kernel components.
///
/// REST sub-components share one stateless invoker and may run concurrently;
/// the streaming session exclusively owns the single physical channel.
pub struct BittrexConnector<R: RestClient, T, S> {
    pub market: MarketData<R>,
    pub trading: Trading<R>,
    pub account: Account<R>,
    pub session: StreamingSession<T, S>,
    rest: R,
}

impl<R, T, S> BittrexConnector<R, T, S>
where
    R: RestClient + Clone,
    T: HubTransport + Send + 'static,
    S: ChallengeSolver + Send + 'static,
{
    pub fn new(rest: R, base_url_v2: String, session: StreamingSession<T, S>) -> Self {
        Self {
            market: MarketData::new(rest.clone(), base_url_v2),
            trading: Trading::new(rest.clone()),
            account: Account::new(rest.clone()),
            session,
            rest,
        }
    }

    /// Issue a GET against an arbitrary request string, optionally signed.
    /// Escape hatch for endpoints without a typed wrapper.
    pub async fn send_custom_request(
        &self,
        request_string: &str,
        authenticated: bool,
    ) -> Result<Value, ExchangeError> {
        self.rest.get_url(request_string, &[], authenticated).await
    }

    /// Subscribe to exchange deltas for the given markets.
    ///
    /// Idempotent with respect to the physical channel: repeated calls share
    /// the one connection, and the registered markets are replayed after
    /// every reconnect.
    pub fn subscribe_exchange_deltas(
        &self,
        markets: &[impl AsRef<str> + Send + Sync],
    ) -> UnboundedReceiver<SessionResult> {
        self.session.subscribe(markets)
    }

    /// Listen to every frame on the streaming channel without subscribing
    /// to any market.
    pub fn listen(&self) -> UnboundedReceiver<SessionResult> {
        self.session.listen()
    }

    /// Current streaming channel state.
    pub fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Stop the streaming session, abandoning any reconnect attempts.
    pub fn stop_streaming(&self) {
        self.session.stop();
    }
}
