use crate::core::errors::ExchangeError;
use crate::core::kernel::bootstrap::BootstrapHeaders;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, USER_AGENT};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{instrument, warn};

/// Retry policy for the streaming reconnect loop.
///
/// The default preserves the historical behavior: retry forever with
/// exponential backoff. Callers that need a cap set `max_attempts`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum consecutive failed attempts before giving up; `None` retries
    /// indefinitely.
    pub max_attempts: Option<u32>,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Cap the number of consecutive reconnect attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Set the delay before the first retry.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Whether `attempt` consecutive failures exhaust the policy.
    #[must_use]
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }

    /// Backoff delay for the given zero-based attempt number.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Persistent bidirectional hub channel - pure transport layer.
///
/// Sends typed invocations and yields raw inbound frames; frame semantics
/// belong to the exchange-side dispatcher.
#[async_trait]
pub trait HubTransport: Send {
    /// Open the channel, presenting the bootstrap headers during the
    /// handshake. Reconnecting reuses the same transport object.
    async fn connect(&mut self, headers: &BootstrapHeaders) -> Result<(), ExchangeError>;

    /// Send a client-to-server method invocation against a hub.
    async fn invoke(
        &mut self,
        hub: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<(), ExchangeError>;

    /// Receive the next raw text frame. `None` means the connection closed.
    async fn next_frame(&mut self) -> Option<Result<String, ExchangeError>>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), ExchangeError>;
}

type WsSink = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;
type WsStream = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
>;

/// Tungstenite-based SignalR hub transport.
///
/// Client-to-server invocations are framed `{"H": hub, "M": method,
/// "A": [...], "I": id}`; inbound frames are surfaced as raw text.
pub struct SignalRWs {
    base_url: String,
    hubs: Vec<String>,
    exchange_name: String,
    connect_timeout: Duration,
    write: Option<WsSink>,
    read: Option<WsStream>,
    connected: bool,
    invocation_id: u64,
}

impl SignalRWs {
    /// Create a new transport for the given SignalR endpoint and hub list.
    pub fn new(base_url: String, hubs: Vec<String>, exchange_name: String) -> Self {
        Self {
            base_url,
            hubs,
            exchange_name,
            connect_timeout: Duration::from_secs(10),
            write: None,
            read: None,
            connected: false,
            invocation_id: 0,
        }
    }

    /// Set the handshake timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Whether the channel is currently open.
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Build the `/connect` URL with the hub registration payload.
    fn connect_url(&self) -> Result<String, ExchangeError> {
        let connection_data = serde_json::to_string(
            &self
                .hubs
                .iter()
                .map(|hub| json!({ "name": hub.to_lowercase() }))
                .collect::<Vec<_>>(),
        )
        .map_err(|e| ExchangeError::ChannelError(format!("Failed to encode hub list: {}", e)))?;

        let mut url = reqwest::Url::parse(&format!("{}/connect", self.base_url))
            .map_err(|e| ExchangeError::ChannelError(format!("Invalid streaming URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("transport", "webSockets")
            .append_pair("clientProtocol", "1.5")
            .append_pair("connectionData", &connection_data);

        Ok(url.to_string())
    }

    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError> {
        if !self.connected {
            return Err(ExchangeError::ChannelError(
                "Hub channel not connected".to_string(),
            ));
        }

        let write = self.write.as_mut().ok_or_else(|| {
            ExchangeError::ChannelError("Hub write stream not available".to_string())
        })?;

        write.send(msg).await.map_err(|e| {
            self.connected = false;
            ExchangeError::ChannelError(format!("Failed to send hub message: {}", e))
        })
    }
}

#[async_trait]
impl HubTransport for SignalRWs {
    #[instrument(skip(self, headers), fields(exchange = %self.exchange_name, url = %self.base_url))]
    async fn connect(&mut self, headers: &BootstrapHeaders) -> Result<(), ExchangeError> {
        let url = self.connect_url()?;
        let mut request = url
            .into_client_request()
            .map_err(|e| ExchangeError::ChannelError(format!("Invalid handshake request: {}", e)))?;

        if !headers.cookie.is_empty() {
            let cookie = HeaderValue::from_str(&headers.cookie).map_err(|e| {
                ExchangeError::ChannelError(format!("Invalid bootstrap cookie: {}", e))
            })?;
            request.headers_mut().insert(COOKIE, cookie);
        }
        if !headers.user_agent.is_empty() {
            let user_agent = HeaderValue::from_str(&headers.user_agent).map_err(|e| {
                ExchangeError::ChannelError(format!("Invalid bootstrap user agent: {}", e))
            })?;
            request.headers_mut().insert(USER_AGENT, user_agent);
        }

        let handshake = tokio::time::timeout(self.connect_timeout, connect_async(request));
        let (ws_stream, _) = handshake
            .await
            .map_err(|_| ExchangeError::ChannelError("Hub handshake timeout".to_string()))?
            .map_err(|e| ExchangeError::ChannelError(format!("Hub handshake failed: {}", e)))?;

        let (write, read) = ws_stream.split();
        self.write = Some(write);
        self.read = Some(read);
        self.connected = true;

        Ok(())
    }

    #[instrument(skip(self, args), fields(exchange = %self.exchange_name, hub = %hub, method = %method))]
    async fn invoke(
        &mut self,
        hub: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<(), ExchangeError> {
        self.invocation_id += 1;
        let frame = json!({
            "H": hub,
            "M": method,
            "A": args,
            "I": self.invocation_id,
        });

        self.send_raw(Message::Text(frame.to_string())).await
    }

    async fn next_frame(&mut self) -> Option<Result<String, ExchangeError>> {
        loop {
            if !self.connected {
                return None;
            }
            let read = self.read.as_mut()?;

            match read.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Ping(data))) => {
                    // Auto-respond to pings at transport level.
                    if let Err(e) = self.send_raw(Message::Pong(data)).await {
                        warn!("Failed to send pong response: {}", e);
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    self.connected = false;
                    return None;
                }
                // The hub protocol is text based; ignore everything else.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.connected = false;
                    return Some(Err(ExchangeError::ChannelError(format!(
                        "Hub channel error: {}",
                        e
                    ))));
                }
                None => {
                    self.connected = false;
                    return None;
                }
            }
        }
    }

    #[instrument(skip(self), fields(exchange = %self.exchange_name))]
    async fn close(&mut self) -> Result<(), ExchangeError> {
        if let Some(write) = self.write.as_mut() {
            let _ = write.send(Message::Close(None)).await;
        }
        self.connected = false;
        self.write = None;
        self.read = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_retries_indefinitely_with_backoff() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_exhausted(1_000_000));
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        // Capped at the ceiling.
        assert_eq!(policy.delay_for(30), Duration::from_secs(60));
    }

    #[test]
    fn capped_policy_exhausts() {
        let policy = RetryPolicy::default().with_max_attempts(3);
        assert!(!policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
    }

    #[test]
    fn connect_url_registers_hubs_lowercase() {
        let ws = SignalRWs::new(
            "wss://socket.bittrex.com/signalr".to_string(),
            vec!["CoreHub".to_string()],
            "bittrex".to_string(),
        );
        let url = ws.connect_url().unwrap();
        assert!(url.starts_with("wss://socket.bittrex.com/signalr/connect?"));
        assert!(url.contains("transport=webSockets"));
        assert!(url.contains("corehub"));
        assert!(!url.contains("CoreHub"));
    }
}
