/// Kernel - unified transport layer.
///
/// Exchange-agnostic plumbing for REST and streaming communication. The
/// kernel contains only transport logic and generic interfaces:
///
/// - `RestClient` / `ReqwestRest`: single-GET HTTP invoker with outcome
///   classification
/// - `Signer`: pluggable URI signing, plus the canonical query merge rule
/// - `HubTransport` / `SignalRWs`: persistent hub channel
/// - `ChallengeSolver` / `CloudflareSolver`: anti-bot bootstrap
/// - `RetryPolicy`: reconnect backoff schedule
///
/// Exchange semantics (endpoint shapes, frame dispatch, session policy)
/// live under `exchanges/`.
pub mod bootstrap;
pub mod rest;
pub mod signer;
pub mod ws;

// Re-export key types for convenience
pub use bootstrap::{BootstrapHeaders, ChallengeSolver, CloudflareSolver};
pub use rest::{
    current_nonce, decode_envelope, ReqwestRest, RestClient, RestClientBuilder, RestClientConfig,
    DEFAULT_USER_AGENT,
};
pub use signer::{query, SignedUri, Signer};
pub use ws::{HubTransport, RetryPolicy, SignalRWs};
