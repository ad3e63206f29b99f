use crate::core::config::BittrexConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::bootstrap::CloudflareSolver;
use crate::core::kernel::ws::{RetryPolicy, SignalRWs};
use crate::core::kernel::{ReqwestRest, RestClientBuilder, RestClientConfig, DEFAULT_USER_AGENT};
use crate::exchanges::bittrex::connector::BittrexConnector;
use crate::exchanges::bittrex::session::{SessionConfig, SessionHooks, StreamingSession};
use crate::exchanges::bittrex::signer::BittrexSigner;
use std::sync::Arc;

const EXCHANGE_NAME: &str = "bittrex";

/// Fully-wired connector type produced by the builders.
pub type DefaultConnector = BittrexConnector<ReqwestRest, SignalRWs, CloudflareSolver>;

/// Create a connector with default lifecycle hooks and retry policy.
pub fn build_connector(config: BittrexConfig) -> Result<DefaultConnector, ExchangeError> {
    build_connector_with_hooks(config, SessionHooks::default(), RetryPolicy::default())
}

/// Create a connector with caller-supplied lifecycle hooks and retry policy.
///
/// The configuration snapshot is consumed here; components never share
/// mutable options afterwards.
pub fn build_connector_with_hooks(
    config: BittrexConfig,
    hooks: SessionHooks,
    retry: RetryPolicy,
) -> Result<DefaultConnector, ExchangeError> {
    let rest_config = RestClientConfig::new(config.base_url.clone(), EXCHANGE_NAME.to_string())
        .with_verbose(config.verbose);

    let mut rest_builder = RestClientBuilder::new(rest_config);
    if config.has_credentials() {
        let signer = Arc::new(BittrexSigner::new(
            config.api_key().to_string(),
            config.api_secret().to_string(),
        ));
        rest_builder = rest_builder.with_signer(signer);
    }
    let rest = rest_builder.build()?;

    let transport = SignalRWs::new(
        config.ws_url.clone(),
        config.ws_hubs.clone(),
        EXCHANGE_NAME.to_string(),
    );
    let solver = CloudflareSolver::new(DEFAULT_USER_AGENT.to_string())?;
    let session_config = SessionConfig {
        root_url: config.root_url.clone(),
        hub: config
            .ws_hubs
            .first()
            .cloned()
            .unwrap_or_else(|| "CoreHub".to_string()),
    };
    let session = StreamingSession::new(transport, solver, session_config, hooks, retry);

    Ok(BittrexConnector::new(
        rest,
        config.base_url_v2.clone(),
        session,
    ))
}
