use crate::core::errors::ExchangeError;
use async_trait::async_trait;
use reqwest::header::SET_COOKIE;
use tracing::{debug, instrument};

/// Headers obtained from the anti-bot challenge; the hub handshake must
/// present these for the connection to be accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapHeaders {
    pub cookie: String,
    pub user_agent: String,
}

/// Anti-bot challenge collaborator: given a URL, return cookies and headers
/// that make subsequent requests pass.
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    async fn solve(&self, url: &str) -> Result<BootstrapHeaders, ExchangeError>;
}

/// Challenge solver that fetches the exchange root page and captures the
/// clearance cookies handed back with the response.
pub struct CloudflareSolver {
    client: reqwest::Client,
    user_agent: String,
}

impl CloudflareSolver {
    pub fn new(user_agent: String) -> Result<Self, ExchangeError> {
        let client = reqwest::Client::builder()
            .user_agent(&user_agent)
            .build()
            .map_err(|e| ExchangeError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, user_agent })
    }
}

#[async_trait]
impl ChallengeSolver for CloudflareSolver {
    #[instrument(skip(self))]
    async fn solve(&self, url: &str) -> Result<BootstrapHeaders, ExchangeError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            ExchangeError::ChannelError(format!("Challenge request failed: {}", e))
        })?;

        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            // Keep the name=value part, drop the cookie attributes.
            .filter_map(|raw| raw.split(';').next())
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("; ");

        debug!(cookie_count = cookie.split("; ").count(), "challenge solved");

        Ok(BootstrapHeaders {
            cookie,
            user_agent: self.user_agent.clone(),
        })
    }
}
