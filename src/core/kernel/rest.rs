use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{query, Signer};
use crate::core::types::ApiResponse;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument, trace};

/// REST client trait for issuing exchange calls.
///
/// Every call is a single GET; implementations handle URI assembly, signing
/// and outcome classification.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make a GET request against the configured base URL.
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `query_params` - Query parameters in caller order
    /// * `authenticated` - Whether to sign the request
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, ExchangeError>;

    /// Make a GET request with strongly-typed `result` payload.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<T, ExchangeError>;

    /// Make a GET request against an absolute URL (v2.0 endpoints, custom
    /// request strings).
    async fn get_url(
        &self,
        url: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, ExchangeError>;

    /// Make a GET request against an absolute URL with typed payload.
    async fn get_url_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<T, ExchangeError>;
}

/// User agent presented on every HTTP request, REST and bootstrap alike.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/4.0 (compatible; Bittrex Rust API)";

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
    /// Log wall-clock latency per request
    pub verbose: bool,
}

impl RestClientConfig {
    /// Create a new configuration
    pub fn new(base_url: String, exchange_name: String) -> Self {
        Self {
            base_url,
            exchange_name,
            timeout_seconds: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            verbose: false,
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Enable latency logging
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl RestClientBuilder {
    /// Create a new builder with the given configuration
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            signer: None,
        }
    }

    /// Set the signer for authenticated requests
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Build the REST client
    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| ExchangeError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(ReqwestRest {
            client,
            config: self.config,
            signer: self.signer,
        })
    }
}

/// Implementation of `RestClient` using reqwest.
///
/// Stateless beyond the connection pool: instances may run concurrently
/// without coordination.
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .field("has_signer", &self.signer.is_some())
            .finish_non_exhaustive()
    }
}

/// Get the current nonce: wall-clock time in whole seconds.
///
/// Known limitation: two signed calls within the same second reuse the
/// nonce; a nonce-checking backend may reject the second. Kept as-is for
/// wire compatibility.
pub fn current_nonce() -> Result<u64, ExchangeError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| ExchangeError::Other(format!("Failed to get timestamp: {}", e)))
}

/// Classify a raw HTTP outcome into the result buckets.
///
/// - non-200 status -> `TransportError`
/// - 200 + malformed body -> `ParseError`
/// - 200 + `success: false` -> `ApiError` carrying the payload verbatim
/// - 200 + `success: true` -> `Ok(result)`
pub fn decode_envelope(status: u16, body: &str) -> Result<Value, ExchangeError> {
    if status != 200 {
        return Err(ExchangeError::TransportError {
            status: Some(status),
            message: format!("URL request error: {}", body),
        });
    }

    let envelope: ApiResponse<Value> = serde_json::from_str(body)
        .map_err(|e| ExchangeError::ParseError(format!("Failed to parse JSON response: {}", e)))?;

    if envelope.success {
        Ok(envelope.result.unwrap_or(Value::Null))
    } else {
        Err(ExchangeError::ApiError {
            message: envelope.message,
            result: envelope.result.unwrap_or(Value::Null),
        })
    }
}

impl ReqwestRest {
    /// Build the full URL for an endpoint
    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url, endpoint)
    }

    #[instrument(skip(self, query_params), fields(exchange = %self.config.exchange_name, param_count = query_params.len()))]
    async fn request_url(
        &self,
        url: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, ExchangeError> {
        let mut uri = query::set_params(url, query_params);

        let mut request = self.client.get(&uri);
        if authenticated {
            let signer = self.signer.as_ref().ok_or_else(|| {
                ExchangeError::AuthError(
                    "Authentication required but no signer provided".to_string(),
                )
            })?;

            let signed = signer.sign(&uri, current_nonce()?)?;
            uri = signed.uri;
            request = self.client.get(&uri);
            for (key, value) in signed.headers {
                request = request.header(&key, &value);
            }
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            let status = e.status().map(|s| s.as_u16());
            ExchangeError::TransportError {
                status,
                message: format!("Request failed: {}", e),
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::TransportError {
                status: Some(status),
                message: format!("Failed to read response body: {}", e),
            })?;

        // Observability only: the timing never affects control flow.
        if self.config.verbose {
            debug!(
                exchange = %self.config.exchange_name,
                status,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "request completed"
            );
        }
        trace!("Response body: {}", body);

        decode_envelope(status, &body)
    }

    fn from_result<T: DeserializeOwned>(value: Value) -> Result<T, ExchangeError> {
        serde_json::from_value(value)
            .map_err(|e| ExchangeError::ParseError(format!("Failed to deserialize JSON: {}", e)))
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, ExchangeError> {
        self.request_url(&self.build_url(endpoint), query_params, authenticated)
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<T, ExchangeError> {
        self.get(endpoint, query_params, authenticated)
            .await
            .and_then(Self::from_result)
    }

    async fn get_url(
        &self,
        url: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, ExchangeError> {
        self.request_url(url, query_params, authenticated).await
    }

    async fn get_url_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<T, ExchangeError> {
        self.request_url(url, query_params, authenticated)
            .await
            .and_then(Self::from_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_200_classifies_as_transport_error() {
        let err = decode_envelope(503, "gateway down").unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::TransportError {
                status: Some(503),
                ..
            }
        ));
    }

    #[test]
    fn success_false_classifies_as_api_error_not_success() {
        let body = r#"{"success":false,"message":"APIKEY_INVALID","result":null}"#;
        let err = decode_envelope(200, body).unwrap_err();
        match err {
            ExchangeError::ApiError { message, result } => {
                assert_eq!(message, "APIKEY_INVALID");
                assert_eq!(result, Value::Null);
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[test]
    fn malformed_body_classifies_as_parse_error() {
        let err = decode_envelope(200, "<html>challenge</html>").unwrap_err();
        assert!(matches!(err, ExchangeError::ParseError(_)));
    }

    #[test]
    fn success_true_returns_result_payload() {
        let body = r#"{"success":true,"message":"","result":[{"MarketName":"BTC-ETH"}]}"#;
        let result = decode_envelope(200, body).unwrap();
        assert_eq!(result[0]["MarketName"], "BTC-ETH");
    }

    #[test]
    fn missing_result_maps_to_null() {
        let body = r#"{"success":true,"message":""}"#;
        assert_eq!(decode_envelope(200, body).unwrap(), Value::Null);
    }
}
