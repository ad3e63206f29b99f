use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{query, SignedUri, Signer};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha512;

/// HMAC-SHA512 signer for the v1.1 signed-URL scheme.
///
/// `apikey` and `nonce` are merged into the query string, then the full URI
/// is hashed with the API secret and the lowercase-hex digest is attached as
/// the `apisign` header. The digest covers the URI byte-for-byte as
/// constructed: parameter order is never normalized.
pub struct BittrexSigner {
    api_key: String,
    api_secret: Secret<String>,
}

impl BittrexSigner {
    /// Create a new signer from API credentials.
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret: Secret::new(api_secret),
        }
    }

    fn hmac_hex(&self, uri: &str) -> Result<String, ExchangeError> {
        let mut mac = Hmac::<Sha512>::new_from_slice(self.api_secret.expose_secret().as_bytes())
            .map_err(|e| ExchangeError::AuthError(format!("Invalid secret key: {}", e)))?;

        mac.update(uri.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl Signer for BittrexSigner {
    fn sign(&self, uri: &str, nonce: u64) -> Result<SignedUri, ExchangeError> {
        // Fail fast instead of silently hashing with an empty key.
        if self.api_secret.expose_secret().is_empty() {
            return Err(ExchangeError::AuthError(
                "API secret is required for signed calls".to_string(),
            ));
        }

        let uri = query::set_param(uri, "apikey", &self.api_key);
        let uri = query::set_param(&uri, "nonce", &nonce.to_string());

        let signature = self.hmac_hex(&uri)?;

        Ok(SignedUri {
            uri,
            headers: vec![("apisign".to_string(), signature)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> BittrexSigner {
        BittrexSigner::new("K".to_string(), "S".to_string())
    }

    #[test]
    fn signing_is_deterministic() {
        let uri = "https://bittrex.com/api/v1.1/market/getopenorders?market=BTC-ETH";
        let first = signer().sign(uri, 1_500_000_000).unwrap();
        let second = signer().sign(uri, 1_500_000_000).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn signature_depends_on_every_input() {
        let uri = "https://bittrex.com/api/v1.1/market/getopenorders?market=BTC-ETH";
        let base = signer().sign(uri, 1_500_000_000).unwrap();

        let changed_query = signer()
            .sign(
                "https://bittrex.com/api/v1.1/market/getopenorders?market=BTC-LTC",
                1_500_000_000,
            )
            .unwrap();
        assert_ne!(base.headers, changed_query.headers);

        let changed_nonce = signer().sign(uri, 1_500_000_001).unwrap();
        assert_ne!(base.headers, changed_nonce.headers);

        let changed_secret = BittrexSigner::new("K".to_string(), "S2".to_string())
            .sign(uri, 1_500_000_000)
            .unwrap();
        assert_ne!(base.headers, changed_secret.headers);
    }

    #[test]
    fn signature_is_128_char_lowercase_hex() {
        let signed = signer()
            .sign("https://bittrex.com/api/v1.1/market/getopenorders", 1)
            .unwrap();
        let (name, value) = &signed.headers[0];
        assert_eq!(name, "apisign");
        assert_eq!(value.len(), 128);
        assert!(value
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn existing_apikey_parameter_is_replaced_not_duplicated() {
        let signed = signer()
            .sign(
                "https://bittrex.com/api/v1.1/market/getopenorders?apikey=stale&market=BTC-ETH",
                1,
            )
            .unwrap();
        assert_eq!(signed.uri.matches("apikey=").count(), 1);
        assert!(signed.uri.contains("apikey=K"));
        // Replacement happens in place, ahead of the caller's parameters.
        assert!(signed.uri.find("apikey=K").unwrap() < signed.uri.find("market=").unwrap());
    }

    #[test]
    fn empty_secret_fails_fast() {
        let signer = BittrexSigner::new("K".to_string(), String::new());
        let err = signer
            .sign("https://bittrex.com/api/v1.1/account/getbalances", 1)
            .unwrap_err();
        assert!(matches!(err, ExchangeError::AuthError(_)));
    }
}
