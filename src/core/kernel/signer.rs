use crate::core::errors::ExchangeError;

/// A fully-assembled request produced by a [`Signer`]: the mutated URI plus
/// the authentication headers derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUri {
    pub uri: String,
    pub headers: Vec<(String, String)>,
}

/// Signer trait for request authentication.
///
/// The signature is a pure function of the fully-assembled URI string and
/// the secret: implementations must not reorder or otherwise canonicalize
/// the query beyond [`query::set_param`] semantics, because a downstream
/// verifier hashes the byte-identical URI.
pub trait Signer: Send + Sync {
    /// Sign `uri`, attaching credentials and `nonce` as query parameters.
    fn sign(&self, uri: &str, nonce: u64) -> Result<SignedUri, ExchangeError>;
}

/// Canonical query-string construction shared by signers and the REST
/// client.
pub mod query {
    /// Set a query parameter on `uri`.
    ///
    /// If a parameter with the same name already exists (case-insensitive
    /// match, position preserved) its value is replaced in place; otherwise
    /// the pair is appended with `?` or `&`. Insertion order is otherwise
    /// whatever order callers supplied: the signature covers the URI exactly
    /// as constructed.
    #[must_use]
    pub fn set_param(uri: &str, key: &str, value: &str) -> String {
        let Some((base, query)) = uri.split_once('?') else {
            return format!("{uri}?{key}={value}");
        };

        let mut replaced = false;
        let pairs: Vec<String> = query
            .split('&')
            .map(|pair| {
                match pair.split_once('=') {
                    Some((name, _)) if !replaced && name.eq_ignore_ascii_case(key) => {
                        replaced = true;
                        format!("{key}={value}")
                    }
                    // A bare name without '=' never matches.
                    _ => pair.to_string(),
                }
            })
            .collect();

        if replaced {
            format!("{base}?{}", pairs.join("&"))
        } else {
            format!("{uri}&{key}={value}")
        }
    }

    /// Apply `params` to `uri` in caller order via [`set_param`].
    #[must_use]
    pub fn set_params(uri: &str, params: &[(&str, &str)]) -> String {
        params
            .iter()
            .fold(uri.to_string(), |uri, (k, v)| set_param(&uri, k, v))
    }
}
