// src/provider/model.rs

use serde::Deserialize;
use url::Url;

/// Represents the parts of an OIDC provider's discovery document the gate uses.
/// Found at the `.well-known/openid-configuration` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    #[serde(default)]
    pub issuer: Option<String>,
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    pub jwks_uri: Url,
}

/// Represents a single JSON Web Key (JWK) as defined in RFC 7517.
///
/// Only RSA keys (`n`, `e`) can verify tokens; elliptic-curve parameters are
/// kept so that a mixed key set still parses.
#[derive(Debug, Clone, Deserialize)]
pub struct SigningKey {
    #[serde(default)]
    pub kid: Option<String>,
    pub kty: String,
    #[serde(rename = "use", default)]
    pub use_purpose: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
    #[serde(default)]
    pub crv: Option<String>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
}

/// Represents a JSON Web Key Set (JWKS), which is a collection of JWKs.
#[derive(Debug, Clone, Deserialize)]
pub struct KeySet {
    pub keys: Vec<SigningKey>,
}

impl KeySet {
    /// Returns the key whose `kid` equals `kid`, provided exactly one key matches.
    pub fn key_for(&self, kid: &str) -> Option<&SigningKey> {
        let mut matches = self
            .keys
            .iter()
            .filter(|key| key.kid.as_deref() == Some(kid));
        match (matches.next(), matches.next()) {
            (Some(key), None) => Some(key),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// The token endpoint's answer to a code exchange.
///
/// Providers report refusals in the same JSON shape (usually with a 400),
/// so every field is optional and the client decides which case it is.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}
