// src/error.rs

use jsonwebtoken::Algorithm;
use thiserror::Error;

/// How a failure is surfaced to the client once it reaches the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The caller is not (or not yet) entitled to the resource. Rendered as 401.
    Unauthorized,
    /// The gate itself could not complete the request. Rendered as 500.
    Internal,
}

/// The primary error type for the `oidc-edge-gate` library.
///
/// Messages never carry the client secret or raw token material, so every
/// variant is safe to render into a response body.
#[derive(Debug, Error)]
pub enum GateError {
    /// A required configuration field is missing.
    #[error("A required configuration field is missing: {0}")]
    MissingConfiguration(String),

    /// A configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A provided URL could not be parsed or joined.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Discovery or key-set bootstrap failed. The metadata cache stays empty.
    #[error("Unable to verify JWT: {0}")]
    Bootstrap(String),

    /// A network-level failure while talking to the identity provider.
    #[error("HTTP request error: {0}")]
    Transport(reqwest::Error),

    /// An outbound call or the whole invocation ran past its deadline.
    #[error("The identity provider did not respond in time")]
    Timeout,

    /// The identity provider answered, but not with anything usable.
    #[error("Unexpected response from the identity provider: {0}")]
    InvalidProviderResponse(String),

    /// A callback request arrived without an authorization code.
    #[error("No code found.")]
    MissingCode,

    /// The identity provider refused the authorization code. Carries its description.
    #[error("{0}")]
    CodeExchangeRejected(String),

    /// The session token could not be parsed.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The token header declares an algorithm other than RS256.
    #[error("Unsupported JWT algorithm: {0:?}")]
    UnsupportedAlgorithm(Algorithm),

    /// The JWT header is missing the 'kid' (Key ID) field.
    #[error("The JWT header is missing the 'kid' (Key ID) field")]
    MissingKeyId,

    /// No single key in the cached key set carries the token's 'kid'.
    #[error("Key not found for kid: {0}")]
    KeyNotFound(String),

    /// The matching key cannot be used to verify an RS256 signature.
    #[error("Unusable signing key: {0}")]
    UnusableKey(String),

    /// The token's signature does not verify against the matching key.
    #[error("Token signature is invalid")]
    SignatureInvalid,

    /// The signature is authentic but a claim fails the gate's policy.
    #[error("Claim rejected: {0}")]
    ClaimRejected(String),
}

impl GateError {
    /// Maps the error to the response shape the router renders for it.
    pub fn disposition(&self) -> Disposition {
        match self {
            GateError::MissingCode
            | GateError::CodeExchangeRejected(_)
            | GateError::MalformedToken(_)
            | GateError::UnsupportedAlgorithm(_)
            | GateError::MissingKeyId
            | GateError::KeyNotFound(_)
            | GateError::UnusableKey(_)
            | GateError::SignatureInvalid
            | GateError::ClaimRejected(_) => Disposition::Unauthorized,
            GateError::MissingConfiguration(_)
            | GateError::InvalidConfiguration(_)
            | GateError::InvalidUrl(_)
            | GateError::Bootstrap(_)
            | GateError::Transport(_)
            | GateError::Timeout
            | GateError::InvalidProviderResponse(_) => Disposition::Internal,
        }
    }
}

impl From<reqwest::Error> for GateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GateError::Timeout
        } else {
            // Endpoint URLs add nothing for the end user.
            GateError::Transport(err.without_url())
        }
    }
}

impl From<jsonwebtoken::errors::Error> for GateError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => GateError::SignatureInvalid,
            ErrorKind::ExpiredSignature => GateError::ClaimRejected("token has expired".to_string()),
            ErrorKind::ImmatureSignature => {
                GateError::ClaimRejected("token is not valid yet".to_string())
            }
            ErrorKind::InvalidAudience => {
                GateError::ClaimRejected("token was issued for another audience".to_string())
            }
            ErrorKind::InvalidIssuer => {
                GateError::ClaimRejected("token was issued by an unexpected issuer".to_string())
            }
            ErrorKind::MissingRequiredClaim(claim) => {
                GateError::ClaimRejected(format!("missing required claim '{}'", claim))
            }
            ErrorKind::InvalidRsaKey(_) => GateError::UnusableKey(err.to_string()),
            ErrorKind::InvalidKeyFormat => GateError::UnusableKey("invalid key format".to_string()),
            ErrorKind::InvalidAlgorithm => GateError::MalformedToken("algorithm mismatch".to_string()),
            _ => GateError::MalformedToken(err.to_string()),
        }
    }
}
