// src/verifier.rs

use crate::config::Config;
use crate::error::GateError;
use crate::provider::model::{KeySet, SigningKey};
use base64::engine::{general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// The only signing algorithm the gate accepts.
const ALLOWED_ALGORITHM: Algorithm = Algorithm::RS256;

/// The claim policy a session token must satisfy after its signature checks out.
#[derive(Clone, Debug)]
pub struct VerificationPolicy {
    /// Email domain the identity must belong to, without the `@`.
    pub hosted_domain: String,
    /// Expected `aud`. `None` skips the audience check.
    pub audience: Option<String>,
    /// Clock skew tolerance for `exp`.
    pub leeway: Duration,
}

impl From<&Config> for VerificationPolicy {
    fn from(config: &Config) -> Self {
        Self {
            hosted_domain: config.hosted_domain.clone(),
            audience: config
                .verification
                .validate_audience
                .then(|| config.client_id.clone()),
            leeway: config.verification.leeway,
        }
    }
}

/// The identity a verified session token asserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub email: String,
    pub subject: Option<String>,
    pub expires_at: u64,
}

#[derive(Debug, Deserialize)]
struct IdentityClaims {
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    sub: Option<String>,
    exp: u64,
}

/// Verifies identity tokens locally against a cached key set.
///
/// Construct it once per gate and reuse it; it holds no per-request state.
#[derive(Clone, Debug)]
pub struct TokenVerifier {
    policy: VerificationPolicy,
}

impl TokenVerifier {
    pub fn new(policy: VerificationPolicy) -> Self {
        Self { policy }
    }

    /// Verifies a compact token and returns the identity it asserts.
    ///
    /// The signature is checked before any claim is looked at:
    /// 1. Decode the header without trusting anything in it.
    /// 2. Reject any algorithm other than RS256.
    /// 3. Find the single key in `keys` carrying the header's `kid`.
    /// 4. Verify the signature (and `exp`/`aud`) with that key.
    /// 5. Apply the hosted-domain and `email_verified` policy.
    #[instrument(skip_all, err)]
    pub fn verify(&self, token: &str, keys: &KeySet) -> Result<VerifiedIdentity, GateError> {
        let header =
            decode_header(token).map_err(|e| GateError::MalformedToken(e.to_string()))?;

        if header.alg != ALLOWED_ALGORITHM {
            return Err(GateError::UnsupportedAlgorithm(header.alg));
        }

        let kid = header.kid.ok_or(GateError::MissingKeyId)?;
        let signing_key = keys
            .key_for(&kid)
            .ok_or_else(|| GateError::KeyNotFound(kid.clone()))?;
        let decoding_key = decoding_key(signing_key)?;

        let mut validation = Validation::new(ALLOWED_ALGORITHM);
        validation.leeway = self.policy.leeway.as_secs();
        validation.validate_exp = true;
        match &self.policy.audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                validation.set_required_spec_claims(&["exp", "aud"]);
            }
            None => {
                validation.validate_aud = false;
                validation.set_required_spec_claims(&["exp"]);
            }
        }

        let token_data = decode::<serde_json::Value>(token, &decoding_key, &validation)?;
        debug!(kid = %kid, "Token signature verified");

        let claims: IdentityClaims = serde_json::from_value(token_data.claims)
            .map_err(|e| GateError::ClaimRejected(format!("unexpected claim set: {}", e)))?;
        self.apply_policy(claims)
    }

    fn apply_policy(&self, claims: IdentityClaims) -> Result<VerifiedIdentity, GateError> {
        let email = claims
            .email
            .ok_or_else(|| GateError::ClaimRejected("token carries no email".to_string()))?;

        if !claims.email_verified {
            return Err(GateError::ClaimRejected(format!(
                "email {} is not verified",
                email
            )));
        }
        if !in_hosted_domain(&email, &self.policy.hosted_domain) {
            return Err(GateError::ClaimRejected(format!(
                "email {} is outside the {} domain",
                email, self.policy.hosted_domain
            )));
        }

        Ok(VerifiedIdentity {
            email,
            subject: claims.sub,
            expires_at: claims.exp,
        })
    }
}

/// Reads the `email` claim without verifying anything, for diagnostics only.
pub fn peek_email(token: &str) -> Option<String> {
    let payload_segment = token.split('.').nth(1)?;
    let payload = URL_SAFE_NO_PAD.decode(payload_segment).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&payload).ok()?;
    claims.get("email")?.as_str().map(str::to_string)
}

/// The hosted domain itself or any of its subdomains, anchored at a label boundary.
fn in_hosted_domain(email: &str, hosted_domain: &str) -> bool {
    let (local, domain) = match email.rsplit_once('@') {
        Some(parts) => parts,
        None => return false,
    };
    if local.is_empty() || hosted_domain.is_empty() {
        return false;
    }
    let domain = domain.to_ascii_lowercase();
    let hosted_domain = hosted_domain.to_ascii_lowercase();
    domain == hosted_domain || domain.ends_with(&format!(".{}", hosted_domain))
}

fn decoding_key(key: &SigningKey) -> Result<DecodingKey, GateError> {
    if key.kty != "RSA" {
        return Err(GateError::UnusableKey(format!(
            "key type {} cannot verify RS256",
            key.kty
        )));
    }
    if let Some(alg) = key.alg.as_deref() {
        if alg != "RS256" {
            return Err(GateError::UnusableKey(format!("key is declared for {}", alg)));
        }
    }
    if let Some(purpose) = key.use_purpose.as_deref() {
        if purpose != "sig" {
            return Err(GateError::UnusableKey(format!("key is declared for '{}'", purpose)));
        }
    }
    let n = key
        .n
        .as_deref()
        .ok_or_else(|| GateError::UnusableKey("RSA key missing 'n' component".to_string()))?;
    let e = key
        .e
        .as_deref()
        .ok_or_else(|| GateError::UnusableKey("RSA key missing 'e' component".to_string()))?;
    DecodingKey::from_rsa_components(n, e).map_err(|e| GateError::UnusableKey(e.to_string()))
}
