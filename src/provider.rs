// src/provider.rs

pub mod model;

use crate::config::{ClientSecret, Config};
use crate::error::GateError;
use model::{DiscoveryDocument, KeySet, TokenResponse};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

/// A client for the three calls the gate makes to the identity provider.
///
/// Holds no state besides the pooled HTTP client; nothing is retried.
#[derive(Clone)]
pub struct ProviderClient {
    http_client: reqwest::Client,
    discovery_url: Url,
    client_id: String,
    client_secret: ClientSecret,
    redirect_uri: Url,
}

impl ProviderClient {
    /// Creates a new `ProviderClient`. Every request it sends is bounded by `config.http_timeout`.
    pub fn new(config: &Config) -> Result<Self, GateError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        let discovery_url = config.provider_url.join(&config.discovery_path)?;

        Ok(Self {
            http_client,
            discovery_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    /// Fetches and parses the provider's discovery document.
    #[instrument(skip(self), fields(url = %self.discovery_url), err)]
    pub async fn fetch_discovery(&self) -> Result<DiscoveryDocument, GateError> {
        debug!("Performing OIDC discovery");
        let response = self.http_client.get(self.discovery_url.clone()).send().await?;
        let discovery: DiscoveryDocument = read_json(response, "discovery document").await?;
        debug!(jwks_uri = %discovery.jwks_uri, "Discovered provider endpoints");
        Ok(discovery)
    }

    /// Fetches the JSON Web Key Set published at `jwks_uri`.
    #[instrument(skip_all, fields(url = %jwks_uri), err)]
    pub async fn fetch_key_set(&self, jwks_uri: &Url) -> Result<KeySet, GateError> {
        let response = self.http_client.get(jwks_uri.clone()).send().await?;
        let key_set: KeySet = read_json(response, "key set").await?;
        debug!("Fetched {} signing keys", key_set.len());
        Ok(key_set)
    }

    /// Exchanges an authorization code for the provider's identity token.
    ///
    /// A refusal reported by the provider becomes `CodeExchangeRejected`
    /// carrying its description; anything unreadable is an internal failure.
    #[instrument(skip_all, fields(url = %token_endpoint), err)]
    pub async fn exchange_code(&self, token_endpoint: &Url, code: &str) -> Result<String, GateError> {
        let form = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let response = self
            .http_client
            .post(token_endpoint.clone())
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        let parsed: TokenResponse = serde_json::from_slice(&body).map_err(|_| {
            GateError::InvalidProviderResponse(format!(
                "token endpoint answered {} without a JSON body",
                status
            ))
        })?;

        if let Some(error) = parsed.error {
            warn!(%status, error = %error, "Provider rejected the authorization code");
            return Err(GateError::CodeExchangeRejected(
                parsed.error_description.unwrap_or(error),
            ));
        }

        match parsed.id_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(GateError::InvalidProviderResponse(format!(
                "token endpoint answered {} without an id_token",
                status
            ))),
        }
    }
}

/// Checks the status and decodes a JSON document, naming `what` in any error.
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T, GateError> {
    let status = response.status();
    if !status.is_success() {
        return Err(GateError::InvalidProviderResponse(format!(
            "{} endpoint answered {}",
            what, status
        )));
    }
    let body = response.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|e| GateError::InvalidProviderResponse(format!("malformed {}: {}", what, e)))
}
