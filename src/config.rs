// src/config.rs

use crate::error::GateError;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use url::Url;

const DEFAULT_DISCOVERY_PATH: &str = ".well-known/openid-configuration";
const DEFAULT_CALLBACK_PATH: &str = "/_callback";
const DEFAULT_COOKIE_NAME: &str = "token";
const DEFAULT_SCOPES: &str = "openid email";

/// The OAuth2 client secret. Its `Debug` output is redacted.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(String);

impl ClientSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the raw secret. Only the code exchange should need this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(***)")
    }
}

/// Contains the validation settings for the session token.
#[derive(Clone, Debug)]
pub struct VerificationDetails {
    /// The tolerance for clock skew when validating `exp`.
    /// Defaults to 60 seconds.
    pub leeway: Duration,
    /// Whether the token's `aud` claim must equal the configured client id.
    /// Defaults to `true`.
    pub validate_audience: bool,
}

impl Default for VerificationDetails {
    fn default() -> Self {
        Self {
            leeway: Duration::from_secs(60),
            validate_audience: true,
        }
    }
}

/// The main configuration for the gate.
///
/// This struct holds everything needed to talk to the identity provider and
/// to decide whether a request may pass. It should be constructed using the
/// `ConfigBuilder` (or from a deserialized [`GateSettings`]).
#[derive(Clone, Debug)]
pub struct Config {
    /// Base origin of the identity provider, e.g. "https://accounts.google.com".
    pub provider_url: Url,
    /// Discovery document path, relative to `provider_url`.
    pub discovery_path: String,
    /// The client ID of the application, as registered with the provider.
    pub client_id: String,
    pub client_secret: ClientSecret,
    /// Where the provider sends the browser back to. Its path should fall under `callback_path`.
    pub redirect_uri: Url,
    /// Only identities whose email belongs to this domain are accepted.
    pub hosted_domain: String,
    /// Requests whose path starts with this prefix are OAuth callbacks.
    pub callback_path: String,
    pub cookie_name: String,
    /// Space-separated scopes requested at login.
    pub scopes: String,
    /// Upper bound for every outbound call to the provider.
    pub http_timeout: Duration,
    pub verification: VerificationDetails,
    /// Hosts (with optional port) that a post-login `state` may send the browser to.
    pub allowed_redirect_hosts: Vec<String>,
}

impl Config {
    /// The `scheme://host[:port]` of the redirect URI. Post-login fallbacks land here.
    pub fn redirect_origin(&self) -> String {
        self.redirect_uri.origin().ascii_serialization()
    }
}

/// A builder for creating a `Config` instance.
///
/// This builder provides a fluent API to ensure that the configuration is
/// constructed correctly and with all required fields.
#[derive(Default)]
pub struct ConfigBuilder {
    provider_url: Option<Url>,
    discovery_path: Option<String>,
    client_id: Option<String>,
    client_secret: Option<ClientSecret>,
    redirect_uri: Option<Url>,
    hosted_domain: Option<String>,
    callback_path: Option<String>,
    cookie_name: Option<String>,
    scopes: Option<String>,
    http_timeout: Option<Duration>,
    allowed_redirect_hosts: Vec<String>,
    verification: VerificationDetails,
}

impl ConfigBuilder {
    /// Creates a new `ConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base origin of the identity provider. This is a required field.
    ///
    /// # Arguments
    ///
    /// * `url` - The provider origin, e.g., "https://accounts.google.com".
    pub fn provider_url(mut self, url: &str) -> Result<Self, GateError> {
        self.provider_url = Some(Url::parse(url)?);
        Ok(self)
    }

    /// Overrides the discovery document path. Defaults to `.well-known/openid-configuration`.
    pub fn discovery_path(mut self, path: &str) -> Self {
        self.discovery_path = Some(path.trim_start_matches('/').to_string());
        self
    }

    /// Sets the client ID of the application. This is a required field.
    pub fn client_id(mut self, client_id: String) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Sets the client secret used for the code exchange. This is a required field.
    pub fn client_secret(mut self, secret: ClientSecret) -> Self {
        self.client_secret = Some(secret);
        self
    }

    /// Sets the OAuth redirect URI registered with the provider. This is a required field.
    pub fn redirect_uri(mut self, url: &str) -> Result<Self, GateError> {
        self.redirect_uri = Some(Url::parse(url)?);
        Ok(self)
    }

    /// Sets the email domain identities must belong to. This is a required field.
    pub fn hosted_domain(mut self, domain: &str) -> Self {
        self.hosted_domain = Some(domain.trim().trim_start_matches('@').to_ascii_lowercase());
        self
    }

    /// Sets the callback path prefix. Defaults to `/_callback`.
    pub fn callback_path(mut self, path: &str) -> Self {
        self.callback_path = Some(path.to_string());
        self
    }

    /// Sets the session cookie name. Defaults to `token`.
    pub fn cookie_name(mut self, name: &str) -> Self {
        self.cookie_name = Some(name.to_string());
        self
    }

    /// Sets the scopes requested at login. Defaults to `openid email`.
    pub fn scopes(mut self, scopes: &str) -> Self {
        self.scopes = Some(scopes.to_string());
        self
    }

    /// Sets the timeout applied to each outbound call. Defaults to 10 seconds.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Sets the clock skew tolerance. Defaults to 60 seconds.
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.verification.leeway = leeway;
        self
    }

    /// Enables or disables the `aud` check against the client id.
    pub fn validate_audience(mut self, validate: bool) -> Self {
        self.verification.validate_audience = validate;
        self
    }

    /// Adds a host the post-login redirect may target. The redirect URI's host is always allowed.
    pub fn allow_redirect_host(mut self, host: &str) -> Self {
        self.allowed_redirect_hosts.push(host.to_ascii_lowercase());
        self
    }

    /// Consumes the builder and returns a `Config` object.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or a value is unusable.
    pub fn build(self) -> Result<Config, GateError> {
        let provider_url = self
            .provider_url
            .ok_or_else(|| GateError::MissingConfiguration("provider_url".to_string()))?;
        let client_id = self
            .client_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GateError::MissingConfiguration("client_id".to_string()))?;
        let client_secret = self
            .client_secret
            .filter(|secret| !secret.expose().is_empty())
            .ok_or_else(|| GateError::MissingConfiguration("client_secret".to_string()))?;
        let redirect_uri = self
            .redirect_uri
            .ok_or_else(|| GateError::MissingConfiguration("redirect_uri".to_string()))?;
        let hosted_domain = self
            .hosted_domain
            .filter(|domain| !domain.is_empty())
            .ok_or_else(|| GateError::MissingConfiguration("hosted_domain".to_string()))?;

        let callback_path = self
            .callback_path
            .unwrap_or_else(|| DEFAULT_CALLBACK_PATH.to_string());
        if !callback_path.starts_with('/') || callback_path.len() < 2 {
            return Err(GateError::InvalidConfiguration(format!(
                "callback_path must be an absolute path, got '{}'",
                callback_path
            )));
        }

        let cookie_name = self
            .cookie_name
            .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());
        if cookie_name.is_empty() || cookie_name.contains(|c: char| c == '=' || c == ';' || c.is_whitespace()) {
            return Err(GateError::InvalidConfiguration(format!(
                "'{}' is not a usable cookie name",
                cookie_name
            )));
        }

        let redirect_host = redirect_uri.host_str().ok_or_else(|| {
            GateError::InvalidConfiguration("redirect_uri must carry a host".to_string())
        })?;
        let redirect_host = match redirect_uri.port() {
            Some(port) => format!("{}:{}", redirect_host, port),
            None => redirect_host.to_string(),
        }
        .to_ascii_lowercase();
        let mut allowed_redirect_hosts = vec![redirect_host];
        for host in self.allowed_redirect_hosts {
            if !allowed_redirect_hosts.contains(&host) {
                allowed_redirect_hosts.push(host);
            }
        }

        Ok(Config {
            provider_url,
            discovery_path: self
                .discovery_path
                .unwrap_or_else(|| DEFAULT_DISCOVERY_PATH.to_string()),
            client_id,
            client_secret,
            redirect_uri,
            hosted_domain,
            callback_path,
            cookie_name,
            scopes: self.scopes.unwrap_or_else(|| DEFAULT_SCOPES.to_string()),
            http_timeout: self.http_timeout.unwrap_or(Duration::from_secs(10)),
            verification: self.verification,
            allowed_redirect_hosts,
        })
    }
}

/// The file form of the configuration, e.g. the `gate` section of a YAML file.
#[derive(Debug, Deserialize)]
pub struct GateSettings {
    pub provider_url: String,
    pub discovery_path: Option<String>,
    pub client_id: String,
    pub client_secret: ClientSecret,
    pub redirect_uri: String,
    pub hosted_domain: String,
    pub callback_path: Option<String>,
    pub cookie_name: Option<String>,
    pub scopes: Option<String>,
    pub http_timeout_seconds: Option<u64>,
    pub leeway_seconds: Option<u64>,
    pub validate_audience: Option<bool>,
    #[serde(default)]
    pub allowed_redirect_hosts: Vec<String>,
}

impl TryFrom<GateSettings> for Config {
    type Error = GateError;

    fn try_from(settings: GateSettings) -> Result<Self, Self::Error> {
        let mut builder = ConfigBuilder::new()
            .provider_url(&settings.provider_url)?
            .redirect_uri(&settings.redirect_uri)?
            .client_id(settings.client_id)
            .client_secret(settings.client_secret)
            .hosted_domain(&settings.hosted_domain);

        if let Some(path) = &settings.discovery_path {
            builder = builder.discovery_path(path);
        }
        if let Some(path) = &settings.callback_path {
            builder = builder.callback_path(path);
        }
        if let Some(name) = &settings.cookie_name {
            builder = builder.cookie_name(name);
        }
        if let Some(scopes) = &settings.scopes {
            builder = builder.scopes(scopes);
        }
        if let Some(seconds) = settings.http_timeout_seconds {
            builder = builder.http_timeout(Duration::from_secs(seconds));
        }
        if let Some(seconds) = settings.leeway_seconds {
            builder = builder.leeway(Duration::from_secs(seconds));
        }
        if let Some(validate) = settings.validate_audience {
            builder = builder.validate_audience(validate);
        }
        for host in &settings.allowed_redirect_hosts {
            builder = builder.allow_redirect_host(host);
        }

        builder.build()
    }
}
