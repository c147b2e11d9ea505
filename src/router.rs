// src/router.rs

use crate::config::Config;
use crate::error::GateError;
use crate::metadata::{MetadataCache, ProviderMetadata};
use crate::provider::model::DiscoveryDocument;
use crate::provider::ProviderClient;
use crate::request::{self, RequestState};
use crate::response;
use crate::verifier::{self, TokenVerifier, VerificationPolicy};
use http::{Request, Response};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// The terminal decision for one request.
#[derive(Debug)]
pub enum Outcome<B> {
    /// Let the original request through to its destination, untouched.
    Forward(Request<B>),
    /// Answer the client directly: a redirect, a 401 or a 500.
    Respond(Response<String>),
}

impl<B> Outcome<B> {
    pub fn is_forward(&self) -> bool {
        matches!(self, Outcome::Forward(_))
    }
}

/// The authentication gate for one execution unit.
///
/// Create it once and reuse it for every request the unit serves; the
/// provider metadata it caches lives exactly as long as it does.
pub struct Gate {
    config: Config,
    provider: ProviderClient,
    cache: MetadataCache,
    verifier: TokenVerifier,
}

impl Gate {
    /// Creates a new `Gate`. No network call happens until the first request.
    pub fn new(config: Config) -> Result<Self, GateError> {
        let provider = ProviderClient::new(&config)?;
        let verifier = TokenVerifier::new(VerificationPolicy::from(&config));
        Ok(Self {
            config,
            provider,
            cache: MetadataCache::new(),
            verifier,
        })
    }

    pub fn metadata_cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Decides what happens to `request`.
    ///
    /// Every request first makes sure the provider metadata is cached; if
    /// that fails the request ends in a 500 without being classified.
    #[instrument(skip_all, fields(path = %request.uri().path()))]
    pub async fn handle<B>(&self, request: Request<B>) -> Outcome<B> {
        let metadata = match self.cache.ensure_ready(&self.provider).await {
            Ok(metadata) => metadata,
            Err(e) => return Outcome::Respond(response::from_error(&e)),
        };

        match request::classify(&request, &self.config) {
            RequestState::Callback => {
                Outcome::Respond(self.complete_login(&request, &metadata).await)
            }
            RequestState::AuthenticatedCandidate(token) => {
                match self.verifier.verify(&token, &metadata.keys) {
                    Ok(identity) => {
                        info!(email = %identity.email, "Forwarding authenticated request");
                        Outcome::Forward(request)
                    }
                    Err(e) => Outcome::Respond(reject_session(&token, &e)),
                }
            }
            RequestState::NeedsLogin => {
                Outcome::Respond(self.begin_login(&request, &metadata.discovery))
            }
        }
    }

    /// Like [`Gate::handle`], bounded by `deadline`. Running out of time yields a 500.
    pub async fn handle_within<B>(&self, request: Request<B>, deadline: Duration) -> Outcome<B> {
        match tokio::time::timeout(deadline, self.handle(request)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(?deadline, "Invocation deadline exceeded");
                Outcome::Respond(response::from_error(&GateError::Timeout))
            }
        }
    }

    async fn complete_login<B>(
        &self,
        request: &Request<B>,
        metadata: &ProviderMetadata,
    ) -> Response<String> {
        let query = request::query_params(request.uri());
        let code = match query.get("code") {
            Some(code) if !code.is_empty() => code,
            _ => {
                warn!("Callback without an authorization code");
                return response::from_error(&GateError::MissingCode);
            }
        };

        match self
            .provider
            .exchange_code(&metadata.discovery.token_endpoint, code)
            .await
        {
            Ok(token) => {
                let state = query.get("state").map(String::as_str);
                let target = request::post_login_target(state, &self.config);
                let cookie = request::session_cookie(&self.config, &token);
                info!(target = %target, "Login completed, issuing session cookie");
                response::redirect(&target, Some(&cookie), "ID token retrieved.")
            }
            Err(e) => response::from_error(&e),
        }
    }

    fn begin_login<B>(
        &self,
        request: &Request<B>,
        discovery: &DiscoveryDocument,
    ) -> Response<String> {
        let state = request::original_target(request);
        let mut authorize_url = discovery.authorization_endpoint.clone();
        authorize_url
            .query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", &self.config.scopes)
            .append_pair("hd", &self.config.hosted_domain)
            .append_pair("state", &state)
            .append_pair("response_type", "code");

        response::redirect(
            authorize_url.as_str(),
            None,
            "Authenticating with the identity provider",
        )
    }
}

/// 401 for a session token that failed verification, naming the user when the payload is readable.
fn reject_session(token: &str, error: &GateError) -> Response<String> {
    match verifier::peek_email(token) {
        Some(email) => {
            warn!(email = %email, reason = %error, "Session token rejected");
            response::unauthorized(format!("Unauthorized. User {} is not permitted.", email))
        }
        None => {
            warn!(reason = %error, "Session token rejected");
            response::unauthorized("Unauthorized. Session token is not valid.")
        }
    }
}
