// src/request.rs

//! Pure helpers that read an inbound request: classification, query and
//! cookie extraction, and the `state` round trip.

use crate::config::Config;
use cookie::{Cookie, SameSite};
use http::header::{COOKIE, HOST};
use http::{Request, Uri};
use std::collections::HashMap;
use tracing::warn;
use url::Url;

/// Where a request stands in the login flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    /// The provider is redirecting the browser back with a code.
    Callback,
    /// A session cookie carries a token that still has to be verified.
    AuthenticatedCandidate(String),
    /// Neither of the above; the browser has to log in.
    NeedsLogin,
}

/// Classifies a request. The callback path wins over a present cookie.
pub fn classify<B>(request: &Request<B>, config: &Config) -> RequestState {
    if request.uri().path().starts_with(&config.callback_path) {
        RequestState::Callback
    } else if let Some(token) = session_token(request, &config.cookie_name) {
        RequestState::AuthenticatedCandidate(token)
    } else {
        RequestState::NeedsLogin
    }
}

/// Decodes the query string. When a name repeats, the last value wins.
pub fn query_params(uri: &Uri) -> HashMap<String, String> {
    uri.query()
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

/// Finds a non-empty cookie called `cookie_name` across all `cookie` headers.
pub fn session_token<B>(request: &Request<B>, cookie_name: &str) -> Option<String> {
    request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == cookie_name && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

/// The `host` + path the browser originally asked for; sent to the provider as `state`.
pub fn original_target<B>(request: &Request<B>) -> String {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().authority().map(|authority| authority.as_str()))
        .unwrap_or_default();
    format!("{}{}", host, request.uri().path())
}

/// Turns a `state` value back into an absolute post-login URL.
///
/// Only hosts in `config.allowed_redirect_hosts` are honored and the rest
/// must be a plain absolute path. Anything else lands on the root of the
/// redirect URI's origin.
pub fn post_login_target(state: Option<&str>, config: &Config) -> String {
    let origin = config.redirect_origin();
    let fallback = format!("{}/", origin);

    let state = match state {
        Some(state) if !state.is_empty() => state,
        _ => return fallback,
    };
    let (host, path) = match state.find('/') {
        Some(index) => state.split_at(index),
        None => (state, "/"),
    };

    if path.starts_with("//") || path.contains('\\') || path.chars().any(char::is_control) {
        warn!("Ignoring post-login path that is not a plain absolute path");
        return fallback;
    }
    let base = if host.is_empty() {
        format!("{}/", origin)
    } else {
        format!("{}://{}/", config.redirect_uri.scheme(), host)
    };
    let allowed = host.is_empty()
        || config
            .allowed_redirect_hosts
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(host));
    if !allowed {
        warn!(host = %host, "Ignoring post-login host outside the allow-list");
        return fallback;
    }

    // Re-serializing through `Url` percent-encodes whatever `state` decoded to.
    match Url::parse(&base).and_then(|base| base.join(path)) {
        Ok(target) => target.to_string(),
        Err(e) => {
            warn!(error = %e, "Ignoring post-login target that does not form a URL");
            fallback
        }
    }
}

/// Serializes the session cookie carrying `token`.
pub fn session_cookie(config: &Config, token: &str) -> String {
    Cookie::build((config.cookie_name.as_str(), token))
        .path("/")
        .http_only(true)
        .secure(config.redirect_uri.scheme() == "https")
        .same_site(SameSite::Lax)
        .build()
        .to_string()
}
