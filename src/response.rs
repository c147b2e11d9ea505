// src/response.rs

//! Builders for the three response shapes the gate produces: 302, 401, 500.

use crate::error::{Disposition, GateError};
use http::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};
use http::{HeaderValue, Response, StatusCode};

fn plain(status: StatusCode, body: impl Into<String>) -> Response<String> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

pub fn unauthorized(body: impl Into<String>) -> Response<String> {
    plain(StatusCode::UNAUTHORIZED, body)
}

pub fn internal_error(body: impl Into<String>) -> Response<String> {
    plain(StatusCode::INTERNAL_SERVER_ERROR, body)
}

/// Renders `error` with the status its disposition calls for.
pub fn from_error(error: &GateError) -> Response<String> {
    match error.disposition() {
        Disposition::Unauthorized => unauthorized(error.to_string()),
        Disposition::Internal => internal_error(error.to_string()),
    }
}

/// A 302 to `location`, optionally setting the session cookie.
pub fn redirect(location: &str, set_cookie: Option<&str>, body: &str) -> Response<String> {
    let location = match HeaderValue::from_str(location) {
        Ok(value) => value,
        Err(_) => return internal_error("Unable to build redirect location."),
    };
    let mut response = plain(StatusCode::FOUND, body);
    response.headers_mut().insert(LOCATION, location);

    if let Some(cookie) = set_cookie {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                response.headers_mut().insert(SET_COOKIE, value);
            }
            Err(_) => return internal_error("Unable to build session cookie."),
        }
    }
    response
}
