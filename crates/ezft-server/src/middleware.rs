//! Request logging and placeholder basic auth.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::config::BasicAuth;

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// One `info` line per request: peer, method, URI, status, response size,
/// duration, user agent and referer.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let method = req.method().clone();
    let uri = req.uri().clone();
    let user_agent = header_str(req.headers(), header::USER_AGENT);
    let referer = header_str(req.headers(), header::REFERER);

    let response = next.run(req).await;

    let size = header_str(response.headers(), header::CONTENT_LENGTH)
        .parse::<u64>()
        .unwrap_or(0);
    tracing::info!(
        remote = %remote,
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        resp_size = size,
        duration_ms = started.elapsed().as_millis() as u64,
        user_agent = %user_agent,
        referer = %referer,
        "request"
    );
    response
}

/// Decode `Authorization: Basic <base64(user:pass)>`.
pub fn parse_basic_auth(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Missing or malformed credentials → 401 with a `WWW-Authenticate`
/// challenge; wrong credentials → 403.
pub async fn basic_auth(
    State(expected): State<Arc<BasicAuth>>,
    req: Request,
    next: Next,
) -> Response {
    match parse_basic_auth(req.headers()) {
        None => {
            let mut response = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"Restricted\""),
            );
            response
        }
        Some((user, pass)) if user == expected.username && pass == expected.password => {
            next.run(req).await
        }
        Some(_) => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
    }
}
