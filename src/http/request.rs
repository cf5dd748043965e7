//! Request inspection helpers.
//!
//! # Responsibilities
//! - Identify the client address a request came from
//! - Generate request IDs (UUID v4) for tracing
//!
//! # Design Decisions
//! - Forwarded headers are only honoured when explicitly trusted
//! - A forwarded header that is present but unparsable is an internal
//!   error, never silently replaced by the peer address
//! - The peer address comes from `ConnectInfo`, or from `MockConnectInfo`
//!   when the router is driven without a listener

use std::net::{IpAddr, SocketAddr};

use axum::extract::connect_info::MockConnectInfo;
use axum::extract::ConnectInfo;
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue};

use crate::security::error::GateError;

pub use tower_http::request_id::MakeRequestUuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Determine the client IP of a request.
///
/// With `trust_proxy_headers`, `X-Forwarded-For` (first hop) then
/// `X-Real-IP` take precedence over the transport peer address.
pub fn client_ip(parts: &Parts, trust_proxy_headers: bool) -> Result<IpAddr, GateError> {
    if trust_proxy_headers {
        if let Some(value) = parts.headers.get(X_FORWARDED_FOR) {
            return forwarded_ip(value, true);
        }
        if let Some(value) = parts.headers.get(X_REAL_IP) {
            return forwarded_ip(value, false);
        }
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
        .or_else(|| {
            parts
                .extensions
                .get::<MockConnectInfo<SocketAddr>>()
                .map(|MockConnectInfo(addr)| *addr)
        })
        .map(|addr| addr.ip())
        .ok_or_else(|| GateError::internal("peer address unavailable"))
}

fn forwarded_ip(value: &HeaderValue, list: bool) -> Result<IpAddr, GateError> {
    let text = value
        .to_str()
        .map_err(|_| GateError::internal("forwarded address is not ASCII"))?;
    let candidate = if list {
        text.split(',').next().unwrap_or_default()
    } else {
        text
    };

    candidate
        .trim()
        .parse()
        .map_err(|_| GateError::internal(format!("malformed forwarded address '{candidate}'")))
}
