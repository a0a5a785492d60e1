//! Caller network metadata for the audit log.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts},
};
use connect_governance::RequestMetadata;

/// Client IP and user agent of the request.
///
/// The IP is the first `X-Forwarded-For` hop when present, otherwise the
/// peer address. Absent values are recorded as `unknown` downstream.
#[derive(Debug, Clone, Default)]
pub struct ClientMetadata(pub RequestMetadata);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientMetadata
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(Self(RequestMetadata {
            ip_address: forwarded.or(peer),
            user_agent,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_forwarded_for_wins_over_peer() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .header(header::USER_AGENT, "curl/8")
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();
        let ClientMetadata(meta) = ClientMetadata::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8"));
    }

    #[tokio::test]
    async fn test_missing_headers_leave_none() {
        let (mut parts, ()) = Request::builder().body(()).unwrap().into_parts();
        let ClientMetadata(meta) = ClientMetadata::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(meta, RequestMetadata::default());
    }
}
