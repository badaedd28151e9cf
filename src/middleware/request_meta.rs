use std::convert::Infallible;
use std::net::IpAddr;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::USER_AGENT, request::Parts, HeaderMap},
};
use sqlx::types::ipnetwork::IpNetwork;

const MAX_USER_AGENT_CHARS: usize = 512;

/// Client details recorded alongside audit entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMeta {
    pub ip_address: Option<IpNetwork>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    /// The service runs behind a proxy, so the client address comes from
    /// `X-Forwarded-For` (first hop) or `X-Real-IP`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        let ip_address = header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .or_else(|| header("x-real-ip"))
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
            .map(IpNetwork::from);
        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| v.chars().take(MAX_USER_AGENT_CHARS).collect());
        Self {
            ip_address,
            user_agent,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
