use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions},
};
use std::convert::Infallible;
use std::net::SocketAddr;

/// Placeholder key for requests served without connection info, e.g. in tests.
const UNKNOWN_CLIENT: &str = "unknown";

/// The caller's IP address, used to key rate limiting and label SSE subscribers.
pub(crate) struct ClientAddr(pub String);

impl ClientAddr {
    pub(crate) fn from_extensions(extensions: &Extensions) -> Self {
        let addr = extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());
        Self(addr)
    }
}

impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_extensions(&parts.extensions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uses_peer_ip_without_port() {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([10, 1, 2, 3], 51515))));

        assert_eq!(ClientAddr::from_extensions(&extensions).0, "10.1.2.3");
    }

    #[test]
    fn test_missing_connect_info_falls_back() {
        assert_eq!(
            ClientAddr::from_extensions(&Extensions::new()).0,
            UNKNOWN_CLIENT
        );
    }
}
