//! Custom Axum extractors.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Client IP address, for audit logging of sign-in attempts.
///
/// # Priority
///
/// 1. `X-Forwarded-For` (first IP in the list)
/// 2. `X-Real-IP`
/// 3. Connection IP, when the server was started with connect info
/// 4. `127.0.0.1`
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = extract_client_ip(&parts.headers, parts.extensions.get());

        Ok(Self(ip))
    }
}

/// Extract client IP from headers or connection info.
fn extract_client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> IpAddr {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());

    let real = || {
        headers
            .get("X-Real-IP")
            .and_then(|v| v.to_str().ok())
            .and_then(|ip| ip.trim().parse().ok())
    };

    forwarded
        .or_else(real)
        .or_else(|| connect_info.map(|info| info.0.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn client_ip(req: Request<()>) -> IpAddr {
        let (mut parts, ()) = req.into_parts();
        let Ok(ClientIp(ip)) = ClientIp::from_request_parts(&mut parts, &()).await;
        ip
    }

    #[tokio::test]
    async fn test_client_ip_from_x_forwarded_for() {
        let req = Request::builder()
            .header("X-Forwarded-For", "203.0.113.1, 198.51.100.1")
            .body(())
            .expect("Valid request");

        assert_eq!(client_ip(req).await.to_string(), "203.0.113.1");
    }

    #[tokio::test]
    async fn test_client_ip_from_x_real_ip() {
        let req = Request::builder()
            .header("X-Real-IP", "198.51.100.42")
            .body(())
            .expect("Valid request");

        assert_eq!(client_ip(req).await.to_string(), "198.51.100.42");
    }

    #[tokio::test]
    async fn test_client_ip_from_connection() {
        let mut req = Request::builder().body(()).expect("Valid request");
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 4242))));

        assert_eq!(client_ip(req).await.to_string(), "192.0.2.7");
    }

    #[tokio::test]
    async fn test_client_ip_fallback() {
        let req = Request::builder().body(()).expect("Valid request");
        assert_eq!(client_ip(req).await.to_string(), "127.0.0.1");
    }
}
