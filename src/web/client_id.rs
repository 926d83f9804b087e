// src/web/client_id.rs
use crate::rate_limit::UNKNOWN_CLIENT;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use std::convert::Infallible;
use std::net::IpAddr;

/// Rate-limit partition key for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentifier(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIdentifier {
    type Error = Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = req.headers();
        Outcome::Success(ClientIdentifier(client_identifier(
            headers.get_one("X-Forwarded-For"),
            headers.get_one("X-Real-IP"),
            req.remote().map(|addr| addr.ip()),
        )))
    }
}

/// First `X-Forwarded-For` entry, then `X-Real-IP`, then the peer address.
/// Callers with none of these share the `"unknown"` budget.
pub fn client_identifier(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    peer: Option<IpAddr>,
) -> String {
    let forwarded = forwarded_for
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let real_ip = real_ip.map(str::trim).filter(|value| !value.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_string)
        .or_else(|| peer.map(|ip| ip.to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        assert_eq!(
            client_identifier(Some(" 203.0.113.7 , 10.0.0.1"), Some("10.0.0.2"), None),
            "203.0.113.7"
        );
    }

    #[test]
    fn test_fallback_order() {
        let peer: IpAddr = "192.0.2.1".parse().unwrap();
        assert_eq!(client_identifier(None, Some("198.51.100.4"), Some(peer)), "198.51.100.4");
        assert_eq!(client_identifier(Some(" "), None, Some(peer)), "192.0.2.1");
        assert_eq!(client_identifier(None, None, None), UNKNOWN_CLIENT);
    }
}
