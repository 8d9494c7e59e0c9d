//! Request identification helpers.
//!
//! # Responsibilities
//! - Generate a UUID v4 `x-request-id` for every request
//! - Derive the client IP, honouring trusted proxy hops only
//!
//! # Design Decisions
//! - X-Forwarded-For is attacker-controlled unless proxies are trusted
//!   explicitly; with zero trusted hops it is ignored
//! - With N trusted hops the address N entries from the socket peer wins,
//!   counting right to left

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::ConnectInfo,
    http::{HeaderMap, HeaderValue, Request},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Socket peer recorded by `into_make_service_with_connect_info`.
pub fn peer_addr<B>(request: &Request<B>) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Resolve the client address from the socket peer and forwarding headers.
pub fn client_ip(peer: IpAddr, headers: &HeaderMap, trusted_hops: usize) -> IpAddr {
    if trusted_hops == 0 {
        return peer;
    }

    // Closest hop first: the peer, then X-Forwarded-For right to left.
    let mut chain = vec![peer];
    let forwarded = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .collect::<Vec<_>>();

    for entry in forwarded.iter().rev() {
        match entry.parse::<IpAddr>() {
            Ok(ip) => chain.push(ip),
            Err(_) => break,
        }
    }

    chain[trusted_hops.min(chain.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(xff: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_str(xff).unwrap());
        headers
    }

    const PEER: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(10, 0, 0, 1));

    #[test]
    fn test_header_ignored_without_trust() {
        assert_eq!(client_ip(PEER, &headers("1.2.3.4"), 0), PEER);
    }

    #[test]
    fn test_one_trusted_hop_uses_rightmost_entry() {
        let ip = client_ip(PEER, &headers("6.6.6.6, 1.2.3.4"), 1);
        assert_eq!(ip, "1.2.3.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_two_trusted_hops() {
        let ip = client_ip(PEER, &headers("6.6.6.6, 1.2.3.4"), 2);
        assert_eq!(ip, "6.6.6.6".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_more_hops_than_entries_uses_furthest() {
        let ip = client_ip(PEER, &headers("1.2.3.4"), 5);
        assert_eq!(ip, "1.2.3.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_missing_header_falls_back_to_peer() {
        assert_eq!(client_ip(PEER, &HeaderMap::new(), 1), PEER);
    }

    #[test]
    fn test_garbage_entry_stops_chain() {
        let ip = client_ip(PEER, &headers("1.2.3.4, not-an-ip"), 1);
        assert_eq!(ip, PEER);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let request = Request::new(());
        let mut maker = MakeRequestUuid;
        let a = maker.make_request_id(&request).unwrap();
        let b = maker.make_request_id(&request).unwrap();
        assert_ne!(a.header_value(), b.header_value());
    }
}
