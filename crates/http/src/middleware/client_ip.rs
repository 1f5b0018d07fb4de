//! Client identity as seen through a chain of reverse proxies.

use std::net::SocketAddr;

use axum::http::HeaderMap;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Key identifying the client behind `trusted_hops` proxies.
///
/// Each trusted proxy appends the address it received the request from to
/// `X-Forwarded-For`, so the client is the `trusted_hops`-th entry counted
/// from the right. Falls back to the TCP peer, then to `"unknown"`.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trusted_hops: usize) -> String {
    if trusted_hops > 0 {
        let forwarded: Vec<&str> = headers
            .get_all(FORWARDED_FOR)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect();

        if !forwarded.is_empty() {
            let index = forwarded.len().saturating_sub(trusted_hops);
            return forwarded[index].to_string();
        }
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}
