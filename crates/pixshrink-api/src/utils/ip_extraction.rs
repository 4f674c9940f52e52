//! Client IP extraction
//!
//! Forwarding headers are only honoured when at least one trusted proxy sits
//! in front of the service; otherwise they could be spoofed by the client.

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

const UNKNOWN: &str = "unknown";

/// Best-effort client address, or `"unknown"`.
///
/// Each trusted proxy appends the address it received the request from, so
/// with `trusted_proxy_count` N the client is the N-th `X-Forwarded-For`
/// entry counted from the end.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if trusted_proxy_count > 0 {
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| from_forwarded_for(v, trusted_proxy_count))
        {
            return ip;
        }

        if let Some(ip) = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| v.parse::<IpAddr>().is_ok())
        {
            return ip.to_string();
        }
    }

    socket_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn from_forwarded_for(value: &str, trusted_proxy_count: usize) -> Option<String> {
    let ips: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    // Fewer entries than proxies: the first hop is the best we have.
    let index = ips.len().saturating_sub(trusted_proxy_count);
    ips.get(index)
        .filter(|ip| ip.parse::<IpAddr>().is_ok())
        .map(|ip| ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(xff: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(xff).unwrap());
        headers
    }

    #[test]
    fn test_single_proxy_takes_last_entry() {
        let h = headers("203.0.113.5, 10.0.0.2");
        assert_eq!(extract_client_ip(&h, None, 1), "10.0.0.2");
    }

    #[test]
    fn test_two_proxies_skip_their_entries() {
        let h = headers("203.0.113.5, 10.0.0.2");
        assert_eq!(extract_client_ip(&h, None, 2), "203.0.113.5");
        assert_eq!(extract_client_ip(&h, None, 5), "203.0.113.5");
    }

    #[test]
    fn test_headers_ignored_without_trusted_proxies() {
        let h = headers("203.0.113.5");
        let addr: SocketAddr = "192.0.2.1:4000".parse().unwrap();
        assert_eq!(extract_client_ip(&h, Some(&addr), 0), "192.0.2.1");
    }

    #[test]
    fn test_invalid_entries_fall_back() {
        let h = headers("not-an-ip");
        assert_eq!(extract_client_ip(&h, None, 1), "unknown");
    }

    #[test]
    fn test_real_ip_header() {
        let mut h = HeaderMap::new();
        h.insert("x-real-ip", HeaderValue::from_static(" 198.51.100.7 "));
        assert_eq!(extract_client_ip(&h, None, 1), "198.51.100.7");
    }
}
