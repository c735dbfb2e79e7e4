//! Client IP extraction from HTTP headers with trust validation
//!
//! Forwarding headers are only believed according to the configured trust
//! mode:
//! - `none`: the socket remote address is the client
//! - `cloudflare`: `CF-Connecting-IP`
//! - `standard`: RFC 7239 `Forwarded`, then `X-Forwarded-For`, walked
//!   right-to-left past trusted proxies

use axum::http::HeaderMap;
use std::net::IpAddr;
use tracing::warn;

use crate::config::{ClientIpConfig, TrustedProxyMode};

/// Extract the client IP address from HTTP headers
///
/// # Arguments
/// * `headers` - HTTP request headers
/// * `socket_addr` - The socket remote address (fallback)
/// * `config` - Trust configuration
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<IpAddr>,
    config: &ClientIpConfig,
) -> Option<IpAddr> {
    match config.trusted_proxy_mode {
        TrustedProxyMode::Cloudflare => extract_cloudflare_ip(headers).or_else(|| {
            warn!("CF-Connecting-IP header missing in Cloudflare mode, using socket address");
            socket_addr
        }),
        TrustedProxyMode::Standard => {
            // Headers from an untrusted peer are attacker-controlled.
            if let Some(peer) = socket_addr {
                if !config.trusted_proxies.is_empty() && !is_trusted(peer, config) {
                    return Some(peer);
                }
            }
            extract_standard_ip(headers, config).or(socket_addr)
        }
        TrustedProxyMode::None => socket_addr,
    }
}

/// Extract IP from Cloudflare-specific header
fn extract_cloudflare_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("cf-connecting-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

fn extract_standard_ip(headers: &HeaderMap, config: &ClientIpConfig) -> Option<IpAddr> {
    // Prefer RFC 7239 Forwarded header
    if let Some(chain) = forwarded_chain(headers) {
        return select_from_chain(&chain, config);
    }

    let chain = x_forwarded_for_chain(headers)?;
    select_from_chain(&chain, config)
}

/// `for=` addresses of a `Forwarded` header, in hop order
fn forwarded_chain(headers: &HeaderMap) -> Option<Vec<IpAddr>> {
    let forwarded = headers.get("forwarded")?.to_str().ok()?;

    let chain: Vec<IpAddr> = forwarded
        .split(',')
        .filter_map(|element| {
            element.split(';').find_map(|param| {
                let param = param.trim();
                let value = param
                    .strip_prefix("for=")
                    .or_else(|| param.strip_prefix("For="))?;
                parse_forwarded_node(value)
            })
        })
        .collect();

    if chain.is_empty() {
        None
    } else {
        Some(chain)
    }
}

/// Parse a `Forwarded` node: `1.2.3.4`, `1.2.3.4:80`, `"[2001:db8::1]:443"`
fn parse_forwarded_node(value: &str) -> Option<IpAddr> {
    let value = value.trim().trim_matches('"');
    if let Some(rest) = value.strip_prefix('[') {
        let (addr, _) = rest.split_once(']')?;
        return addr.parse().ok();
    }
    if let Ok(ip) = value.parse::<IpAddr>() {
        return Some(ip);
    }
    let (addr, _port) = value.rsplit_once(':')?;
    addr.parse().ok()
}

fn x_forwarded_for_chain(headers: &HeaderMap) -> Option<Vec<IpAddr>> {
    let xff = headers.get("x-forwarded-for")?.to_str().ok()?;

    let chain: Vec<IpAddr> = xff
        .split(',')
        .filter_map(|s| s.trim().parse::<IpAddr>().ok())
        .collect();

    if chain.is_empty() {
        None
    } else {
        Some(chain)
    }
}

/// Pick the client from a hop chain (leftmost = original client).
fn select_from_chain(chain: &[IpAddr], config: &ClientIpConfig) -> Option<IpAddr> {
    // If num_trusted_proxies is specified, skip that many from the right
    if let Some(num_trusted) = config.num_trusted_proxies {
        if chain.len() > num_trusted {
            return chain.get(chain.len() - num_trusted - 1).copied();
        }
        // Not enough hops in the chain, return the leftmost (least trusted)
        return chain.first().copied();
    }

    // Walk from the right past every trusted proxy
    if !config.trusted_proxies.is_empty() {
        return chain
            .iter()
            .rev()
            .find(|ip| !is_trusted(**ip, config))
            .or_else(|| chain.first())
            .copied();
    }

    // No trust configuration, return the rightmost IP
    chain.last().copied()
}

fn is_trusted(ip: IpAddr, config: &ClientIpConfig) -> bool {
    config.trusted_proxies.iter().any(|net| net.contains(&ip))
}
