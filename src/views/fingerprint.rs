//! Visitor pseudo-identity and day keys
//!
//! The fingerprint is a one-way SHA-256 digest of the visitor's network
//! address and user-agent. Raw addresses never reach the store.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::net::IpAddr;

const UNKNOWN_IP: &str = "unknown-ip";
const UNKNOWN_UA: &str = "unknown-ua";

/// Request attributes that identify a visitor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitorMetadata {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl VisitorMetadata {
    pub fn new(ip: Option<IpAddr>, user_agent: Option<String>) -> Self {
        Self { ip, user_agent }
    }
}

/// Hex-encoded `sha256("<ip>|<user-agent>")`, 64 characters
pub fn fingerprint(visitor: &VisitorMetadata) -> String {
    let ip = visitor
        .ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string());
    let ua = visitor
        .user_agent
        .as_deref()
        .filter(|ua| !ua.is_empty())
        .unwrap_or(UNKNOWN_UA);

    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hasher.update(b"|");
    hasher.update(ua.as_bytes());
    hex::encode(hasher.finalize())
}

/// UTC calendar date as `YYYY-MM-DD`
pub fn day_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}
