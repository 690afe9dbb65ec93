//! Outbound URL validation (SSRF defense).
//!
//! Every URL this crate dials must pass [`is_allowed`] first: the
//! configured service URL and any download URL extracted from a remote
//! response.
//!
//! # Known limitation
//!
//! The check is a literal denylist over the host string. It does not resolve
//! DNS, so a public hostname pointing at a private address (DNS rebinding)
//! is not caught. The rule set intentionally matches the behavior the task
//! administrators rely on rather than a full IP-resolution check.

use reqwest::Url;
use tracing::warn;

/// Host prefixes that denote loopback, private, or link-local ranges.
const BLOCKED_HOST_PREFIXES: &[&str] = &[
    "127.", "10.", "192.168.", "172.16.", "172.17.", "172.18.", "172.19.", "172.20.", "172.21.",
    "172.22.", "172.23.", "172.24.", "172.25.", "172.26.", "172.27.", "172.28.", "172.29.",
    "172.30.", "172.31.", "169.254.", "[fe80:",
];

/// Hosts rejected by exact match. IPv6 hosts come out of URL parsing in
/// bracketed form, so the loopback and unspecified addresses are listed
/// that way.
const BLOCKED_HOSTS: &[&str] = &["localhost", "0.0.0.0", "[::1]", "[::]"];

/// Returns true when `url` is safe to dial: well-formed, `http`/`https`,
/// and not addressed at a loopback/private/link-local host.
pub fn is_allowed(url: &str) -> bool {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(url, error = %e, "rejecting malformed URL");
            return false;
        }
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            warn!(url, scheme, "rejecting URL with disallowed scheme");
            return false;
        }
    }

    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host.to_ascii_lowercase(),
        _ => {
            warn!(url, "rejecting URL with empty host");
            return false;
        }
    };

    if BLOCKED_HOSTS.contains(&host.as_str())
        || BLOCKED_HOST_PREFIXES.iter().any(|p| host.starts_with(p))
    {
        warn!(host, "rejecting URL addressed at a restricted host");
        return false;
    }

    true
}
