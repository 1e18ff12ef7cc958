//! Externally-visible request identity, carried through `X-Forwarded-*`
//! header chains.
//!
//! The gateway is usually the outermost proxy, but it may itself sit behind
//! another reverse proxy. Every hop appends its observed values to the
//! forwarded chain and the *first* (leftmost) entry stays authoritative: it
//! is what the end client actually typed into its address bar, so it is the
//! only value that produces links the client can reach. This is what keeps
//! media URLs working unchanged whether the client connects over localhost,
//! a LAN address, or a phone hotspot.
//!
//! A [`ForwardedContext`] is built exactly once per inbound request and only
//! read afterwards.
use std::{fmt, net::SocketAddr};

use http::{HeaderMap, HeaderValue, header};

pub const X_FORWARDED_HOST: &str = "x-forwarded-host";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// The URL scheme a client used to reach the deployment edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }

    fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The scheme/host/port the original client used, plus how many proxy hops
/// the request has crossed. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedContext {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
    hop_count: u32,
}

impl ForwardedContext {
    /// Derive the context for an inbound request.
    ///
    /// Resolution order:
    /// 1. the leftmost entry of an existing `X-Forwarded-Host` chain (with
    ///    the leftmost `X-Forwarded-Proto` entry, if any);
    /// 2. the literal `Host` header of this request;
    /// 3. the socket-level local address.
    ///
    /// Never fails: a missing or unparseable `Host` header degrades to the
    /// socket address instead of failing the request.
    pub fn from_request(
        headers: &HeaderMap,
        local_addr: Option<SocketAddr>,
        observed_scheme: Scheme,
    ) -> Self {
        if let Some((origin_host, hops)) = leftmost_forwarded_host(headers) {
            let scheme = leftmost_forwarded_proto(headers).unwrap_or(observed_scheme);
            let (host, port) = split_host_port(&origin_host);
            return Self {
                scheme,
                host,
                port,
                hop_count: hops,
            };
        }

        let raw = observed_host(headers, local_addr);
        let (host, port) = split_host_port(&raw);
        Self {
            scheme: observed_scheme,
            host,
            port,
            hop_count: 0,
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Number of proxy hops that had already stamped the chain when this
    /// context was built.
    pub fn hop_count(&self) -> u32 {
        self.hop_count
    }

    /// `scheme://host[:port]`, omitting the scheme's default port.
    pub fn origin(&self) -> String {
        match self.port {
            Some(port) if port != self.scheme.default_port() => {
                format!("{}://{}:{}", self.scheme, self.host, port)
            }
            _ => format!("{}://{}", self.scheme, self.host),
        }
    }
}

/// The host value this hop observes: the literal `Host` header when present
/// and readable, otherwise the socket-level local address.
pub fn observed_host(headers: &HeaderMap, local_addr: Option<SocketAddr>) -> String {
    if let Some(value) = headers.get(header::HOST)
        && let Ok(text) = value.to_str()
        && !text.trim().is_empty()
    {
        return text.trim().to_string();
    }

    match local_addr {
        Some(addr) => addr.to_string(),
        None => {
            tracing::warn!("no Host header and no socket address; using localhost");
            "localhost".to_string()
        }
    }
}

/// Append this hop's observations to the forwarded chain, preserving any
/// entries earlier proxies wrote. Existing values are extended with a
/// comma-separated entry, never replaced.
pub fn extend_chain(
    headers: &mut HeaderMap,
    observed_host: &str,
    observed_scheme: Scheme,
    peer: Option<SocketAddr>,
) {
    append_entry(headers, X_FORWARDED_HOST, observed_host);
    append_entry(headers, X_FORWARDED_PROTO, observed_scheme.as_str());
    if let Some(peer) = peer {
        append_entry(headers, X_FORWARDED_FOR, &peer.ip().to_string());
    }
}

fn append_entry(headers: &mut HeaderMap, name: &'static str, value: &str) {
    let combined = match headers.get(name).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}, {value}"),
        _ => value.to_string(),
    };
    match HeaderValue::from_str(&combined) {
        Ok(header_value) => {
            headers.insert(name, header_value);
        }
        Err(_) => {
            tracing::warn!(header = name, "dropping unrepresentable forwarded value");
        }
    }
}

fn leftmost_forwarded_host(headers: &HeaderMap) -> Option<(String, u32)> {
    let value = headers.get(X_FORWARDED_HOST)?.to_str().ok()?;
    let mut entries = value.split(',').map(str::trim).filter(|e| !e.is_empty());
    let first = entries.next()?.to_string();
    let hops = 1 + entries.count() as u32;
    Some((first, hops))
}

fn leftmost_forwarded_proto(headers: &HeaderMap) -> Option<Scheme> {
    let value = headers.get(X_FORWARDED_PROTO)?.to_str().ok()?;
    value.split(',').next().and_then(Scheme::parse)
}

/// Split `host[:port]`, handling bracketed IPv6 literals.
fn split_host_port(raw: &str) -> (String, Option<u16>) {
    let raw = raw.trim();
    if let Some(rest) = raw.strip_prefix('[') {
        // "[::1]:3000" or "[::1]"
        if let Some((addr, after)) = rest.split_once(']') {
            let port = after.strip_prefix(':').and_then(|p| p.parse().ok());
            return (format!("[{addr}]"), port);
        }
        return (raw.to_string(), None);
    }
    match raw.rsplit_once(':') {
        // More than one colon without brackets means a bare IPv6 address.
        Some((host, port)) if !host.contains(':') => match port.parse() {
            Ok(port) => (host.to_string(), Some(port)),
            Err(_) => (raw.to_string(), None),
        },
        _ => (raw.to_string(), None),
    }
}
