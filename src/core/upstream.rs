use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicBool, AtomicI64, Ordering},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors related to upstream definitions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Error when URL is invalid
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),
}

/// Result type for upstream operations
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// A type-safe representation of an upstream base URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpstreamUrl {
    url: String,
    is_secure: bool,
}

impl UpstreamUrl {
    /// Creates a new UpstreamUrl if the provided string is a valid base URL.
    pub fn new(url: &str) -> UpstreamResult<Self> {
        let is_secure = url.starts_with("https://");
        let is_http = url.starts_with("http://");

        if !is_secure && !is_http {
            return Err(UpstreamError::InvalidUrl(format!(
                "Upstream URL must start with http:// or https://, got: {url}"
            )));
        }

        Ok(UpstreamUrl {
            url: url.trim_end_matches('/').to_string(),
            is_secure,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn is_secure(&self) -> bool {
        self.is_secure
    }
}

impl FromStr for UpstreamUrl {
    type Err = UpstreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UpstreamUrl::new(s)
    }
}

impl fmt::Display for UpstreamUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Reachability state of one upstream service.
///
/// Updated by the health checker, read by the `/health` endpoint; all fields
/// are atomics so no lock sits on either path. A service starts reachable
/// and is marked unreachable by the first failed probe.
#[derive(Debug)]
pub struct UpstreamHealth {
    service: String,
    url: UpstreamUrl,
    reachable: AtomicBool,
    /// Unix millis of the last completed probe; 0 means never probed.
    last_checked: AtomicI64,
}

impl UpstreamHealth {
    pub fn new(service: impl Into<String>, url: UpstreamUrl) -> Self {
        Self {
            service: service.into(),
            url,
            reachable: AtomicBool::new(true),
            last_checked: AtomicI64::new(0),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn url(&self) -> &UpstreamUrl {
        &self.url
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Acquire)
    }

    pub fn mark_reachable(&self) {
        self.reachable.store(true, Ordering::Release);
        self.stamp();
    }

    pub fn mark_unreachable(&self) {
        self.reachable.store(false, Ordering::Release);
        self.stamp();
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        match self.last_checked.load(Ordering::Acquire) {
            0 => None,
            millis => DateTime::<Utc>::from_timestamp_millis(millis),
        }
    }

    /// Point-in-time copy for serialization.
    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            service: self.service.clone(),
            reachable: self.is_reachable(),
            last_checked_at: self.last_checked_at(),
        }
    }

    fn stamp(&self) {
        self.last_checked
            .store(Utc::now().timestamp_millis(), Ordering::Release);
    }
}

/// Serializable per-service health entry reported by `GET /health`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub service: String,
    pub reachable: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
}
