//! Absolute URL construction for stored files.
//!
//! The media service embeds this resolver and calls it whenever it
//! serializes an entity carrying a file reference. Links are built from the
//! [`ForwardedContext`] the gateway stamped onto the request, so they point
//! at the address the client actually connected through rather than the
//! service's own bind address.
use url::Url;

use crate::core::forwarded::ForwardedContext;

/// Builds externally-reachable URLs for relative storage paths.
///
/// Resolution is deterministic: the same `(path, context)` pair always
/// yields a byte-identical string.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    fallback_base: Url,
}

impl UrlResolver {
    /// `fallback_base` is the service's configured public base URL, used
    /// only when a request carries no forwarded context at all.
    pub fn new(fallback_base: Url) -> Self {
        Self { fallback_base }
    }

    /// Parse the configured public base URL.
    pub fn from_base_str(base: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(base)?))
    }

    /// Produce `scheme://host[:port]/<storage_path>` from the original
    /// (leftmost) client-facing identity.
    ///
    /// A request with no context degrades to the configured base URL; the
    /// host is never fabricated.
    pub fn resolve(&self, storage_path: &str, context: Option<&ForwardedContext>) -> String {
        let path = storage_path.trim_start_matches('/');
        match context {
            Some(ctx) => format!("{}/{}", ctx.origin(), path),
            None => {
                tracing::warn!(
                    storage_path = %storage_path,
                    "no forwarded context; resolving against configured base URL"
                );
                let base = self.fallback_base.as_str().trim_end_matches('/');
                format!("{base}/{path}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderMap, HeaderValue};

    use super::*;
    use crate::core::forwarded::Scheme;

    fn resolver() -> UrlResolver {
        UrlResolver::from_base_str("http://localhost:3000").unwrap()
    }

    fn context_for_host(host: &str) -> ForwardedContext {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::HOST, HeaderValue::from_str(host).unwrap());
        ForwardedContext::from_request(&headers, None, Scheme::Http)
    }

    #[test]
    fn resolves_against_client_facing_host() {
        let ctx = context_for_host("192.168.1.50:3000");
        assert_eq!(
            resolver().resolve("media/image/photo.jpg", Some(&ctx)),
            "http://192.168.1.50:3000/media/image/photo.jpg"
        );
    }

    #[test]
    fn uses_leftmost_chain_entry_not_own_host() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::HOST,
            HeaderValue::from_static("127.0.0.1:3000"),
        );
        headers.insert("x-forwarded-host", HeaderValue::from_static("10.0.0.9"));
        let ctx = ForwardedContext::from_request(&headers, None, Scheme::Http);

        assert_eq!(
            resolver().resolve("media/image/photo.jpg", Some(&ctx)),
            "http://10.0.0.9/media/image/photo.jpg"
        );
    }

    #[test]
    fn is_idempotent() {
        let ctx = context_for_host("example.com");
        let resolver = resolver();
        let first = resolver.resolve("media/video/clip.mp4", Some(&ctx));
        let second = resolver.resolve("media/video/clip.mp4", Some(&ctx));
        assert_eq!(first, second);
    }

    #[test]
    fn missing_context_falls_back_to_configured_base() {
        assert_eq!(
            resolver().resolve("/media/audio/track.ogg", None),
            "http://localhost:3000/media/audio/track.ogg"
        );
    }
}
