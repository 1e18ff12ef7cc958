//! Static route table.
//!
//! Built once at startup from configuration and shared read-only across all
//! in-flight requests; there is no runtime mutation path.
use std::collections::HashMap;

use crate::config::models::RouteRule;

/// Longest-prefix routing over a fixed rule set.
#[derive(Debug, Clone)]
pub struct RouteTable {
    // Sorted by descending prefix length so the first hit is the longest
    // match. Upstream base URLs are normalized to have no trailing slash.
    rules: Vec<(String, RouteRule)>,
}

/// The outcome of matching a request path.
#[derive(Debug, Clone, Copy)]
pub struct RouteMatch<'a> {
    pub prefix: &'a str,
    pub rule: &'a RouteRule,
}

impl RouteTable {
    pub fn from_config(routes: &HashMap<String, RouteRule>) -> Self {
        let mut rules: Vec<(String, RouteRule)> = routes
            .iter()
            .map(|(prefix, rule)| {
                let mut rule = rule.clone();
                rule.upstream = rule.upstream.trim_end_matches('/').to_string();
                (prefix.clone(), rule)
            })
            .collect();
        rules.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self { rules }
    }

    /// Longest-prefix match for an incoming path. `None` means no rule
    /// covers the path and the request must not reach any upstream.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.rules
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(prefix, rule)| RouteMatch { prefix, rule })
    }

    /// Configured prefixes, longest first.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(prefix, _)| prefix.as_str())
    }

    /// Unique `(service, upstream)` pairs across all rules, for the health
    /// registry.
    pub fn upstreams(&self) -> Vec<(String, String)> {
        let mut seen: Vec<(String, String)> = Vec::new();
        for (_, rule) in &self.rules {
            let pair = (rule.service.clone(), rule.upstream.clone());
            if !seen.contains(&pair) {
                seen.push(pair);
            }
        }
        seen
    }

}

impl RouteMatch<'_> {
    /// Apply the matched rule's trailing-slash policy to the inbound path.
    ///
    /// Slash-preserving rules feed a Django-style upstream whose routes all
    /// end in `/`: the bare prefix gains a trailing slash, everything longer
    /// passes through untouched. Non-preserving rules feed an upstream whose
    /// routes never end in `/`: trailing slashes are stripped.
    pub fn rewrite_path(&self, path: &str) -> String {
        if self.rule.preserve_trailing_slash {
            if path == self.prefix && !path.ends_with('/') {
                format!("{path}/")
            } else {
                path.to_string()
            }
        } else if path.len() > 1 && path.ends_with('/') {
            path.trim_end_matches('/').to_string()
        } else {
            path.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(upstream: &str, service: &str, preserve: bool) -> RouteRule {
        RouteRule {
            upstream: upstream.to_string(),
            service: service.to_string(),
            preserve_trailing_slash: preserve,
            require_auth: false,
        }
    }

    fn table() -> RouteTable {
        let mut routes = HashMap::new();
        routes.insert(
            "/api/auth".to_string(),
            rule("http://127.0.0.1:8000", "identity", true),
        );
        routes.insert(
            "/api/media".to_string(),
            rule("http://127.0.0.1:8001/", "media", false),
        );
        routes.insert(
            "/media".to_string(),
            rule("http://127.0.0.1:8001", "media", false),
        );
        RouteTable::from_config(&routes)
    }

    #[test]
    fn longest_prefix_wins() {
        let table = table();
        let m = table.match_path("/api/media/17").unwrap();
        assert_eq!(m.prefix, "/api/media");
        assert_eq!(m.rule.service, "media");

        let m = table.match_path("/media/image/photo.jpg").unwrap();
        assert_eq!(m.prefix, "/media");
    }

    #[test]
    fn unmapped_path_does_not_match() {
        assert!(table().match_path("/metrics").is_none());
        assert!(table().match_path("/").is_none());
    }

    #[test]
    fn upstream_base_is_normalized() {
        let table = table();
        let m = table.match_path("/api/media").unwrap();
        assert_eq!(m.rule.upstream, "http://127.0.0.1:8001");
    }

    #[test]
    fn slash_preserving_rule_completes_bare_prefix() {
        let table = table();
        let m = table.match_path("/api/auth").unwrap();
        assert_eq!(m.rewrite_path("/api/auth"), "/api/auth/");
        assert_eq!(m.rewrite_path("/api/auth/login/"), "/api/auth/login/");
    }

    #[test]
    fn non_preserving_rule_strips_trailing_slash() {
        let table = table();
        let m = table.match_path("/api/media/").unwrap();
        assert_eq!(m.rewrite_path("/api/media/"), "/api/media");
        assert_eq!(m.rewrite_path("/api/media/17"), "/api/media/17");
    }

    #[test]
    fn policies_are_per_rule_not_global() {
        let table = table();
        let auth = table.match_path("/api/auth/profile/").unwrap();
        let media = table.match_path("/api/media/17/").unwrap();
        assert_eq!(auth.rewrite_path("/api/auth/profile/"), "/api/auth/profile/");
        assert_eq!(media.rewrite_path("/api/media/17/"), "/api/media/17");
    }

    #[test]
    fn upstreams_are_deduplicated() {
        let upstreams = table().upstreams();
        assert_eq!(upstreams.len(), 2);
        assert!(
            upstreams.contains(&("identity".to_string(), "http://127.0.0.1:8000".to_string()))
        );
        assert!(upstreams.contains(&("media".to_string(), "http://127.0.0.1:8001".to_string())));
    }
}
