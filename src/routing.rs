//! Request-to-policy routing.
//!
//! This module determines which caching policy handles each request.
//! The table is intentionally simple — ordered rules, first match wins,
//! destination-based defaults when nothing matches. Resolution is pure
//! and synchronous; no rule evaluation ever touches the store or the
//! network.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::store::ExpirationPolicy;
use crate::strategy::StrategyKind;
use crate::types::{Destination, ResourceRequest, VersionToken};

/// Base name of the cache serving page documents by default.
pub const PAGES_CACHE: &str = "pages";
/// Base name of the catch-all runtime cache.
pub const RUNTIME_CACHE: &str = "runtime";

/// Match predicate of a routing rule.
#[derive(Clone)]
pub enum RoutePattern {
    /// URL string starts with the given prefix.
    UrlPrefix(String),
    /// URL string ends with the given suffix (e.g. `".woff2"`).
    UrlSuffix(String),
    /// URL string contains the given fragment.
    UrlContains(String),
    /// Request carries this destination tag.
    Destination(Destination),
    /// Arbitrary predicate over the whole request.
    Predicate(Arc<dyn Fn(&ResourceRequest) -> bool + Send + Sync>),
}

impl RoutePattern {
    pub fn matches(&self, request: &ResourceRequest) -> bool {
        match self {
            RoutePattern::UrlPrefix(prefix) => request.url.as_str().starts_with(prefix),
            RoutePattern::UrlSuffix(suffix) => request.url.as_str().ends_with(suffix),
            RoutePattern::UrlContains(fragment) => request.url.as_str().contains(fragment),
            RoutePattern::Destination(destination) => request.destination == *destination,
            RoutePattern::Predicate(predicate) => predicate(request),
        }
    }
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutePattern::UrlPrefix(p) => write!(f, "UrlPrefix({p:?})"),
            RoutePattern::UrlSuffix(s) => write!(f, "UrlSuffix({s:?})"),
            RoutePattern::UrlContains(c) => write!(f, "UrlContains({c:?})"),
            RoutePattern::Destination(d) => write!(f, "Destination({d:?})"),
            RoutePattern::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// One routing rule: pattern → (strategy, cache, bounds).
#[derive(Debug, Clone)]
pub struct Route {
    pattern: RoutePattern,
    strategy: StrategyKind,
    cache: String,
    expiration: Option<ExpirationPolicy>,
    timeout: Option<Duration>,
}

impl Route {
    /// Route requests matching `pattern` to `strategy` against the cache
    /// with base name `cache`.
    pub fn new(pattern: RoutePattern, strategy: StrategyKind, cache: impl Into<String>) -> Self {
        Self {
            pattern,
            strategy,
            cache: cache.into(),
            expiration: None,
            timeout: None,
        }
    }

    /// Bound the target cache with an expiration policy.
    pub fn expiration(mut self, policy: ExpirationPolicy) -> Self {
        self.expiration = Some(policy);
        self
    }

    /// Override the network timeout for this route.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A fully resolved policy for one request: the strategy to run, the
/// version-qualified cache to run it against, and any bounds.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub strategy: StrategyKind,
    pub cache: String,
    pub expiration: Option<ExpirationPolicy>,
    pub timeout: Option<Duration>,
}

/// Ordered routing table with destination-based defaults.
#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
    version: VersionToken,
}

impl RouteTable {
    pub fn new(version: VersionToken) -> Self {
        Self {
            routes: Vec::new(),
            version,
        }
    }

    /// Append a rule. Rules are evaluated in push order.
    pub fn push(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Resolve a request to a policy.
    ///
    /// Returns `None` for non-read-only requests — those bypass the
    /// gateway entirely. Read-only requests always resolve: unmatched
    /// documents default to network-first against the pages cache, and
    /// everything else defaults to stale-while-revalidate against the
    /// runtime cache.
    pub fn resolve(&self, request: &ResourceRequest) -> Option<ResolvedRoute> {
        if !request.is_read_only() {
            return None;
        }

        for route in &self.routes {
            if route.pattern.matches(request) {
                return Some(ResolvedRoute {
                    strategy: route.strategy,
                    cache: self.version.qualify(&route.cache),
                    expiration: route.expiration.clone(),
                    timeout: route.timeout,
                });
            }
        }

        let (strategy, cache) = match request.destination {
            Destination::Document => (StrategyKind::NetworkFirst, PAGES_CACHE),
            _ => (StrategyKind::StaleWhileRevalidate, RUNTIME_CACHE),
        };
        Some(ResolvedRoute {
            strategy,
            cache: self.version.qualify(cache),
            expiration: None,
            timeout: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Method;
    use url::Url;

    fn request(url: &str, destination: Destination) -> ResourceRequest {
        ResourceRequest::get(Url::parse(url).unwrap()).destination(destination)
    }

    fn table() -> RouteTable {
        let mut table = RouteTable::new(VersionToken::new("v1"));
        table.push(Route::new(
            RoutePattern::UrlSuffix(".png".into()),
            StrategyKind::CacheFirst,
            "images",
        ));
        table.push(Route::new(
            RoutePattern::Destination(Destination::Image),
            StrategyKind::StaleWhileRevalidate,
            "media",
        ));
        table
    }

    #[test]
    fn first_match_wins() {
        let table = table();
        // Matches both rules; the suffix rule is declared first.
        let resolved = table
            .resolve(&request("https://a.example/x.png", Destination::Image))
            .unwrap();
        assert_eq!(resolved.strategy, StrategyKind::CacheFirst);
        assert_eq!(resolved.cache, "images-v1");
    }

    #[test]
    fn destination_rule_matches_when_suffix_does_not() {
        let table = table();
        let resolved = table
            .resolve(&request("https://a.example/x.jpg", Destination::Image))
            .unwrap();
        assert_eq!(resolved.cache, "media-v1");
    }

    #[test]
    fn document_default_is_network_first() {
        let table = table();
        let resolved = table
            .resolve(&request("https://a.example/", Destination::Document))
            .unwrap();
        assert_eq!(resolved.strategy, StrategyKind::NetworkFirst);
        assert_eq!(resolved.cache, "pages-v1");
    }

    #[test]
    fn general_default_is_stale_while_revalidate() {
        let table = table();
        let resolved = table
            .resolve(&request("https://a.example/data", Destination::Api))
            .unwrap();
        assert_eq!(resolved.strategy, StrategyKind::StaleWhileRevalidate);
        assert_eq!(resolved.cache, "runtime-v1");
    }

    #[test]
    fn non_read_only_bypasses() {
        let table = table();
        let req = ResourceRequest::new(
            Method::Post,
            Url::parse("https://a.example/api/share").unwrap(),
            Destination::Api,
        );
        assert!(table.resolve(&req).is_none());
    }

    #[test]
    fn predicate_pattern() {
        let mut table = RouteTable::new(VersionToken::new("v1"));
        table.push(Route::new(
            RoutePattern::Predicate(Arc::new(|req: &ResourceRequest| {
                req.url.path().starts_with("/api/")
            })),
            StrategyKind::NetworkFirst,
            "api",
        ));
        let resolved = table
            .resolve(&request("https://a.example/api/phrases", Destination::Api))
            .unwrap();
        assert_eq!(resolved.cache, "api-v1");
    }
}
