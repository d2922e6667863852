//! Request descriptors routed through the gateway.

use serde::{Deserialize, Serialize};
use url::Url;

/// HTTP method of an intercepted request.
///
/// Only [`Method::Get`] and [`Method::Head`] are routed through caching;
/// everything else bypasses the gateway and goes straight to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    /// Whether the method is side-effect-free and therefore cacheable.
    pub fn is_read_only(self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

/// Resource class of an intercepted request, as reported by the hosting
/// application (the equivalent of a fetch destination tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Style,
    Script,
    Image,
    Font,
    Api,
    Other,
}

/// An intercepted outbound request.
///
/// The `(method, url)` pair is the canonical cache identity; the
/// destination only influences routing defaults and fallback selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
}

impl ResourceRequest {
    pub fn new(method: Method, url: Url, destination: Destination) -> Self {
        Self {
            method,
            url,
            destination,
        }
    }

    /// A plain GET request with no particular destination.
    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url, Destination::Other)
    }

    /// A GET request for a page document.
    pub fn document(url: Url) -> Self {
        Self::new(Method::Get, url, Destination::Document)
    }

    /// Set the destination tag, builder-style.
    pub fn destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Whether this request may be resolved through the caching gateway.
    pub fn is_read_only(&self) -> bool {
        self.method.is_read_only()
    }

    /// Canonical cache key: `"METHOD url"`.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method.as_str(), self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn get_and_head_are_read_only() {
        assert!(Method::Get.is_read_only());
        assert!(Method::Head.is_read_only());
        assert!(!Method::Post.is_read_only());
        assert!(!Method::Delete.is_read_only());
    }

    #[test]
    fn cache_key_includes_method_and_url() {
        let req = ResourceRequest::get(parse("https://app.example/a.css"));
        assert_eq!(req.cache_key(), "GET https://app.example/a.css");
    }

    #[test]
    fn cache_key_distinguishes_methods() {
        let url = parse("https://app.example/x");
        let get = ResourceRequest::get(url.clone());
        let head = ResourceRequest::new(Method::Head, url, Destination::Other);
        assert_ne!(get.cache_key(), head.cache_key());
    }

    #[test]
    fn document_constructor_sets_destination() {
        let req = ResourceRequest::document(parse("https://app.example/"));
        assert_eq!(req.destination, Destination::Document);
    }
}
