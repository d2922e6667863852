//! Network access behind a trait seam.
//!
//! [`NetworkFetcher`] is the gateway's only path to the network; the
//! [`HttpFetcher`] implementation wraps a shared [`reqwest::Client`].
//! Tests substitute counting mocks for it the same way providers are
//! mocked elsewhere in the crate.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::FafnirError;
use crate::types::{Method, ResourceRequest, StoredResponse};
use crate::Result;

/// A response as it came off the network, before any cache decision.
///
/// `final_url` is the URL after redirects — strategies compare its origin
/// against the requested origin before caching.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub final_url: Url,
}

impl FetchedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the response ended up on the same origin it was requested
    /// from (a cross-origin redirect fails this).
    pub fn same_origin_as(&self, url: &Url) -> bool {
        self.final_url.origin() == url.origin()
    }

    /// Convert into a cacheable response, stamping the capture time.
    pub fn into_stored(self) -> StoredResponse {
        StoredResponse::new(self.status, self.headers, self.body)
    }
}

/// Transport abstraction for outbound fetches.
///
/// Implementations must bound each fetch by `timeout`; an elapsed timeout
/// is reported as [`FafnirError::Timeout`] and treated identically to any
/// other network failure by callers.
#[async_trait]
pub trait NetworkFetcher: Send + Sync {
    async fn fetch(&self, request: &ResourceRequest, timeout: Duration)
    -> Result<FetchedResponse>;
}

/// [`NetworkFetcher`] backed by a shared reqwest client.
#[derive(Default, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing client (connection pool sharing).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Patch => reqwest::Method::PATCH,
    }
}

#[async_trait]
impl NetworkFetcher for HttpFetcher {
    async fn fetch(
        &self,
        request: &ResourceRequest,
        timeout: Duration,
    ) -> Result<FetchedResponse> {
        let send = self
            .client
            .request(to_reqwest_method(request.method), request.url.clone())
            .send();
        let response = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| FafnirError::Timeout { after: timeout })??;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_owned(), v.to_owned()))
            })
            .collect();
        let body = tokio::time::timeout(timeout, response.bytes())
            .await
            .map_err(|_| FafnirError::Timeout { after: timeout })??
            .to_vec();

        Ok(FetchedResponse {
            status,
            headers,
            body,
            final_url,
        })
    }
}
