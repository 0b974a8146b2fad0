//! # HTTP Transport
//!
//! Outbound HTTP for the REST bridge, with an optional in-memory cache that
//! dedupes identical GET requests so a chatty channel cannot flood an
//! upstream API with the same call.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.1.0

use anyhow::{Context as _, Result};
use dashmap::DashMap;
use log::debug;
use reqwest::Method;
use std::collections::HashMap;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Status and body of a completed upstream call.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP client with optional response caching.
///
/// The cache is keyed by URL, lives for the process, and only holds
/// successful GET responses; each command owns its own transport, so fixed
/// per-command headers never need to enter the key.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    cache: Option<DashMap<String, FetchedResponse>>,
}

impl HttpTransport {
    pub fn new(cached: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            cache: cached.then(DashMap::new),
        })
    }

    /// Issue a request, serving repeated GETs from cache where possible.
    pub async fn execute(
        &self,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<FetchedResponse> {
        let method = Method::from_bytes(method.to_uppercase().as_bytes())
            .with_context(|| format!("invalid HTTP method '{method}'"))?;
        let cacheable = method == Method::GET;

        if cacheable {
            if let Some(cache) = &self.cache {
                if let Some(hit) = cache.get(url) {
                    debug!("cache hit for {url}");
                    return Ok(hit.clone());
                }
            }
        }

        let mut request = self.client.request(method, url);
        for (key, value) in headers {
            request = request.header(key, value);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read response body from {url}"))?;
        let fetched = FetchedResponse { status, body };

        if cacheable && fetched.status == 200 {
            if let Some(cache) = &self.cache {
                cache.insert(url.to_string(), fetched.clone());
            }
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn cached_transport_dedupes_identical_gets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"n\":1}"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(true).unwrap();
        let url = format!("{}/data", server.uri());
        let first = transport.execute("GET", &url, &HashMap::new()).await.unwrap();
        let second = transport.execute("GET", &url, &HashMap::new()).await.unwrap();
        assert_eq!(first.body, second.body);
        assert_eq!(second.status, 200);
    }

    #[tokio::test]
    async fn uncached_transport_hits_upstream_every_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(2)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(false).unwrap();
        let url = format!("{}/data", server.uri());
        transport.execute("GET", &url, &HashMap::new()).await.unwrap();
        transport.execute("GET", &url, &HashMap::new()).await.unwrap();
    }

    #[tokio::test]
    async fn error_responses_are_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(true).unwrap();
        let url = format!("{}/flaky", server.uri());
        let first = transport.execute("GET", &url, &HashMap::new()).await.unwrap();
        assert_eq!(first.status, 500);
        transport.execute("GET", &url, &HashMap::new()).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_method_is_rejected() {
        let transport = HttpTransport::new(false).unwrap();
        let err = transport
            .execute("NOT A METHOD", "http://localhost/x", &HashMap::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid HTTP method"));
    }
}
