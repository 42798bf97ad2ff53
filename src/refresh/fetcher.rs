//! Collaborators supplied by the host: URL normalization and count fetching.
//!
//! The refresh protocol only depends on two contracts:
//!
//! - [`UrlNormalizer`] turns a tab URL into the key used for fetching and
//!   caching, or rejects pages that must not be queried.
//! - [`AnnotationCountFetcher`] asynchronously returns the count for a
//!   normalized URL.
//!
//! [`BadgeUriPolicy`] is the default normalizer. [`BadgeApi`] builds badge
//! requests and parses their responses for fetchers that talk to an
//! annotation service over HTTP.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Hosts whose pages never get a badge request.
const DEFAULT_BLOCKED_HOSTS: &[&str] = &["facebook.com", "www.facebook.com", "mail.google.com"];

/// Schemes eligible for badge requests.
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Path of the badge endpoint relative to the service root.
const BADGE_PATH: &str = "api/badge";

// ============================================================================
// Traits
// ============================================================================

/// Maps a tab URL to the key used to fetch and cache its count.
pub trait UrlNormalizer: Send + Sync {
    /// Normalizes `url`.
    ///
    /// # Errors
    ///
    /// Returns a URL policy error for invalid or blocked pages.
    fn normalize(&self, url: &str) -> Result<String>;
}

/// Fetches the annotation count for a normalized URL.
#[async_trait]
pub trait AnnotationCountFetcher: Send + Sync {
    /// Returns the number of annotations for `uri`.
    ///
    /// # Errors
    ///
    /// Any error resolves the tab's count to zero; it is not retried.
    async fn fetch_count(&self, uri: &str) -> Result<u64>;
}

#[async_trait]
impl<F: AnnotationCountFetcher + ?Sized> AnnotationCountFetcher for Arc<F> {
    async fn fetch_count(&self, uri: &str) -> Result<u64> {
        (**self).fetch_count(uri).await
    }
}

// ============================================================================
// BadgeUriPolicy
// ============================================================================

/// Default [`UrlNormalizer`].
///
/// Accepts `http`/`https` pages whose host is not blocked, and strips the
/// fragment so in-page navigation shares one cache entry.
#[derive(Debug, Clone)]
pub struct BadgeUriPolicy {
    blocked_hosts: FxHashSet<String>,
}

impl Default for BadgeUriPolicy {
    fn default() -> Self {
        Self::with_blocked_hosts(DEFAULT_BLOCKED_HOSTS.iter().copied())
    }
}

impl BadgeUriPolicy {
    /// Creates a policy with a custom host block list.
    #[must_use]
    pub fn with_blocked_hosts(hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            blocked_hosts: hosts
                .into_iter()
                .map(|h| h.into().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Adds a host to the block list.
    #[must_use]
    pub fn block_host(mut self, host: impl Into<String>) -> Self {
        self.blocked_hosts.insert(host.into().to_ascii_lowercase());
        self
    }

    /// Returns `true` if `host` is blocked.
    #[inline]
    #[must_use]
    pub fn is_blocked_host(&self, host: &str) -> bool {
        self.blocked_hosts.contains(host)
    }
}

impl UrlNormalizer for BadgeUriPolicy {
    fn normalize(&self, url: &str) -> Result<String> {
        let mut parsed = Url::parse(url).map_err(|e| Error::invalid_url(url, e))?;

        if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
            return Err(Error::blocked_protocol(parsed.scheme()));
        }

        if let Some(host) = parsed.host_str()
            && self.is_blocked_host(host)
        {
            return Err(Error::blocked_host(host));
        }

        parsed.set_fragment(None);
        Ok(parsed.into())
    }
}

// ============================================================================
// BadgeApi
// ============================================================================

/// Badge endpoint response body.
#[derive(Debug, Deserialize)]
struct BadgeResponse {
    total: u64,
}

/// Request/response helpers for an annotation service badge endpoint.
///
/// ```ignore
/// let api = BadgeApi::new("https://hypothes.is")?;
/// let request = api.request_url("https://example.com/");
/// // GET request, then:
/// let count = BadgeApi::parse_response(&body)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeApi {
    service: String,
}

impl BadgeApi {
    /// Creates helpers for the service rooted at `service_url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `service_url` does not parse.
    pub fn new(service_url: &str) -> Result<Self> {
        let parsed = Url::parse(service_url).map_err(|e| Error::invalid_url(service_url, e))?;
        Ok(Self {
            service: parsed.as_str().trim_end_matches('/').to_owned(),
        })
    }

    /// Returns the badge request URL for a normalized page URI.
    #[must_use]
    pub fn request_url(&self, uri: &str) -> String {
        format!(
            "{}/{BADGE_PATH}?uri={}",
            self.service,
            urlencoding::encode(uri)
        )
    }

    /// Parses a badge response body into a count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the body is not `{"total": <count>}`.
    pub fn parse_response(body: &str) -> Result<u64> {
        let response: BadgeResponse = serde_json::from_str(body)?;
        Ok(response.total)
    }
}

// ============================================================================
// Tests
// ============================================================================
