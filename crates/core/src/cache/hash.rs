//! Request identity and cache key generation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// The identity a cache entry is addressed by: method plus canonical URL.
///
/// Construct through [`RequestIdentity::new`] so the method is always
/// uppercased; URL canonicalization is the caller's job (see the client's
/// `fetch::url::resolve`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestIdentity {
    method: String,
    url: String,
}

impl RequestIdentity {
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self { method: method.trim().to_ascii_uppercase(), url: url.into() }
    }

    /// Shorthand for a `GET` identity.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Storage key for this identity.
    pub fn key(&self) -> String {
        compute_cache_key(&self.method, &self.url)
    }
}

impl fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Compute the cache key for a request identity.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
