use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

/// Hex SHA-256 cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a whole bridge run. Parameters are hashed in sorted order, so
    /// the key does not depend on the order they were supplied in.
    pub fn for_request(bridge: &str, parameters: &BTreeMap<String, String>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"request\0");
        hasher.update(bridge.to_ascii_lowercase().as_bytes());
        for (name, value) in parameters {
            hasher.update([0u8]);
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Key for the body of a fetched page.
    pub fn for_url(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"url\0");
        hasher.update(url.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_request_key_ignores_parameter_order() {
        let a = CacheKey::for_request("AO3", &params(&[("url", "u"), ("range", "all")]));
        let b = CacheKey::for_request("AO3", &params(&[("range", "all"), ("url", "u")]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_request_key_depends_on_bridge_and_values() {
        let base = CacheKey::for_request("AO3", &params(&[("id", "1")]));
        assert_ne!(base, CacheKey::for_request("AO3", &params(&[("id", "2")])));
        assert_ne!(base, CacheKey::for_request("GQMagazine", &params(&[("id", "1")])));
        assert_eq!(base, CacheKey::for_request("ao3", &params(&[("id", "1")])));
    }

    #[test]
    fn test_url_key_differs_from_request_key() {
        let url = CacheKey::for_url("AO3");
        let request = CacheKey::for_request("AO3", &BTreeMap::new());
        assert_ne!(url, request);
        assert_eq!(url.as_str().len(), 64);
    }
}
