//! Request identity hashing for cache keys.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request identity (method + URL).
///
/// The method is compared case-insensitively and the URL fragment never
/// takes part in the key.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let url = url.split('#').next().unwrap_or(url);
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_request_key("GET", "https://example.com/index.html");
        let hash2 = compute_request_key("GET", "https://example.com/index.html");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_method_case_insensitive() {
        let upper = compute_request_key("GET", "https://example.com/");
        let lower = compute_request_key("get", "https://example.com/");
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_hash_different_method() {
        let get = compute_request_key("GET", "https://example.com/");
        let head = compute_request_key("HEAD", "https://example.com/");
        assert_ne!(get, head);
    }

    #[test]
    fn test_hash_ignores_fragment() {
        let plain = compute_request_key("GET", "https://example.com/index.html");
        let fragment = compute_request_key("GET", "https://example.com/index.html#print");
        assert_eq!(plain, fragment);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_request_key("GET", "https://example.com");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
