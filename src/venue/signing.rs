//! HMAC-SHA256 request signing for authenticated venue requests.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over `payload` using `secret`, hex-encoded. Empty string if
/// `secret` is empty (returns an empty string rather than signing).
#[must_use]
pub fn sign(payload: &str, secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Build the URL-encoded, key-sorted query string `sign` expects, from
/// already-stringified parameters.
#[must_use]
pub fn canonical_query_string(params: &std::collections::HashMap<String, String>) -> String {
    let mut pairs: Vec<(&String, &String)> = params.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", url_encode(k), url_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn url_encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_secret_yields_empty_signature() {
        assert_eq!(sign("a=1&b=2", ""), "");
    }

    #[test]
    fn signing_is_deterministic() {
        let a = sign("a=1&b=2", "secret");
        let b = sign("a=1&b=2", "secret");
        assert_eq!(a, b);
        assert_ne!(a, "");
    }

    #[test]
    fn canonical_query_string_is_key_sorted() {
        let mut params = HashMap::new();
        params.insert("b".to_string(), "2".to_string());
        params.insert("a".to_string(), "1".to_string());
        assert_eq!(canonical_query_string(&params), "a=1&b=2");
    }
}
