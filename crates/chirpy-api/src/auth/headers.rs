//! Credential extraction from HTTP headers
//!
//! Both schemes share one contract: the `Authorization` header must be
//! present and start exactly with the scheme prefix (case-sensitive, one
//! space). Whatever follows is returned trimmed, possibly empty.

use axum::http::{header, HeaderMap};
use thiserror::Error;

const BEARER_PREFIX: &str = "Bearer ";
const API_KEY_PREFIX: &str = "ApiKey ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("Missing Authorization header")]
    Missing,

    #[error("Malformed Authorization header")]
    Malformed,
}

/// Extract a bearer credential (session or refresh token)
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, HeaderError> {
    extract_with_prefix(headers, BEARER_PREFIX)
}

/// Extract a webhook API key
pub fn extract_api_key(headers: &HeaderMap) -> Result<String, HeaderError> {
    extract_with_prefix(headers, API_KEY_PREFIX)
}

/// Compare an extracted API key with the configured one in constant time
pub fn api_key_matches(expected: &str, provided: &str) -> bool {
    let (a, b) = (expected.as_bytes(), provided.as_bytes());
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn extract_with_prefix(headers: &HeaderMap, prefix: &str) -> Result<String, HeaderError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(HeaderError::Missing)?
        .to_str()
        .map_err(|_| HeaderError::Malformed)?;

    value
        .strip_prefix(prefix)
        .map(|rest| rest.trim().to_string())
        .ok_or(HeaderError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_is_extracted_and_trimmed() {
        assert_eq!(extract_bearer(&with_auth("Bearer abc")), Ok("abc".to_string()));
        assert_eq!(
            extract_bearer(&with_auth("Bearer   abc  ")),
            Ok("abc".to_string())
        );
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(extract_bearer(&HeaderMap::new()), Err(HeaderError::Missing));
        assert_eq!(extract_api_key(&HeaderMap::new()), Err(HeaderError::Missing));
    }

    #[test]
    fn test_wrong_scheme_is_malformed() {
        assert_eq!(extract_bearer(&with_auth("Basic abc")), Err(HeaderError::Malformed));
        assert_eq!(extract_bearer(&with_auth("bearer abc")), Err(HeaderError::Malformed));
        assert_eq!(extract_bearer(&with_auth("Bearer")), Err(HeaderError::Malformed));
        assert_eq!(extract_bearer(&with_auth("ApiKey abc")), Err(HeaderError::Malformed));
    }

    #[test]
    fn test_prefix_with_nothing_after_is_empty() {
        assert_eq!(extract_bearer(&with_auth("Bearer ")), Ok(String::new()));
    }

    #[test]
    fn test_api_key() {
        assert_eq!(
            extract_api_key(&with_auth("ApiKey f271c81ff7084ee5b99a5091b42d486e")),
            Ok("f271c81ff7084ee5b99a5091b42d486e".to_string())
        );
        assert_eq!(extract_api_key(&with_auth("Bearer abc")), Err(HeaderError::Malformed));
    }

    #[test]
    fn test_api_key_matches() {
        assert!(api_key_matches("f271c81f", "f271c81f"));
        assert!(!api_key_matches("f271c81f", "f271c81e"));
        assert!(!api_key_matches("f271c81f", "f271c81"));
        assert!(!api_key_matches("f271c81f", ""));
    }

    #[test]
    fn test_non_utf8_value_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap(),
        );

        assert_eq!(extract_bearer(&headers), Err(HeaderError::Malformed));
    }
}
