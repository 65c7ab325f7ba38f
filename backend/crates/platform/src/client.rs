//! Client identification utilities
//!
//! Common functions for reading client-supplied HTTP headers.

use axum::http::{HeaderMap, header};

/// Header carrying the device MAC address
pub const MAC_ADDRESS_HEADER: &str = "mac-address";

/// Header carrying the client application version
pub const VERSION_HEADER: &str = "version";

/// Extract the bearer token from the `Authorization` header
///
/// The scheme is matched case-insensitively. Returns `None` when the header
/// is missing, not valid ASCII, uses another scheme, or carries an empty token.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Raw `Mac-Address` header value, trimmed
///
/// Format validation is left to the domain layer.
pub fn extract_mac_address(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(MAC_ADDRESS_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Raw `Version` header value, trimmed
pub fn extract_client_version(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer xyz"));
        assert_eq!(extract_bearer(&headers), Some("xyz"));
    }

    #[test]
    fn test_extract_bearer_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer(&headers), None);
    }

    #[test]
    fn test_extract_mac_address() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_mac_address(&headers), None);

        headers.insert(MAC_ADDRESS_HEADER, HeaderValue::from_static(" 00:1A:2b:3C:4d:5E "));
        assert_eq!(extract_mac_address(&headers), Some("00:1A:2b:3C:4d:5E"));
    }

    #[test]
    fn test_extract_client_version() {
        let mut headers = HeaderMap::new();
        headers.insert(VERSION_HEADER, HeaderValue::from_static("1.0"));
        assert_eq!(extract_client_version(&headers), Some("1.0"));
    }
}
