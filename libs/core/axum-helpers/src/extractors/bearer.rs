//! Bearer credential parsing.
//!
//! The value is not interpreted; it may be a signed JWT or an opaque device
//! token. Callers decide how to reject a missing credential.

use axum::http::{HeaderMap, header};

/// Pull the bearer credential out of the request headers, if any.
///
/// The scheme is matched case-insensitively and surrounding whitespace is
/// ignored. Empty credentials count as absent.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, credential) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let credential = credential.trim();
    (!credential.is_empty()).then(|| credential.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn test_extracts_bearer_credential() {
        assert_eq!(
            extract_bearer_token(&headers("Bearer abc123")),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_bearer_token(&headers("bearer   abc123 ")),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_rejects_other_schemes_and_empty_values() {
        assert_eq!(extract_bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_bearer_token(&headers("Bearer ")), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
