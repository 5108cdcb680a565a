//! Target validation for the proxy endpoint.
//!
//! # Responsibilities
//! - Require a non-empty `url` query value
//! - Parse it as an absolute URL
//! - Restrict the scheme to `http` / `https`
//!
//! Once validated the URL is handed downstream as-is and never re-checked.

use url::Url;

use crate::error::ProxyError;

/// Schemes the proxy is willing to fetch.
pub const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Validate the caller-supplied target reference.
pub fn validate_target(raw: Option<&str>) -> Result<Url, ProxyError> {
    let raw = match raw {
        Some(value) if !value.is_empty() => value,
        _ => return Err(ProxyError::MissingParameter),
    };

    let url = Url::parse(raw).map_err(ProxyError::InvalidUrl)?;

    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(ProxyError::DisallowedScheme(url.scheme().to_string()));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_or_empty() {
        assert!(matches!(validate_target(None), Err(ProxyError::MissingParameter)));
        assert!(matches!(validate_target(Some("")), Err(ProxyError::MissingParameter)));
    }

    #[test]
    fn test_unparseable() {
        for raw in ["example.com", "/relative/path", "http://", "::::", "http://exa mple.com"] {
            assert!(
                matches!(validate_target(Some(raw)), Err(ProxyError::InvalidUrl(_))),
                "{raw:?} should be rejected as invalid"
            );
        }
    }

    #[test]
    fn test_disallowed_schemes() {
        for raw in [
            "ftp://example.com/file",
            "file:///etc/passwd",
            "javascript:alert(1)",
            "data:text/html,hi",
            "mailto:someone@example.com",
        ] {
            assert!(
                matches!(validate_target(Some(raw)), Err(ProxyError::DisallowedScheme(_))),
                "{raw:?} should be forbidden"
            );
        }
    }

    #[test]
    fn test_accepts_http_and_https() {
        let url = validate_target(Some("http://example.com/page")).unwrap();
        assert_eq!(url.as_str(), "http://example.com/page");

        let url = validate_target(Some("HTTPS://Example.com/a?b=c")).unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }
}
