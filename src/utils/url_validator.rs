//! Validation of URLs submitted for shortening.

use url::Url;

/// Reasons a submitted URL is rejected.
#[derive(Debug, thiserror::Error)]
pub enum InvalidUrl {
    #[error("URL must not be empty")]
    Empty,

    #[error("Invalid URL format: {0}")]
    Malformed(#[from] url::ParseError),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedScheme,

    #[error("URL must include a host")]
    MissingHost,
}

/// Checks that `input` is an absolute HTTP(S) URL with a host.
///
/// Returns the URL as `url` serializes it, so hostnames are lowercased and
/// default ports dropped. The same address therefore always hits the same
/// reverse-index entry. Path, query and fragment are kept verbatim.
///
/// # Errors
///
/// See [`InvalidUrl`].
pub fn validate_url(input: &str) -> Result<String, InvalidUrl> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(InvalidUrl::Empty);
    }

    let url = Url::parse(trimmed)?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(InvalidUrl::UnsupportedScheme);
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(InvalidUrl::MissingHost);
    }

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_https() {
        assert_eq!(
            validate_url("https://example.com/x").unwrap(),
            "https://example.com/x"
        );
    }

    #[test]
    fn test_lowercases_host_and_drops_default_port() {
        assert_eq!(
            validate_url("HTTPS://EXAMPLE.COM:443/Path?q=1").unwrap(),
            "https://example.com/Path?q=1"
        );
    }

    #[test]
    fn test_keeps_non_default_port() {
        assert_eq!(
            validate_url("http://localhost:8080/a").unwrap(),
            "http://localhost:8080/a"
        );
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(
            validate_url("  https://example.com/  ").unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(validate_url(""), Err(InvalidUrl::Empty)));
        assert!(matches!(validate_url("   "), Err(InvalidUrl::Empty)));
    }

    #[test]
    fn test_rejects_relative() {
        assert!(matches!(
            validate_url("/just/a/path"),
            Err(InvalidUrl::Malformed(_))
        ));
        assert!(matches!(validate_url("not-a-url"), Err(InvalidUrl::Malformed(_))));
    }

    #[test]
    fn test_rejects_other_schemes() {
        for input in ["ftp://example.com", "javascript:alert(1)", "mailto:a@b.c"] {
            assert!(
                matches!(validate_url(input), Err(InvalidUrl::UnsupportedScheme)),
                "{} should be rejected",
                input
            );
        }
    }
}
