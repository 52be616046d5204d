//! Target URL validation and tracking URL construction.

use url::Url;

/// Errors that can occur while handling a target URL.
#[derive(Debug, thiserror::Error)]
pub enum UrlBuildError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("Failed to normalize URL: {0}")]
    NormalizationFailed(String),
}

/// Parses a redirect target into canonical form.
///
/// Only `http` and `https` are accepted. The host is lowercased, the default
/// port and any fragment are dropped; path and query are kept as given.
pub fn parse_target_url(input: &str) -> Result<Url, UrlBuildError> {
    let mut url = Url::parse(input).map_err(|e| UrlBuildError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlBuildError::UnsupportedProtocol),
    }

    if let Some(host) = url.host_str() {
        let host_lowercase = host.to_ascii_lowercase();
        url.set_host(Some(&host_lowercase)).map_err(|_| {
            UrlBuildError::NormalizationFailed("Failed to set normalized host".to_string())
        })?;
    }

    url.set_fragment(None);

    let is_default_port = matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    );
    if is_default_port {
        url.set_port(None).map_err(|_| {
            UrlBuildError::NormalizationFailed("Failed to remove default port".to_string())
        })?;
    }

    Ok(url)
}

/// Sets query parameters on `url`, replacing existing parameters with the
/// same name and keeping all others in their original order.
pub fn with_query_params(mut url: Url, params: &[(String, String)]) -> Url {
    if params.is_empty() {
        return url;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !params.iter().any(|(name, _)| name == key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (key, value) in kept.iter().chain(params.iter()) {
            query.append_pair(key, value);
        }
    }

    url
}

/// Public redirect URL for a short code: `{base}/ref/{short_code}`.
pub fn redirect_url(base: &str, short_code: &str) -> String {
    format!("{}/ref/{}", base.trim_end_matches('/'), short_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_normalizes_host_port_and_fragment() {
        let url = parse_target_url("HTTPS://Shop.Example.COM:443/Product/1?x=1#top").unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com/Product/1?x=1");
    }

    #[test]
    fn test_parse_keeps_custom_port() {
        let url = parse_target_url("http://localhost:3000/landing").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/landing");
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        for input in ["javascript:alert(1)", "ftp://example.com/f", "mailto:a@b.c"] {
            assert!(matches!(
                parse_target_url(input),
                Err(UrlBuildError::UnsupportedProtocol)
            ));
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_target_url("not a url"),
            Err(UrlBuildError::InvalidFormat(_))
        ));
        assert!(parse_target_url("").is_err());
    }

    #[test]
    fn test_with_query_params_appends() {
        let url = parse_target_url("https://shop.example.com/products/1").unwrap();
        let url = with_query_params(url, &pairs(&[("utm_source", "affiliate"), ("ref", "jane1234")]));

        assert_eq!(
            url.as_str(),
            "https://shop.example.com/products/1?utm_source=affiliate&ref=jane1234"
        );
    }

    #[test]
    fn test_with_query_params_replaces_existing() {
        let url = parse_target_url("https://shop.example.com/?color=red&ref=old").unwrap();
        let url = with_query_params(url, &pairs(&[("ref", "new")]));

        assert_eq!(url.as_str(), "https://shop.example.com/?color=red&ref=new");
    }

    #[test]
    fn test_with_query_params_encodes_values() {
        let url = parse_target_url("https://shop.example.com/").unwrap();
        let url = with_query_params(url, &pairs(&[("utm_campaign", "spring sale & more")]));

        assert!(url.as_str().ends_with("utm_campaign=spring+sale+%26+more"));
    }

    #[test]
    fn test_redirect_url() {
        assert_eq!(
            redirect_url("https://aff.example.com/", "a1b2c3d4"),
            "https://aff.example.com/ref/a1b2c3d4"
        );
        assert_eq!(
            redirect_url("https://aff.example.com", "a1b2c3d4"),
            "https://aff.example.com/ref/a1b2c3d4"
        );
    }
}
