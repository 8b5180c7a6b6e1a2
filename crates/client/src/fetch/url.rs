//! URL resolution for consistent cache keys.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a manifest entry or request target into an absolute URL.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative references (`/css/style.css`, `index.html`) against `origin`
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn resolve(input: &str, origin: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        origin.join(trimmed)
    }
    .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://portal.test").unwrap()
    }

    #[test]
    fn test_resolve_root() {
        let url = resolve("/", &origin()).unwrap();
        assert_eq!(url.as_str(), "https://portal.test/");
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = resolve("/css/style.css", &origin()).unwrap();
        assert_eq!(url.as_str(), "https://portal.test/css/style.css");
    }

    #[test]
    fn test_resolve_absolute_third_party() {
        let url = resolve("https://cdn.jsdelivr.net/npm/@fortawesome/fontawesome-free@6.4.0/css/all.min.css", &origin())
            .unwrap();
        assert_eq!(url.host_str(), Some("cdn.jsdelivr.net"));
    }

    #[test]
    fn test_resolve_lowercase_host() {
        let url = resolve("https://PORTAL.TEST/index.html", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("portal.test"));
    }

    #[test]
    fn test_resolve_remove_fragment() {
        let url = resolve("/guide.html#section-2", &origin()).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/guide.html");
    }

    #[test]
    fn test_resolve_preserve_query() {
        let url = resolve(
            "https://fonts.googleapis.com/css2?family=Inter:wght@300;400&display=swap",
            &origin(),
        )
        .unwrap();
        assert_eq!(url.query(), Some("family=Inter:wght@300;400&display=swap"));
    }

    #[test]
    fn test_resolve_trim_whitespace() {
        let url = resolve("  /index.html  ", &origin()).unwrap();
        assert_eq!(url.as_str(), "https://portal.test/index.html");
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        let result = resolve("file:///etc/passwd", &origin());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve("", &origin()), Err(UrlError::Empty)));
        assert!(matches!(resolve("   ", &origin()), Err(UrlError::Empty)));
    }
}
