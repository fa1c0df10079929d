use crate::config::ScrapeRequest;
use crate::{PluckError, Result};
use url::Url;

/// Validates a scrape request before any network access
///
/// Checks field-level constraints: the target URL must be a well-formed
/// HTTP(S) URL, the selector must be non-empty, and the detail attribute
/// names must be non-empty when their selectors are configured. Selector
/// syntax itself is checked during compilation in the extract module.
///
/// # Errors
///
/// Returns `PluckError::Configuration` describing the first problem found.
pub fn validate(request: &ScrapeRequest) -> Result<()> {
    if request.url.trim().is_empty() {
        return Err(PluckError::Configuration(
            "a target URL is required".to_string(),
        ));
    }

    let parsed = Url::parse(request.url.trim())
        .map_err(|e| PluckError::Configuration(format!("invalid target URL: {}", e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(PluckError::Configuration(format!(
            "only HTTP and HTTPS URLs are supported, got '{}'",
            parsed.scheme()
        )));
    }

    if request.selector.trim().is_empty() {
        return Err(PluckError::Configuration(
            "a selector is required".to_string(),
        ));
    }

    if request.detail_url_selector.is_some() && request.detail_url_attribute.trim().is_empty() {
        return Err(PluckError::Configuration(
            "detail URL attribute must not be empty".to_string(),
        ));
    }

    if request.detail_image_selector.is_some() && request.detail_image_attribute.trim().is_empty() {
        return Err(PluckError::Configuration(
            "detail image attribute must not be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_request() {
        let request = ScrapeRequest::new("https://example.com/list", "div.item");
        assert!(validate(&request).is_ok());
    }

    #[test]
    fn test_empty_url_rejected() {
        let request = ScrapeRequest::new("", "div.item");
        assert!(matches!(
            validate(&request),
            Err(PluckError::Configuration(_))
        ));
    }

    #[test]
    fn test_malformed_url_rejected() {
        let request = ScrapeRequest::new("not a url", "div.item");
        assert!(matches!(
            validate(&request),
            Err(PluckError::Configuration(_))
        ));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let request = ScrapeRequest::new("ftp://example.com/", "div.item");
        let err = validate(&request).unwrap_err();
        assert!(err.to_string().contains("ftp"));
    }

    #[test]
    fn test_empty_selector_rejected() {
        let request = ScrapeRequest::new("https://example.com/", "   ");
        assert!(matches!(
            validate(&request),
            Err(PluckError::Configuration(_))
        ));
    }

    #[test]
    fn test_empty_detail_attribute_rejected() {
        let mut request = ScrapeRequest::new("https://example.com/", "div");
        request.detail_url_selector = Some("a.detail".to_string());
        request.detail_url_attribute = String::new();
        assert!(matches!(
            validate(&request),
            Err(PluckError::Configuration(_))
        ));
    }
}
