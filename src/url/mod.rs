//! URL handling module for Sumi-Harvest
//!
//! Page URLs are produced from a template with a `{}` placeholder for the
//! page index. Links pulled out of a page are resolved against the page's
//! final URL (after redirects).

use url::Url;

/// Expands a page URL template for a given index
///
/// Every `{}` in the template is replaced with the index.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::expand_template;
///
/// let url = expand_template("http://books.example.com/page/{}/", 7).unwrap();
/// assert_eq!(url.as_str(), "http://books.example.com/page/7/");
/// ```
pub fn expand_template(template: &str, index: u64) -> Result<Url, url::ParseError> {
    Url::parse(&template.replace("{}", &index.to_string()))
}

/// Resolves a possibly relative link against a base URL
///
/// Returns `None` for empty links, non-HTTP schemes (`javascript:`,
/// `mailto:`, `data:` and friends) and links that cannot be parsed.
pub fn resolve_link(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let resolved = match Url::parse(href) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base).ok()?.join(href).ok()?,
        Err(_) => return None,
    };

    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_template() {
        let url = expand_template("https://example.com/page/{}/", 42).unwrap();
        assert_eq!(url.as_str(), "https://example.com/page/42/");
    }

    #[test]
    fn test_expand_template_query() {
        let url = expand_template("https://example.com/list?p={}&q={}", 3).unwrap();
        assert_eq!(url.as_str(), "https://example.com/list?p=3&q=3");
    }

    #[test]
    fn test_expand_template_invalid() {
        assert!(expand_template("/relative/{}", 1).is_err());
    }

    #[test]
    fn test_resolve_absolute_link() {
        assert_eq!(
            resolve_link("https://example.com/page/1/", "https://other.com/book"),
            Some("https://other.com/book".to_string())
        );
    }

    #[test]
    fn test_resolve_relative_link() {
        assert_eq!(
            resolve_link("https://example.com/page/1/", "/book/rust"),
            Some("https://example.com/book/rust".to_string())
        );
        assert_eq!(
            resolve_link("https://example.com/page/1/", "next"),
            Some("https://example.com/page/1/next".to_string())
        );
    }

    #[test]
    fn test_resolve_rejects_non_http() {
        assert_eq!(resolve_link("https://example.com/", "javascript:void(0)"), None);
        assert_eq!(resolve_link("https://example.com/", "mailto:a@b.com"), None);
        assert_eq!(resolve_link("https://example.com/", "   "), None);
    }
}
