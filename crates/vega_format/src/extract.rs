//! Image URL extraction from image-generation responses.

use regex::Regex;
use std::sync::LazyLock;

/// `[![alt](image)](link)`
static NESTED_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[!\[[^\]]*\]\((https?://[^)\s]+)\)\]\((https?://[^)\s]+)\)")
        .expect("nested link pattern is valid")
});

/// `![alt](image)`
static MARKDOWN_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[[^\]]*\]\((https?://[^)\s]+)\)").expect("markdown image pattern is valid")
});

static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s)]+").expect("bare url pattern is valid"));

static PROTOCOL_RELATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//[^\s)]+").expect("protocol-relative pattern is valid"));

static WWW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"www\.[^\s)]+").expect("www pattern is valid"));

/// Extracts the image location from a provider response.
///
/// Patterns are tried in order and the first match wins:
///
/// 1. a markdown image wrapped in a link, `[![alt](image)](link)`, yielding the image URL
/// 2. a markdown image, `![alt](url)`
/// 3. a bare `http://` or `https://` URL
/// 4. a protocol-relative `//host/path`, returned with an `https:` prefix
/// 5. a `www.` address, returned with an `https://` prefix
///
/// # Example
///
/// ```
/// use vega_format::extract_image_url;
///
/// let body = "Here you go: ![cat](https://cdn.example/cat.png)";
/// assert_eq!(extract_image_url(body).as_deref(), Some("https://cdn.example/cat.png"));
/// assert_eq!(extract_image_url("no luck"), None);
/// ```
#[must_use]
pub fn extract_image_url(text: &str) -> Option<String> {
    if let Some(caps) = NESTED_LINK.captures(text) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = MARKDOWN_IMAGE.captures(text) {
        return Some(caps[1].to_string());
    }
    if let Some(m) = BARE_URL.find(text) {
        return Some(m.as_str().to_string());
    }
    if let Some(m) = PROTOCOL_RELATIVE.find(text) {
        return Some(format!("https:{}", m.as_str()));
    }
    WWW.find(text).map(|m| format!("https://{}", m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_link_wins_over_bare_url() {
        let text = "mirror https://other.example/x.png and \
                    [![art](https://img.example/a.jpg)](https://page.example/a)";
        assert_eq!(
            extract_image_url(text).as_deref(),
            Some("https://img.example/a.jpg")
        );
    }

    #[test]
    fn markdown_image_wins_over_bare_url() {
        let text = "https://first.example/page ![x](http://img.example/b.webp)";
        assert_eq!(
            extract_image_url(text).as_deref(),
            Some("http://img.example/b.webp")
        );
    }

    #[test]
    fn bare_url_stops_at_whitespace_and_paren() {
        let text = "(see https://img.example/c.png) now";
        assert_eq!(
            extract_image_url(text).as_deref(),
            Some("https://img.example/c.png")
        );
    }

    #[test]
    fn protocol_relative_gets_https() {
        assert_eq!(
            extract_image_url("src=//cdn.example/d.png").as_deref(),
            Some("https://cdn.example/d.png")
        );
    }

    #[test]
    fn www_gets_https_scheme() {
        assert_eq!(
            extract_image_url("at www.example.com/e.png ok").as_deref(),
            Some("https://www.example.com/e.png")
        );
    }

    #[test]
    fn no_match_returns_none() {
        assert_eq!(extract_image_url(""), None);
        assert_eq!(extract_image_url("image generation failed"), None);
    }
}
