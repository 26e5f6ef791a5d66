// Splitting cell text into word-cloud units

use url::Url;

/// Whitespace-separated tokens that contain at least one letter. Case is kept.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .filter(|token| token.chars().any(char::is_alphabetic))
        .collect()
}

/// Host of a URL without a leading `www.` or `m.`.
///
/// A token that does not parse as a URL is returned unchanged. A URL without
/// a host (`mailto:`, `file:`) yields an empty string.
pub fn extract_url_domain(token: &str) -> String {
    match Url::parse(token) {
        Ok(url) => {
            let host = url.host_str().unwrap_or_default();
            let host = host.strip_prefix("www.").unwrap_or(host);
            let host = host.strip_prefix("m.").unwrap_or(host);
            host.trim().to_string()
        }
        Err(_) => token.trim().to_string(),
    }
}
