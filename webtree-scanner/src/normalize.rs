//! URL parsing, canonicalization and relative resolution.
//!
//! Every URL that enters the frontier or the tree goes through
//! [`normalize_url`] first, so two URLs are the same crawl target exactly when
//! their normalized strings are equal.

use crate::error::{CrawlError, Result};
use url::Url;

/// Characters stripped from the end of a URL before it is used as a dedup key.
const TRAILING: &[char] = &[')', ',', ';', '\'', '/'];

/// Parse an absolute URL. Anything without a scheme and host is rejected.
pub fn parse(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|_| CrawlError::InvalidUrl(raw.to_string()))?;

    if url.host_str().is_none() {
        return Err(CrawlError::InvalidUrl(raw.to_string()));
    }

    Ok(url)
}

/// Remove a trailing run of `) , ; ' /` and whitespace.
pub fn normalize(url: &str) -> String {
    url.trim_end_matches(|c: char| TRAILING.contains(&c) || c.is_whitespace())
        .to_string()
}

/// Serialize a parsed URL into its dedup key. The fragment is dropped.
pub fn normalize_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    normalize(url.as_str())
}

/// Join `relative` onto the origin of `base` and normalize the result.
///
/// The relative part is always treated as rooted at the origin: `a/b` and
/// `/a/b` resolve identically, and leading slashes collapse so a
/// protocol-relative value like `//other.org/x` stays on `base`'s host.
pub fn resolve_relative(base: &Url, relative: &str) -> Option<String> {
    let path = format!("/{}", relative.trim().trim_start_matches(['/', '\\']));
    let resolved = base.join(&path).ok()?;

    if resolved.host_str() != base.host_str() {
        return None;
    }

    Some(normalize_url(&resolved))
}

/// `host` is the target itself or one of its subdomains.
pub fn is_same_domain(host: &str, target: &str) -> bool {
    let host = host.trim_end_matches('.');
    let target = target.trim_end_matches('.');

    if host.eq_ignore_ascii_case(target) {
        return true;
    }

    let Some(split) = host.len().checked_sub(target.len()) else {
        return false;
    };

    match (host.get(..split), host.get(split..)) {
        (Some(prefix), Some(suffix)) => {
            prefix.ends_with('.') && suffix.eq_ignore_ascii_case(target)
        }
        _ => false,
    }
}

/// Whether a parsed URL lives on the crawl's target domain.
pub fn url_on_domain(url: &Url, target: &str) -> bool {
    url.host_str()
        .is_some_and(|host| is_same_domain(host, target))
}
