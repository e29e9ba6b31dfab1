//! Same-domain link discovery over response bodies and header values.
//!
//! Two passes run over every page:
//!
//! * an attribute pass over the body for `action`, `formaction`, `href`,
//!   `icon` and `src` values, which is the only way relative links are found;
//! * a freeform pass over the header values and the body for anything that
//!   looks like an absolute `http(s)` URL, which catches bare URLs in text,
//!   sitemaps and headers such as `Link`.
//!
//! Nothing in here fails. Values that do not parse are dropped.

use crate::normalize::{normalize_url, resolve_relative, url_on_domain};
use regex::Regex;
use reqwest::header::HeaderMap;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static LINK_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:action|formaction|href|icon|src)="(.*?)""#)
        .expect("LINK_ATTRIBUTE: hardcoded regex is valid")
});

static ABSOLUTE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[A-Za-z0-9\-._~:/?#\[\]@!$&'()*+,;=%]{1,2048}")
        .expect("ABSOLUTE_URL: hardcoded regex is valid")
});

pub struct LinkSource<'a> {
    pub body: &'a str,
    pub headers: &'a HeaderMap,
    /// The crawl's target hostname.
    pub hostname: &'a str,
    /// The page the body came from; relative links resolve against its origin.
    pub source_url: &'a Url,
}

/// Insertion-ordered set of normalized URLs.
#[derive(Default)]
struct LinkSet {
    seen: HashSet<String>,
    links: Vec<String>,
}

impl LinkSet {
    fn insert(&mut self, link: String) {
        if self.seen.insert(link.clone()) {
            self.links.push(link);
        }
    }
}

/// Find every same-domain URL referenced by a page, normalized and
/// deduplicated, in the order first seen.
pub fn extract_links(source: &LinkSource<'_>) -> Vec<String> {
    let mut links = LinkSet::default();

    for capture in LINK_ATTRIBUTE.captures_iter(source.body) {
        let value = &capture[1];

        match Url::parse(value) {
            Ok(url) => {
                if url_on_domain(&url, source.hostname) {
                    links.insert(normalize_url(&url));
                }
            }
            Err(_) => {
                if let Some(resolved) = resolve_relative(source.source_url, value) {
                    links.insert(resolved);
                }
            }
        }
    }

    let mut haystack = source
        .headers
        .values()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join("\n");
    haystack.push('\n');
    haystack.push_str(source.body);

    for found in ABSOLUTE_URL.find_iter(&haystack) {
        if let Ok(url) = Url::parse(found.as_str())
            && url_on_domain(&url, source.hostname)
        {
            links.insert(normalize_url(&url));
        }
    }

    links.links
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn links(body: &str, headers: &HeaderMap, source: &str) -> Vec<String> {
        let source_url = Url::parse(source).unwrap();
        extract_links(&LinkSource {
            body,
            headers,
            hostname: "foo.com",
            source_url: &source_url,
        })
    }

    #[test]
    fn test_freeform_urls_in_body() {
        let body = "https://bam.bar.foo.com https://baz.foo.com https://foo.com";
        let found = links(body, &HeaderMap::new(), "http://bar.foo.com");

        assert_eq!(
            found,
            vec![
                "https://bam.bar.foo.com",
                "https://baz.foo.com",
                "https://foo.com"
            ]
        );
    }

    #[test]
    fn test_urls_in_header_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-baz", HeaderValue::from_static("http://bar.foo.com"));

        let found = links("http://someotherdomain.org", &headers, "https://foo.com");

        assert_eq!(found, vec!["http://bar.foo.com"]);
    }

    #[test]
    fn test_relative_attribute_resolves_against_source_origin() {
        let found = links(r#"<a href="/a/b/c">c</a>"#, &HeaderMap::new(), "http://bar.foo.com/x/y");

        assert_eq!(found, vec!["http://bar.foo.com/a/b/c"]);
    }

    #[test]
    fn test_all_attribute_kinds() {
        let body = r#"
            <form action="/submit"><button formaction="/alt">go</button></form>
            <link rel="icon" icon="/favicon.ico">
            <img src="img/logo.png">
        "#;
        let found = links(body, &HeaderMap::new(), "https://foo.com");

        assert!(found.contains(&"https://foo.com/submit".to_string()));
        assert!(found.contains(&"https://foo.com/alt".to_string()));
        assert!(found.contains(&"https://foo.com/favicon.ico".to_string()));
        assert!(found.contains(&"https://foo.com/img/logo.png".to_string()));
    }

    #[test]
    fn test_off_domain_attributes_are_dropped() {
        let body = r#"<a href="https://evil.org/x">x</a><a href="https://evilfoo.com">y</a>"#;
        let found = links(body, &HeaderMap::new(), "https://foo.com");

        assert!(found.is_empty());
    }

    #[test]
    fn test_schemes_without_host_are_dropped() {
        let body = r#"<a href="mailto:me@foo.com">m</a><a href="javascript:void(0)">j</a>"#;
        let found = links(body, &HeaderMap::new(), "https://foo.com");

        assert!(found.is_empty());
    }

    #[test]
    fn test_duplicates_and_trailing_punctuation_collapse() {
        let body = r#"
            <a href="https://foo.com/docs/">docs</a>
            see (https://foo.com/docs), or https://foo.com/docs;
        "#;
        let found = links(body, &HeaderMap::new(), "https://foo.com");

        assert_eq!(found, vec!["https://foo.com/docs"]);
    }

    #[test]
    fn test_sitemap_body() {
        let body = r#"<?xml version="1.0"?>
<urlset>
  <url><loc>https://foo.com/about</loc></url>
  <url><loc>https://shop.foo.com/cart</loc></url>
  <url><loc>https://cdn.other.net/x</loc></url>
</urlset>"#;
        let found = links(body, &HeaderMap::new(), "https://foo.com/sitemap.xml");

        assert!(found.contains(&"https://foo.com/about".to_string()));
        assert!(found.contains(&"https://shop.foo.com/cart".to_string()));
        assert!(!found.iter().any(|u| u.contains("other.net")));
    }

    #[test]
    fn test_malformed_match_is_ignored() {
        let found = links("http://[not-a-host/", &HeaderMap::new(), "https://foo.com");
        assert!(found.is_empty());
    }
}
