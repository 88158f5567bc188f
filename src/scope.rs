use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

/// Decides whether a discovered link is worth crawling.
///
/// Implementations must be pure: the same `(base, candidate)` pair always
/// yields the same outcome, so admission stays independent of which
/// worker performs the check.
pub trait ScopeFilter: Send + Sync {
    /// Resolves `candidate` against `base` and returns the canonical
    /// address when it is in scope, `None` otherwise. Unparseable
    /// candidates are out of scope by definition.
    fn filter(&self, base: &Url, candidate: &str) -> Option<Url>;
}

/// Allow-list scope policy over schemes, domains and file extensions.
///
/// A `None` list leaves that dimension unrestricted. Domains match the
/// address host, or `host:port` when an explicit port is present.
/// Extensions include the leading dot, and the empty string matches
/// paths whose last non-empty segment has no extension at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlScope {
    #[serde(default)]
    pub allowed_schemes: Option<HashSet<String>>,
    #[serde(default)]
    pub allowed_domains: Option<HashSet<String>>,
    #[serde(default)]
    pub allowed_extensions: Option<HashSet<String>>,
}

impl UrlScope {
    pub fn schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_schemes = Some(schemes.into_iter().map(Into::into).collect());
        self
    }

    pub fn domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }
}

impl ScopeFilter for UrlScope {
    fn filter(&self, base: &Url, candidate: &str) -> Option<Url> {
        let mut url = base.join(candidate).ok()?;
        url.set_fragment(None);

        if let Some(schemes) = &self.allowed_schemes {
            if !schemes.contains(url.scheme()) {
                return None;
            }
        }
        if let Some(domains) = &self.allowed_domains {
            let host = url.host_str()?;
            let netloc = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            if !domains.contains(&netloc) {
                return None;
            }
        }
        if let Some(extensions) = &self.allowed_extensions {
            if !extensions.contains(path_extension(url.path())) {
                return None;
            }
        }
        Some(url)
    }
}

/// Extension of the last non-empty path segment, dot included. Empty when
/// the segment has none: dotfiles and trailing dots count as
/// extension-less, and a trailing slash does not hide the segment before
/// it.
fn path_extension(path: &str) -> &str {
    let name = path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("");
    match name.rfind('.') {
        Some(i) if i > 0 && i < name.len() - 1 => &name[i..],
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://example.test/dir/page.html").unwrap()
    }

    #[test]
    fn resolves_relative_links_and_strips_fragments() {
        let scope = UrlScope::default();
        assert_eq!(
            scope.filter(&base(), "other.html#sec-2").unwrap().as_str(),
            "http://example.test/dir/other.html"
        );
        assert_eq!(
            scope.filter(&base(), "/top").unwrap().as_str(),
            "http://example.test/top"
        );
        assert_eq!(
            scope.filter(&base(), "http://elsewhere.test/x").unwrap().as_str(),
            "http://elsewhere.test/x"
        );
    }

    #[test]
    fn unparseable_candidates_are_out_of_scope() {
        let scope = UrlScope::default();
        assert!(scope.filter(&base(), "http://[bad").is_none());
    }

    #[test]
    fn restricts_schemes() {
        let scope = UrlScope::default().schemes(["http", "https"]);
        assert!(scope.filter(&base(), "https://example.test/a").is_some());
        assert!(scope.filter(&base(), "ftp://example.test/a").is_none());
        assert!(scope.filter(&base(), "mailto:someone@example.test").is_none());
    }

    #[test]
    fn restricts_domains_with_explicit_ports() {
        let scope = UrlScope::default().domains(["example.test", "example.test:8080"]);
        assert!(scope.filter(&base(), "/page").is_some());
        assert!(scope.filter(&base(), "http://example.test:8080/page").is_some());
        assert!(scope.filter(&base(), "http://example.test:9999/page").is_none());
        assert!(scope.filter(&base(), "http://other.test/page").is_none());
    }

    #[test]
    fn restricts_extensions() {
        let scope = UrlScope::default().extensions([".html", ""]);
        assert!(scope.filter(&base(), "a.html").is_some());
        assert!(scope.filter(&base(), "a.pdf").is_none());
        // Empty string admits extension-less paths.
        assert!(scope.filter(&base(), "/plain").is_some());
        assert!(scope.filter(&base(), "/").is_some());
        // A trailing slash does not hide the last segment's extension.
        assert!(scope.filter(&base(), "docs.html/").is_some());
        assert!(scope.filter(&base(), "v1.2/").is_none());
    }

    #[test]
    fn extension_of_last_segment_only() {
        assert_eq!(path_extension("/a/b/report.pdf"), ".pdf");
        assert_eq!(path_extension("/a.d/b"), "");
        assert_eq!(path_extension("/archive.tar.gz"), ".gz");
        assert_eq!(path_extension("/.hidden"), "");
        assert_eq!(path_extension("/trailing."), "");
        assert_eq!(path_extension("/"), "");
        assert_eq!(path_extension("/docs.html/"), ".html");
        assert_eq!(path_extension("/v1.2/"), ".2");
    }

    #[test]
    fn same_candidate_same_outcome() {
        let scope = UrlScope::default()
            .schemes(["http"])
            .domains(["example.test"])
            .extensions([".html", ""]);
        let first = scope.filter(&base(), "next.html");
        for _ in 0..10 {
            assert_eq!(scope.filter(&base(), "next.html"), first);
        }
    }
}
