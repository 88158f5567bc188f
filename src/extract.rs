use std::collections::HashSet;

use lazy_static::lazy_static;
use scraper::{Html, Selector};
use url::Url;

lazy_static! {
    static ref ANCHOR: Selector = Selector::parse("a[href]").unwrap();
}

/// Errors from link extraction. The built-in extractor recovers from any
/// input and never produces one; extractors over stricter formats may.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Pulls raw link candidates out of a fetched document.
pub trait LinkExtractor: Send + Sync {
    /// Returns candidate references in document order, unresolved. `base`
    /// is the address the document was served from; the default extractor
    /// has no use for it but format-aware ones might.
    fn extract(&self, base: &Url, body: &str) -> Result<Vec<String>, ExtractError>;
}

/// Extractor keeping the `href` of every `<a>` element, nothing else.
/// Each href is reported once, at its first occurrence. Leans on
/// html5ever's error recovery, so broken markup still yields whatever
/// anchors can be salvaged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorExtractor;

impl LinkExtractor for AnchorExtractor {
    fn extract(&self, _base: &Url, body: &str) -> Result<Vec<String>, ExtractError> {
        let doc = Html::parse_document(body);
        let mut seen = HashSet::new();
        Ok(doc
            .select(&ANCHOR)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| seen.insert(*href))
            .map(str::to_owned)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(body: &str) -> Vec<String> {
        let base = Url::parse("http://example.test/").unwrap();
        AnchorExtractor.extract(&base, body).unwrap()
    }

    #[test]
    fn collects_anchor_hrefs_in_document_order() {
        let links = extract(
            r#"<html><body>
                <a href="/first">one</a>
                <p><a href="second.html">two</a></p>
                <a href="http://other.test/third">three</a>
            </body></html>"#,
        );
        assert_eq!(links, vec!["/first", "second.html", "http://other.test/third"]);
    }

    #[test]
    fn ignores_other_references() {
        let links = extract(
            r#"<html><head>
                <link href="style.css" rel="stylesheet">
                <script src="app.js"></script>
            </head><body>
                <img src="pic.png">
                <a name="no-href">anchor without href</a>
                <a href="/kept">kept</a>
            </body></html>"#,
        );
        assert_eq!(links, vec!["/kept"]);
    }

    #[test]
    fn duplicate_hrefs_reported_once() {
        let links = extract(
            r#"<a href="/a">one</a><a href="/b">two</a><a href="/a">one again</a>"#,
        );
        assert_eq!(links, vec!["/a", "/b"]);
    }

    #[test]
    fn recovers_from_broken_markup() {
        // Error recovery reconstructs the open <a> around the <div>; the
        // duplicate it introduces must not leak out.
        let links = extract(r#"<a href="/a"><div><a href="/b">unclosed"#);
        assert_eq!(links, vec!["/a", "/b"]);
    }

    #[test]
    fn empty_document_yields_nothing() {
        assert!(extract("").is_empty());
        assert!(extract("just text, no markup").is_empty());
    }
}
