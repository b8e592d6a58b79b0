//! HTML parser for extracting and rewriting links
//!
//! This module handles parsing HTML content to:
//! - Extract the page title (for log lines)
//! - Extract every `href`/`src` target as an absolute URL
//! - Rewrite those attributes when saving a page into the mirror
//!
//! Parsing goes through scraper/html5ever, which never fails on malformed
//! markup. Only tag attributes are inspected; scripts and stylesheets are not.

use crate::url::resolve;
use crate::SumiError;
use ego_tree::iter::Edge;
use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::QualName;
use scraper::{Html, Node, Selector};
use std::io;
use url::Url;

/// Attributes holding link targets
const LINK_ATTRIBUTES: [&str; 2] = ["href", "src"];

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// All links found on the page, in document order (duplicates kept)
    pub links: Vec<Url>,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// - Every element's `href` and `src` attribute is a link candidate
/// - Candidates are resolved against `base_url` and normalized
/// - `javascript:`, `mailto:`, `tel:`, `data:`, fragment-only and
///   unresolvable values are skipped
///
/// # Example
///
/// ```
/// use sumi_mirror::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: collect_links(&document, base_url),
    }
}

/// Convenience function for extracting just the links from HTML
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    collect_links(&Html::parse_document(html), base_url)
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn collect_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse("[href], [src]") else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for element in document.select(&selector) {
        for attr in LINK_ATTRIBUTES {
            let Some(value) = element.value().attr(attr) else {
                continue;
            };
            match resolve(base_url, value) {
                Some(url) => links.push(url),
                None => tracing::trace!("Skipping link {:?} on {}", value, base_url),
            }
        }
    }
    links
}

/// Rewrites link attributes and re-serializes the document
///
/// For every `href`/`src` value that resolves against `base_url`, `rewrite` is
/// called with the resolved URL and the raw attribute value; `Some(new)`
/// replaces the value, `None` keeps it. Values that do not resolve are left
/// untouched.
///
/// # Example
///
/// ```
/// use sumi_mirror::crawler::rewrite_links;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/").unwrap();
/// let html = r#"<p><a href="/about">About</a></p>"#;
/// let out = rewrite_links(html, &base, |url, _raw| {
///     (url.path() == "/about").then(|| "about/index.html".to_string())
/// })
/// .unwrap();
/// assert!(out.contains(r#"<a href="about/index.html">About</a>"#));
/// ```
pub fn rewrite_links<F>(html: &str, base_url: &Url, rewrite: F) -> Result<String, SumiError>
where
    F: Fn(&Url, &str) -> Option<String>,
{
    let document = Html::parse_document(html);
    let view = RewrittenDocument {
        document: &document,
        base_url,
        rewrite: &rewrite,
    };

    let mut buf = Vec::with_capacity(html.len());
    serialize(&mut buf, &view, SerializeOpts::default()).map_err(|e| SumiError::HtmlParse {
        url: base_url.to_string(),
        message: e.to_string(),
    })?;

    String::from_utf8(buf).map_err(|e| SumiError::HtmlParse {
        url: base_url.to_string(),
        message: e.to_string(),
    })
}

/// A parsed document serialized with substituted link attributes
struct RewrittenDocument<'a, F> {
    document: &'a Html,
    base_url: &'a Url,
    rewrite: &'a F,
}

impl<F> RewrittenDocument<'_, F>
where
    F: Fn(&Url, &str) -> Option<String>,
{
    fn attributes(&self, element: &scraper::node::Element) -> Vec<(QualName, String)> {
        element
            .attrs
            .iter()
            .map(|(name, value)| {
                let value: &str = value;
                let value = if LINK_ATTRIBUTES.contains(&&*name.local) {
                    resolve(self.base_url, value)
                        .and_then(|url| (self.rewrite)(&url, value))
                        .unwrap_or_else(|| value.to_string())
                } else {
                    value.to_string()
                };
                // namespaced attributes such as xlink:href keep their prefix
                (name.clone(), value)
            })
            .collect()
    }
}

impl<F> Serialize for RewrittenDocument<'_, F>
where
    F: Fn(&Url, &str) -> Option<String>,
{
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let root = self.document.tree.root();
        let nodes: Vec<_> = match traversal_scope {
            TraversalScope::IncludeNode => vec![root],
            TraversalScope::ChildrenOnly(_) => root.children().collect(),
        };

        for node in nodes {
            for edge in node.traverse() {
                match edge {
                    Edge::Open(node) => match node.value() {
                        Node::Doctype(doctype) => serializer.write_doctype(doctype.name())?,
                        Node::Comment(comment) => serializer.write_comment(&comment.comment)?,
                        Node::Text(text) => serializer.write_text(&text.text)?,
                        Node::ProcessingInstruction(pi) => {
                            serializer.write_processing_instruction(&pi.target, &pi.data)?
                        }
                        Node::Element(element) => {
                            let attrs = self.attributes(element);
                            serializer.start_elem(
                                element.name.clone(),
                                attrs.iter().map(|(name, value)| (name, value.as_str())),
                            )?;
                        }
                        Node::Document | Node::Fragment => {}
                    },
                    Edge::Close(node) => {
                        if let Node::Element(element) = node.value() {
                            serializer.end_elem(element.name.clone())?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
