//! HTML parser for extracting links and metadata
//!
//! This module parses fetched HTML to extract the page title and the raw
//! `href` values of every anchor. Hrefs are deliberately NOT resolved or
//! filtered here: the raw text travels through the link queue so that the
//! resolver sees exactly what the page said, and resolution happens once,
//! on the link-worker side.

use scraper::{Html, Selector};

/// Href placeholder for anchors with no href attribute. The resolver treats
/// it the same as an empty link.
const MISSING_HREF: &str = "None";

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Raw href values of every anchor, in document order
    pub raw_links: Vec<String>,
}

/// Parses HTML content and extracts the title and raw anchor hrefs
///
/// # Arguments
///
/// * `html` - The HTML content to parse
///
/// # Example
///
/// ```
/// use linkscan::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_html(html);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.raw_links, vec!["/page".to_string()]);
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        raw_links: extract_raw_links(&document),
    }
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

/// Extracts the raw href of every anchor in the document
fn extract_raw_links(document: &Html) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a") {
        for element in document.select(&a_selector) {
            let href = element.value().attr("href").unwrap_or(MISSING_HREF);
            links.push(href.to_string());
        }
    }

    links
}
