//! Selector-based element extraction
//!
//! Given parsed markup and a compiled selector set, produces normalized
//! records: collapsed text, absolutized links and attributes, a best-effort
//! image URL, a detail-page URL, and length-capped serialized markup.
//!
//! Parsing is synchronous on purpose: `scraper::Html` is not `Send`, so
//! documents never cross an await point. Callers fetch the body first and
//! hand the string here.

mod record;

pub use record::Record;

use crate::config::ScrapeRequest;
use crate::{PluckError, Result};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Cap on serialized element markup, in characters
pub const HTML_CAP: usize = 5000;

/// Marker appended to markup truncated at the cap
pub const ELLIPSIS: &str = "…";

/// Attribute names whose values are resolved to absolute URLs
const URL_ATTRIBUTES: &[&str] = &["src", "data-src", "href"];

/// Extensions treated as image URLs, matched case-insensitively
const IMAGE_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".webp", ".bmp", ".svg", ".avif",
];

/// The compiled selector set for one scrape invocation
///
/// Compilation happens once, before any network access, so a bad selector
/// fails fast as a configuration error.
pub struct Selectors {
    pub target: Selector,
    pub next: Option<Selector>,
    pub detail_url: Option<Selector>,
    pub detail_image: Option<Selector>,
}

impl Selectors {
    /// Compiles every selector a request names
    ///
    /// # Errors
    ///
    /// Returns `PluckError::Configuration` naming the offending selector.
    pub fn compile(request: &ScrapeRequest) -> Result<Self> {
        Ok(Self {
            target: compile(&request.selector, "selector")?,
            next: request
                .next_selector
                .as_deref()
                .map(|s| compile(s, "next-page selector"))
                .transpose()?,
            detail_url: request
                .detail_url_selector
                .as_deref()
                .map(|s| compile(s, "detail URL selector"))
                .transpose()?,
            detail_image: request
                .detail_image_selector
                .as_deref()
                .map(|s| compile(s, "detail image selector"))
                .transpose()?,
        })
    }
}

fn compile(selector: &str, what: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| PluckError::Configuration(format!("invalid {} '{}': {}", what, selector, e)))
}

/// Everything extracted from one page
pub struct PageExtraction {
    /// Records for the matched elements, indexed in document order
    pub records: Vec<Record>,

    /// Resolved absolute next-page URL, when a next selector matched
    pub next_url: Option<String>,
}

/// Extracts records (and the next-page link) from one page of HTML
///
/// Elements are visited in document order; each record's `index` is its
/// position on this page. The caller reindexes after aggregation.
pub fn extract_page(
    base: &Url,
    html: &str,
    selectors: &Selectors,
    attribute: Option<&str>,
    detail_url_attribute: &str,
) -> PageExtraction {
    let document = Html::parse_document(html);

    let records = document
        .select(&selectors.target)
        .enumerate()
        .map(|(index, element)| Record {
            index,
            tag: element.value().name().to_string(),
            text: collapse_whitespace(element),
            href: element
                .value()
                .attr("href")
                .and_then(|href| to_absolute(base, href)),
            attribute_value: attribute.and_then(|name| attribute_value(base, element, name)),
            image_url: image_url(base, element, attribute),
            detail_url: detail_url(
                base,
                element,
                selectors.detail_url.as_ref(),
                detail_url_attribute,
            ),
            html: truncated_html(element),
        })
        .collect();

    let next_url = selectors.next.as_ref().and_then(|selector| {
        document
            .select(selector)
            .next()
            .and_then(|element| element.value().attr("href"))
            .and_then(|href| to_absolute(base, href))
    });

    PageExtraction { records, next_url }
}

/// Selects the first match of `selector` in `html` and resolves its
/// attribute against `base`
///
/// Used by the enricher against detail pages. Returns `None` on selector
/// miss or missing attribute.
pub fn select_first_attribute(
    base: &Url,
    html: &str,
    selector: &Selector,
    attribute: &str,
) -> Option<String> {
    let document = Html::parse_document(html);
    let element = document.select(selector).next()?;
    let value = element.value().attr(attribute)?;
    to_absolute(base, value)
}

/// Flattens the element's visible text, collapsing runs of whitespace
fn collapse_whitespace(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(|chunk| chunk.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a possibly-relative URL against the page base
///
/// Handles relative paths, protocol-relative (`//host/p`), and fragment
/// URLs per standard URL-join semantics.
fn to_absolute(base: &Url, value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    base.join(trimmed).ok().map(|url| url.to_string())
}

/// Takes the first candidate of a srcset value, dropping the density
/// descriptor: `"a.jpg 1x, b.jpg 2x"` yields `"a.jpg"`
fn srcset_first(value: &str) -> Option<&str> {
    value
        .split(',')
        .next()?
        .trim()
        .split_whitespace()
        .next()
}

/// Extracts the caller-chosen attribute, resolving URL-bearing names
fn attribute_value(base: &Url, element: ElementRef<'_>, name: &str) -> Option<String> {
    let value = element.value().attr(name)?;
    let lowered = name.to_lowercase();

    if URL_ATTRIBUTES.contains(&lowered.as_str()) {
        return to_absolute(base, value);
    }
    if lowered == "srcset" {
        return srcset_first(value).and_then(|first| to_absolute(base, first));
    }
    Some(value.to_string())
}

/// Returns true if a URL path ends in a known image extension
fn is_image_url(url: &str) -> bool {
    let lowered = url.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext))
}

/// Detects an image URL for the element
///
/// Priority: an `<img>` element's src/data-src/first-srcset-candidate; then
/// a requested attribute whose resolved value looks like an image; then the
/// element's own href if it points at an image.
fn image_url(base: &Url, element: ElementRef<'_>, attribute: Option<&str>) -> Option<String> {
    if element.value().name() == "img" {
        let src = element
            .value()
            .attr("src")
            .or_else(|| element.value().attr("data-src"))
            .or_else(|| element.value().attr("srcset").and_then(srcset_first));
        return src.and_then(|src| to_absolute(base, src));
    }

    if let Some(name) = attribute {
        if let Some(value) = attribute_value(base, element, name) {
            if is_image_url(&value) {
                return Some(value);
            }
        }
    }

    let href = element
        .value()
        .attr("href")
        .and_then(|href| to_absolute(base, href));
    href.filter(|href| is_image_url(href))
}

/// Resolves the detail-page URL for the element
///
/// Priority: the first descendant matching the configured detail selector
/// (reading its configured attribute); then the element's own href; then
/// the nearest ancestor anchor's href.
fn detail_url(
    base: &Url,
    element: ElementRef<'_>,
    selector: Option<&Selector>,
    attribute: &str,
) -> Option<String> {
    if let Some(selector) = selector {
        let found = element
            .select(selector)
            .next()
            .and_then(|sub| sub.value().attr(attribute))
            .and_then(|value| to_absolute(base, value));
        if found.is_some() {
            return found;
        }
    }

    if let Some(href) = element.value().attr("href") {
        if let Some(absolute) = to_absolute(base, href) {
            return Some(absolute);
        }
    }

    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "a")
        .and_then(|anchor| anchor.value().attr("href"))
        .and_then(|href| to_absolute(base, href))
}

/// Serializes the element's outer markup, capped at [`HTML_CAP`] characters
fn truncated_html(element: ElementRef<'_>) -> String {
    let html = element.html();
    if html.chars().count() <= HTML_CAP {
        return html;
    }
    let mut capped: String = html.chars().take(HTML_CAP).collect();
    capped.push_str(ELLIPSIS);
    capped
}
