//! Finding a page's trackback endpoint in its markup.
//!
//! Two conventions exist in the wild and they disagree, so each one is a
//! separate [`DiscoveryStrategy`]. [`discover_endpoint`] tries them in order
//! and returns the first hit; results are never merged.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RDF_PING_REGEX: Regex = Regex::new(r#"trackback:ping="(.*?)""#).unwrap();

    // Single-line scan: `[^>\n]` stops at the first newline, so a tag whose
    // attributes span lines is not found.
    static ref LINK_TAG_REGEX: Regex = Regex::new(r"(?i)<\s*link\b([^>\n]*)>").unwrap();

    static ref ATTRIBUTE_REGEX: Regex =
        Regex::new(r#"(?i)([a-z][a-z0-9_:-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
}

const TRACKBACK_REL: &str = "trackback";
const FORM_ENCODED_TYPE: &str = "application/x-www-form-urlencoded";

pub trait DiscoveryStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn discover(&self, html: &str) -> Option<String>;
}

/// `trackback:ping="..."` attribute, usually inside an embedded RDF block.
pub struct RdfPingStrategy;

impl DiscoveryStrategy for RdfPingStrategy {
    fn name(&self) -> &'static str {
        "rdf"
    }

    fn discover(&self, html: &str) -> Option<String> {
        RDF_PING_REGEX
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|url| !url.is_empty())
    }
}

/// `<link rel="trackback" type="application/x-www-form-urlencoded" href="...">`
/// with attributes in any order.
pub struct LinkTagStrategy;

impl DiscoveryStrategy for LinkTagStrategy {
    fn name(&self) -> &'static str {
        "link"
    }

    fn discover(&self, html: &str) -> Option<String> {
        LINK_TAG_REGEX.captures_iter(html).find_map(|caps| {
            let attributes = caps.get(1)?.as_str();
            let mut rel = None;
            let mut content_type = None;
            let mut href = None;

            for attr in ATTRIBUTE_REGEX.captures_iter(attributes) {
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .map(|m| m.as_str().trim());
                match attr[1].to_ascii_lowercase().as_str() {
                    "rel" => rel = value,
                    "type" => content_type = value,
                    "href" => href = value,
                    _ => {}
                }
            }

            let is_trackback = rel.is_some_and(|r| r.eq_ignore_ascii_case(TRACKBACK_REL));
            let is_form = content_type.is_some_and(|t| t.eq_ignore_ascii_case(FORM_ENCODED_TYPE));
            match href {
                Some(href) if is_trackback && is_form && !href.is_empty() => {
                    Some(href.to_string())
                }
                _ => None,
            }
        })
    }
}

static DEFAULT_STRATEGIES: [&dyn DiscoveryStrategy; 2] = [&RdfPingStrategy, &LinkTagStrategy];

/// First endpoint found by the default strategies, structured marker first.
pub fn discover_endpoint(html: &str) -> Option<String> {
    discover_with(DEFAULT_STRATEGIES.iter().copied(), html)
}

pub fn discover_with<'a, I>(strategies: I, html: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a dyn DiscoveryStrategy>,
{
    strategies.into_iter().find_map(|strategy| {
        let found = strategy.discover(html);
        if let Some(url) = &found {
            tracing::debug!("Discovered endpoint {} via {} strategy", url, strategy.name());
        }
        found
    })
}
