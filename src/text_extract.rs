//! Metadata extraction from a post's rich-text body.
//!
//! Post bodies arrive as HTML fragments with inline icons, topic links and
//! mention anchors. This module flattens the fragment to plain text and
//! pulls out the location tag, `#...#` hashtags, and `@user` mentions.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::constants::LOCATION_ICON;

static SPAN_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span").expect("valid selector"));
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("valid selector"));
static SURL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.surl-text").expect("valid selector"));
static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("valid selector"));

/// Metadata extracted from one post body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextMeta {
    /// All text nodes flattened in reading order, tags discarded.
    pub plain_text: String,
    /// Location tag, when the body carries a location-pin icon.
    pub location: Option<String>,
    /// `#...#` topics in document order; duplicate occurrences are kept.
    pub hashtags: Vec<String>,
    /// Mentioned users with the leading `@` stripped.
    pub mentions: Vec<String>,
}

/// Extract plain text, location, hashtags and mentions from a post body.
#[must_use]
pub fn extract(html_fragment: &str) -> TextMeta {
    let document = Html::parse_fragment(html_fragment);

    TextMeta {
        plain_text: document.root_element().text().collect(),
        location: extract_location(&document),
        hashtags: extract_hashtags(&document),
        mentions: extract_mentions(&document),
    }
}

/// Find the location string, if any.
///
/// The body marks a location with a pin icon inside a `span`; the location
/// text is the NEXT span in document order. Only the first marked span
/// counts.
fn extract_location(document: &Html) -> Option<String> {
    let spans: Vec<ElementRef> = document.select(&SPAN_SELECTOR).collect();
    for (i, span) in spans.iter().enumerate() {
        let Some(img) = span.select(&IMG_SELECTOR).next() else {
            continue;
        };
        if img
            .value()
            .attr("src")
            .map_or(false, |src| src.contains(LOCATION_ICON))
        {
            return spans.get(i + 1).map(flatten);
        }
    }
    None
}

/// Collect `#...#` topics from `span.surl-text` elements.
fn extract_hashtags(document: &Html) -> Vec<String> {
    let mut hashtags = Vec::new();
    for span in document.select(&SURL_SELECTOR) {
        let text = flatten(&span);
        if text.chars().count() > 2 && text.starts_with('#') && text.ends_with('#') {
            hashtags.push(text[1..text.len() - 1].to_string());
        }
    }
    hashtags
}

/// Collect genuine `@user` mentions.
///
/// An anchor is a mention only when its text equals `"@"` followed by its
/// `href` minus the first three characters (the `/n/` prefix of profile
/// paths). That rules out anchors whose text merely starts with `@`.
/// Slicing is char-based since both hrefs and names can be non-ASCII.
fn extract_mentions(document: &Html) -> Vec<String> {
    let mut mentions = Vec::new();
    for anchor in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let text = flatten(&anchor);
        let target: String = href.chars().skip(3).collect();
        if text == format!("@{target}") {
            mentions.push(text.chars().skip(1).collect());
        }
    }
    mentions
}

fn flatten(element: &ElementRef) -> String {
    element.text().collect()
}
