//! Normalization of raw API records into canonical [`Post`] and
//! [`Comment`] values: date parsing, count parsing, text sanitation.

use chrono::{DateTime, Duration, Local};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::api::types::{CommentItem, Mblog, RawCount};
use crate::error::CrawlError;
use crate::models::{Comment, Post};
use crate::text_extract;

/// Reply-quote and emoji-image markup in comment bodies.
static COMMENT_MARKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<.*?alt=|回复<.*?alt=|src.*?png").expect("valid regex"));
/// Residual inline-style spans left over after markup stripping.
static STYLE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"style.*?span>").expect("valid regex"));

/// Normalize a creation time to a `YYYY-MM-DD` date.
///
/// Relative phrases are resolved against `now`: "刚刚" is today, "N分钟前"
/// and "N小时前" subtract the duration and floor to the date, "昨天" is one
/// day back. A bare `MM-DD` gets the current year prefixed; a full date
/// passes through. Time-of-day precision is deliberately collapsed to
/// whole days; downstream consumers key on dates.
#[must_use]
pub fn normalize_date(created_at: &str, now: DateTime<Local>) -> String {
    if created_at.contains("刚刚") {
        return now.format("%Y-%m-%d").to_string();
    }
    if let Some(pos) = created_at.find("分钟") {
        if let Ok(minutes) = created_at[..pos].trim().parse::<i64>() {
            return (now - Duration::minutes(minutes))
                .format("%Y-%m-%d")
                .to_string();
        }
    }
    if let Some(pos) = created_at.find("小时") {
        if let Ok(hours) = created_at[..pos].trim().parse::<i64>() {
            return (now - Duration::hours(hours)).format("%Y-%m-%d").to_string();
        }
    }
    if created_at.contains("昨天") {
        return (now - Duration::days(1)).format("%Y-%m-%d").to_string();
    }
    if created_at.matches('-').count() == 1 {
        return format!("{}-{}", now.format("%Y"), created_at);
    }
    created_at.to_string()
}

/// Normalize a count that may arrive as a number or a "万"-suffixed string.
///
/// "万+" carries no more information than "万"; both multiply the numeric
/// prefix by ten thousand.
///
/// # Errors
///
/// Returns a schema error when a string count has no parseable numeric
/// prefix.
pub fn normalize_count(raw: &RawCount) -> Result<i64, CrawlError> {
    match raw {
        RawCount::Int(n) => Ok(*n),
        RawCount::Text(s) => {
            let s = s.trim();
            if let Some(prefix) = s.strip_suffix("万+").or_else(|| s.strip_suffix('万')) {
                return parse_ten_thousands(prefix);
            }
            s.parse()
                .map_err(|_| CrawlError::Schema(format!("unparseable count `{s}`")))
        }
    }
}

fn parse_ten_thousands(prefix: &str) -> Result<i64, CrawlError> {
    if let Ok(n) = prefix.parse::<i64>() {
        return Ok(n * 10_000);
    }
    prefix
        .parse::<f64>()
        .map(|n| (n * 10_000.0) as i64)
        .map_err(|_| CrawlError::Schema(format!("unparseable count `{prefix}万`")))
}

/// Remove zero-width spaces.
///
/// This is the only character-level stripping applied to post text;
/// emoji and control characters are left alone.
#[must_use]
pub fn strip_zero_width(text: &str) -> String {
    text.replace('\u{200b}', "")
}

/// The stricter sanitation pipeline for comment bodies: strip reply-quote
/// and emoji-image markup, residual style spans, and newlines.
#[must_use]
pub fn clean_comment_text(text: &str) -> String {
    let text = COMMENT_MARKUP.replace_all(text, "");
    let text = STYLE_SPAN.replace_all(&text, "");
    strip_zero_width(&text.replace('\n', ""))
}

/// Convert a raw post into a [`Post`], extracting the HTML-embedded
/// metadata from the body.
///
/// The returned post's `created_at` still carries the raw (possibly
/// relative) value; the resolver normalizes it against the summary record.
/// `retweet` is never populated here — repost unwrapping is the resolver's
/// job, which keeps nesting to a single level.
///
/// # Errors
///
/// Returns a schema error when the id is missing or unparseable, or a
/// count field is garbled.
pub fn parse_post(raw: &Mblog) -> Result<Post, CrawlError> {
    let id: i64 = raw
        .id
        .parse()
        .map_err(|_| CrawlError::Schema(format!("unparseable post id `{}`", raw.id)))?;

    let meta = text_extract::extract(&raw.text);
    let (author_id, author_name) = match raw.user.as_ref() {
        Some(user) => (Some(normalize_count(&user.id)?), user.screen_name.clone()),
        None => (None, String::new()),
    };

    Ok(Post {
        id,
        bid: raw.bid.clone(),
        author_id,
        author_name: strip_zero_width(&author_name),
        text: strip_zero_width(&meta.plain_text),
        picture_urls: picture_urls(raw),
        video_url: video_url(raw),
        location: meta.location.map(|l| strip_zero_width(&l)),
        created_at: raw.created_at.clone(),
        source_client: strip_zero_width(&raw.source),
        like_count: normalize_count(&raw.attitudes_count)?,
        comment_count: normalize_count(&raw.comments_count)?,
        repost_count: normalize_count(&raw.reposts_count)?,
        hashtags: meta.hashtags,
        mentions: meta.mentions,
        retweet: None,
    })
}

/// Convert a raw comment into a [`Comment`], applying the comment text
/// pipeline. `created_at` keeps the platform-native timestamp.
///
/// # Errors
///
/// Returns a schema error when the id or a count is unparseable.
pub fn parse_comment(raw: &CommentItem) -> Result<Comment, CrawlError> {
    let (author_id, author_name) = match raw.user.as_ref() {
        Some(user) => (normalize_count(&user.id)?, user.screen_name.clone()),
        None => (0, String::new()),
    };

    Ok(Comment {
        id: normalize_count(&raw.id)?,
        author_id,
        author_name: strip_zero_width(&author_name),
        text: clean_comment_text(&raw.text),
        like_count: normalize_count(&raw.like_count)?,
        created_at: raw.created_at.clone(),
    })
}

/// Large-size image URLs in display order.
fn picture_urls(raw: &Mblog) -> Vec<String> {
    raw.pics
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|pic| pic.large.as_ref())
        .map(|large| large.url.clone())
        .filter(|url| !url.is_empty())
        .collect()
}

/// Best available video rendition: 720p, then HD, then SD.
fn video_url(raw: &Mblog) -> Option<String> {
    let media = raw.page_info.as_ref()?.media_info.as_ref()?;
    media
        .mp4_720p_mp4
        .clone()
        .or_else(|| media.mp4_hd_url.clone())
        .or_else(|| media.mp4_sd_url.clone())
        .filter(|url| !url.is_empty())
}
