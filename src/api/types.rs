//! Raw payload types mirroring the mobile web API's JSON.
//!
//! These deserialize the API's wire shapes as-is; normalization into
//! [`crate::models`] types happens in [`crate::normalize`].

use serde::Deserialize;

/// Envelope of the topic search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    /// 1 on success; anything else means the payload carries no usable data.
    #[serde(default)]
    pub ok: i64,
    pub data: Option<SearchData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchData {
    #[serde(rename = "cardlistInfo")]
    pub cardlist_info: Option<CardlistInfo>,
    #[serde(default)]
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardlistInfo {
    /// Total number of matching posts, used to derive the page count.
    #[serde(default)]
    pub total: i64,
}

/// One card on a search-result page. Only cards of
/// [`crate::constants::POST_CARD_TYPE`] carry a post.
#[derive(Debug, Clone, Deserialize)]
pub struct Card {
    #[serde(default)]
    pub card_type: i64,
    pub mblog: Option<Mblog>,
}

/// A raw post as the API serves it, either inline on a search page or as
/// the `status` object of a detail page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Mblog {
    /// Numeric id serialized as a string.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub bid: String,
    pub user: Option<MblogUser>,
    /// Rich-text body: HTML with inline icons, topic links and mentions.
    #[serde(default)]
    pub text: String,
    /// Creation time, possibly a relative phrase ("3小时前", "昨天").
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub source: String,
    /// Counts arrive as numbers or as strings like "3万+".
    #[serde(default)]
    pub attitudes_count: RawCount,
    #[serde(default)]
    pub comments_count: RawCount,
    #[serde(default)]
    pub reposts_count: RawCount,
    /// True when the list view truncated the body and a detail fetch is
    /// needed for the full text.
    #[serde(rename = "isLongText", default)]
    pub is_long_text: bool,
    pub retweeted_status: Option<Box<Mblog>>,
    pub pics: Option<Vec<RawPic>>,
    pub page_info: Option<RawPageInfo>,
    /// Card title; `text == "置顶"` marks a pinned post.
    pub title: Option<CardTitle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MblogUser {
    #[serde(default)]
    pub id: RawCount,
    #[serde(default)]
    pub screen_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardTitle {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPic {
    pub large: Option<RawPicVersion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPicVersion {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPageInfo {
    pub media_info: Option<RawMediaInfo>,
}

/// Video renditions in descending preference order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMediaInfo {
    pub mp4_720p_mp4: Option<String>,
    pub mp4_hd_url: Option<String>,
    pub mp4_sd_url: Option<String>,
}

/// Envelope of the comment feed endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentResponse {
    #[serde(default)]
    pub ok: i64,
    pub data: Option<CommentData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentData {
    #[serde(default)]
    pub data: Vec<CommentItem>,
    /// Cursor for the next page; 0 signals the end of the feed.
    #[serde(default)]
    pub max_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentItem {
    #[serde(default)]
    pub id: RawCount,
    /// Rich-text body with reply-quote and emoji-image markup.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub like_count: RawCount,
    pub user: Option<CommentUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentUser {
    #[serde(default)]
    pub id: RawCount,
    #[serde(default)]
    pub screen_name: String,
}

/// A count field that may arrive as a JSON number or as a suffixed string
/// ("12万", "3万+").
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCount {
    Int(i64),
    Text(String),
}

impl Default for RawCount {
    fn default() -> Self {
        Self::Int(0)
    }
}
