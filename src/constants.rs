//! Shared constants used across the application.

/// User agent string sent with every API request.
///
/// This is a realistic browser user agent; the mobile web API serves the
/// same payloads to it as to a real browser session.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/70.0.3534.4 Safari/537.36";

/// Default base URL of the mobile web API.
pub const DEFAULT_API_BASE_URL: &str = "https://m.weibo.cn";

/// Filename of the location-pin icon that marks a post's location span.
pub const LOCATION_ICON: &str = "timeline_card_small_location_default.png";

/// Card type of search-result cards that carry a post. Other card types on
/// a search page (banners, user groups) are ignored.
pub const POST_CARD_TYPE: i64 = 9;

/// Posts per search-result page, fixed by the platform.
pub const POSTS_PER_PAGE: i64 = 10;

/// Base CSV columns, in the order the result file has always used them.
pub const CSV_BASE_HEADERS: [&str; 13] = [
    "id",
    "bid",
    "正文",
    "原始图片url",
    "视频url",
    "位置",
    "日期",
    "工具",
    "点赞数",
    "评论数",
    "转发数",
    "话题",
    "@用户",
];

/// Sidecar file listing media URLs that failed to download.
pub const MEDIA_FAILURE_LOG: &str = "not_downloaded.txt";
