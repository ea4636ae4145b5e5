//! Normalized record types shared by the crawler and the sinks.

/// A fully normalized post.
///
/// `created_at` is always a `YYYY-MM-DD` date once normalization has run;
/// relative phrases from the API never survive into this type. `retweet`
/// nests at most one level: a repost wraps the original post, and the
/// original never carries a repost of its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: i64,
    pub bid: String,
    pub author_id: Option<i64>,
    pub author_name: String,
    /// Plain text with tags stripped.
    pub text: String,
    pub picture_urls: Vec<String>,
    pub video_url: Option<String>,
    pub location: Option<String>,
    /// Normalized `YYYY-MM-DD` date.
    pub created_at: String,
    /// Client the post was published from ("来自" line).
    pub source_client: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub repost_count: i64,
    /// `#...#` topics in document order; occurrences are kept, not deduplicated.
    pub hashtags: Vec<String>,
    /// `@user` mentions with the leading `@` stripped.
    pub mentions: Vec<String>,
    /// The original post when this record is a repost.
    pub retweet: Option<Box<Post>>,
}

/// A comment fetched from a post's comment feed.
///
/// Unlike [`Post`], `created_at` keeps the platform-native timestamp text;
/// comments are not date-normalized. Comments share the posts' output stream
/// and leave post-only columns empty there, with [`Record::kind`] telling
/// the two row shapes apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub author_id: i64,
    pub author_name: String,
    /// Text with reply-quote and emoji-image markup stripped.
    pub text: String,
    pub like_count: i64,
    /// Platform-native timestamp, not normalized.
    pub created_at: String,
}

/// One row of the shared output stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Post(Post),
    Comment(Comment),
}

impl Record {
    /// Application-level tag distinguishing comment rows from post rows.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Post(_) => "post",
            Self::Comment(_) => "comment",
        }
    }

    /// Record id (unique within one topic's crawl session).
    #[must_use]
    pub fn id(&self) -> i64 {
        match self {
            Self::Post(p) => p.id,
            Self::Comment(c) => c.id,
        }
    }

    /// The post payload, when this record is a post.
    #[must_use]
    pub fn as_post(&self) -> Option<&Post> {
        match self {
            Self::Post(p) => Some(p),
            Self::Comment(_) => None,
        }
    }
}
