//! SQLite sink: upsert-by-id persistence via sqlx.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::models::{Comment, Post, Record};
use crate::sink::{Sink, SinkError};

/// Upserts records into a `records` table keyed by post/comment id.
///
/// Repost originals get their own row; the wrapping post links to it via
/// `retweet_id`. Re-running a crawl overwrites rows in place, which is what
/// makes the at-least-once delivery contract safe.
#[derive(Debug, Clone)]
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    /// Open (or create) the database at `path` and ensure the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or schema setup fails.
    pub async fn connect(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            // Writes are serialized; avoid immediate SQLITE_BUSY errors when
            // another process inspects the file mid-crawl.
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY,
                kind TEXT NOT NULL,
                bid TEXT,
                author_id INTEGER,
                author_name TEXT,
                text TEXT,
                picture_urls TEXT,
                video_url TEXT,
                location TEXT,
                created_at TEXT,
                source_client TEXT,
                like_count INTEGER,
                comment_count INTEGER,
                repost_count INTEGER,
                hashtags TEXT,
                mentions TEXT,
                retweet_id INTEGER
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// The underlying pool, for test assertions.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn upsert_post(&self, post: &Post, retweet_id: Option<i64>) -> Result<(), SinkError> {
        sqlx::query(UPSERT_SQL)
            .bind(post.id)
            .bind("post")
            .bind(&post.bid)
            .bind(post.author_id)
            .bind(&post.author_name)
            .bind(&post.text)
            .bind(post.picture_urls.join(","))
            .bind(post.video_url.as_deref())
            .bind(post.location.as_deref())
            .bind(&post.created_at)
            .bind(&post.source_client)
            .bind(post.like_count)
            .bind(post.comment_count)
            .bind(post.repost_count)
            .bind(post.hashtags.join(","))
            .bind(post.mentions.join(","))
            .bind(retweet_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_comment(&self, comment: &Comment) -> Result<(), SinkError> {
        sqlx::query(UPSERT_SQL)
            .bind(comment.id)
            .bind("comment")
            .bind("")
            .bind(comment.author_id)
            .bind(&comment.author_name)
            .bind(&comment.text)
            .bind("")
            .bind(Option::<String>::None)
            .bind(Option::<String>::None)
            .bind(&comment.created_at)
            .bind("")
            .bind(comment.like_count)
            .bind(0i64)
            .bind(0i64)
            .bind("")
            .bind("")
            .bind(Option::<i64>::None)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

const UPSERT_SQL: &str = "INSERT INTO records (
        id, kind, bid, author_id, author_name, text, picture_urls, video_url,
        location, created_at, source_client, like_count, comment_count,
        repost_count, hashtags, mentions, retweet_id
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        kind = excluded.kind,
        bid = excluded.bid,
        author_id = excluded.author_id,
        author_name = excluded.author_name,
        text = excluded.text,
        picture_urls = excluded.picture_urls,
        video_url = excluded.video_url,
        location = excluded.location,
        created_at = excluded.created_at,
        source_client = excluded.source_client,
        like_count = excluded.like_count,
        comment_count = excluded.comment_count,
        repost_count = excluded.repost_count,
        hashtags = excluded.hashtags,
        mentions = excluded.mentions,
        retweet_id = excluded.retweet_id";

#[async_trait]
impl Sink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn write(
        &mut self,
        records: &[Record],
        _is_first_batch: bool,
    ) -> Result<usize, SinkError> {
        for record in records {
            match record {
                Record::Post(post) => {
                    let mut retweet_id = None;
                    if let Some(original) = post.retweet.as_deref() {
                        self.upsert_post(original, None).await?;
                        retweet_id = Some(original.id);
                    }
                    self.upsert_post(post, retweet_id).await?;
                }
                Record::Comment(comment) => self.upsert_comment(comment).await?,
            }
        }
        Ok(records.len())
    }
}
