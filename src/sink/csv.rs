//! CSV sink: one append-mode file per topic.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::constants::CSV_BASE_HEADERS;
use crate::models::{Comment, Post, Record};
use crate::sink::{Sink, SinkError};

/// Appends records to `<dir>/<topic>.csv`.
///
/// The header row is written on the session's first batch only; the column
/// ordering is fixed for compatibility with files produced by earlier
/// versions of this pipeline, with a trailing record-kind column telling
/// comment rows apart from post rows.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Create a sink writing to `<dir>/<topic>.csv`, creating `dir` as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub async fn create(dir: &Path, topic: &str) -> Result<Self, SinkError> {
        tokio::fs::create_dir_all(dir).await?;
        Ok(Self {
            path: dir.join(format!("{topic}.csv")),
        })
    }

    /// The file this sink appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn write(
        &mut self,
        records: &[Record],
        is_first_batch: bool,
    ) -> Result<usize, SinkError> {
        let mut buf = Vec::new();
        {
            let mut writer = ::csv::Writer::from_writer(&mut buf);
            if is_first_batch {
                writer.write_record(header_row())?;
            }
            for record in records {
                writer.write_record(record_row(record))?;
            }
            writer.flush()?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&buf).await?;
        file.flush().await?;

        Ok(records.len())
    }
}

/// Full header: 13 base columns, the repost block, and the record kind.
fn header_row() -> Vec<String> {
    let mut headers: Vec<String> = CSV_BASE_HEADERS.iter().map(ToString::to_string).collect();
    headers.push("是否原创".to_string());
    headers.push("源用户id".to_string());
    headers.push("源用户昵称".to_string());
    headers.extend(CSV_BASE_HEADERS.iter().map(|h| format!("源微博{h}")));
    headers.push("记录类型".to_string());
    headers
}

fn record_row(record: &Record) -> Vec<String> {
    let mut row = match record {
        Record::Post(post) => post_row(post),
        Record::Comment(comment) => comment_row(comment),
    };
    row.push(record.kind().to_string());
    row
}

fn post_row(post: &Post) -> Vec<String> {
    let mut row = base_columns(post);
    match post.retweet.as_deref() {
        Some(original) => {
            row.push("false".to_string());
            row.push(original.author_id.map(|id| id.to_string()).unwrap_or_default());
            row.push(original.author_name.clone());
            row.extend(base_columns(original));
        }
        None => {
            row.push("true".to_string());
            row.extend(std::iter::repeat(String::new()).take(2 + CSV_BASE_HEADERS.len()));
        }
    }
    row
}

/// Comment rows reuse the post columns, leaving post-only fields empty.
fn comment_row(comment: &Comment) -> Vec<String> {
    let mut row = vec![
        comment.id.to_string(),
        String::new(),
        comment.text.clone(),
        String::new(),
        String::new(),
        String::new(),
        comment.created_at.clone(),
        String::new(),
        comment.like_count.to_string(),
        "0".to_string(),
        "0".to_string(),
        String::new(),
        String::new(),
    ];
    row.push("true".to_string());
    row.extend(std::iter::repeat(String::new()).take(2 + CSV_BASE_HEADERS.len()));
    row
}

/// The 13 base columns in header order.
fn base_columns(post: &Post) -> Vec<String> {
    vec![
        post.id.to_string(),
        post.bid.clone(),
        post.text.clone(),
        post.picture_urls.join(","),
        post.video_url.clone().unwrap_or_default(),
        post.location.clone().unwrap_or_default(),
        post.created_at.clone(),
        post.source_client.clone(),
        post.like_count.to_string(),
        post.comment_count.to_string(),
        post.repost_count.to_string(),
        post.hashtags.join(","),
        post.mentions.join(","),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post() -> Post {
        Post {
            id: 1,
            bid: "abc".to_string(),
            author_name: "作者".to_string(),
            text: "正文".to_string(),
            picture_urls: vec!["https://a/1.jpg".to_string(), "https://a/2.jpg".to_string()],
            created_at: "2023-05-04".to_string(),
            like_count: 10,
            hashtags: vec!["春晚".to_string(), "春晚".to_string()],
            ..Post::default()
        }
    }

    #[test]
    fn test_header_width_matches_rows() {
        let header = header_row();
        let plain = record_row(&Record::Post(sample_post()));
        let comment = record_row(&Record::Comment(Comment {
            id: 2,
            ..Comment::default()
        }));

        let mut repost = sample_post();
        repost.retweet = Some(Box::new(Post {
            id: 3,
            ..Post::default()
        }));
        let repost_row = record_row(&Record::Post(repost));

        assert_eq!(header.len(), 30);
        assert_eq!(plain.len(), header.len());
        assert_eq!(comment.len(), header.len());
        assert_eq!(repost_row.len(), header.len());
    }

    #[test]
    fn test_post_row_contents() {
        let row = record_row(&Record::Post(sample_post()));
        assert_eq!(row[0], "1");
        assert_eq!(row[2], "正文");
        assert_eq!(row[3], "https://a/1.jpg,https://a/2.jpg");
        // Duplicated hashtags are preserved.
        assert_eq!(row[11], "春晚,春晚");
        assert_eq!(row[13], "true");
        assert_eq!(*row.last().unwrap(), "post");
    }

    #[test]
    fn test_repost_row_carries_original() {
        let mut post = sample_post();
        post.retweet = Some(Box::new(Post {
            id: 99,
            author_id: Some(7),
            author_name: "源作者".to_string(),
            text: "源正文".to_string(),
            ..Post::default()
        }));
        let row = record_row(&Record::Post(post));
        assert_eq!(row[13], "false");
        assert_eq!(row[14], "7");
        assert_eq!(row[15], "源作者");
        assert_eq!(row[16], "99");
        assert_eq!(row[18], "源正文");
    }

    #[test]
    fn test_comment_row_leaves_post_fields_empty() {
        let row = record_row(&Record::Comment(Comment {
            id: 5,
            author_name: "评论者".to_string(),
            text: "好看".to_string(),
            like_count: 3,
            created_at: "Mon May 04 12:00:00 +0800 2020".to_string(),
            ..Comment::default()
        }));
        assert_eq!(row[0], "5");
        assert_eq!(row[1], "");
        assert_eq!(row[2], "好看");
        assert_eq!(row[6], "Mon May 04 12:00:00 +0800 2020");
        assert_eq!(row[8], "3");
        assert_eq!(*row.last().unwrap(), "comment");
    }
}
