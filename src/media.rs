//! Media (image/video) download: a simple idempotent fetch-to-disk with a
//! sidecar failure log.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::constants::MEDIA_FAILURE_LOG;
use crate::error::CrawlError;
use crate::models::Post;

/// Which media attachment to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    const fn dir_name(self) -> &'static str {
        match self {
            Self::Image => "img",
            Self::Video => "video",
        }
    }
}

/// Download all media of one kind for the given posts into
/// `<topic_dir>/<img|video>/`.
///
/// Files are named `YYYYMMDD_<id>` (with `_<n>` for multi-image posts) and
/// skipped when they already exist, so re-runs only fetch what is missing.
/// A failed fetch appends `"<id>:<url>"` to the sidecar failure log and the
/// batch continues.
///
/// # Errors
///
/// Returns an error only when the media directory itself cannot be created.
pub async fn download_all(
    http: &reqwest::Client,
    posts: &[&Post],
    topic_dir: &Path,
    kind: MediaKind,
) -> Result<(), CrawlError> {
    let media_dir = topic_dir.join(kind.dir_name());
    tokio::fs::create_dir_all(&media_dir)
        .await
        .map_err(|e| CrawlError::Fetch(format!("creating {}: {e}", media_dir.display())))?;

    let mut downloaded = 0usize;
    let mut failed = 0usize;

    for post in posts {
        let prefix = format!("{}_{}", post.created_at.replace('-', ""), post.id);
        match kind {
            MediaKind::Image => {
                for (index, url) in post.picture_urls.iter().enumerate() {
                    let file_name = format!("{prefix}_{}{}", index + 1, url_suffix(url));
                    match download_one(http, url, &media_dir.join(file_name)).await {
                        Ok(()) => downloaded += 1,
                        Err(e) => {
                            failed += 1;
                            log_failure(&media_dir, post.id, url, &e).await;
                        }
                    }
                }
            }
            MediaKind::Video => {
                if let Some(url) = post.video_url.as_deref() {
                    let file_name = format!("{prefix}.mp4");
                    match download_one(http, url, &media_dir.join(file_name)).await {
                        Ok(()) => downloaded += 1,
                        Err(e) => {
                            failed += 1;
                            log_failure(&media_dir, post.id, url, &e).await;
                        }
                    }
                }
            }
        }
    }

    info!(
        dir = %media_dir.display(),
        downloaded,
        failed,
        "media download finished"
    );
    Ok(())
}

/// Fetch one file unless it already exists on disk.
async fn download_one(
    http: &reqwest::Client,
    url: &str,
    destination: &Path,
) -> Result<(), CrawlError> {
    if tokio::fs::try_exists(destination).await.unwrap_or(false) {
        return Ok(());
    }

    let bytes = http
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| CrawlError::Fetch(e.to_string()))?
        .bytes()
        .await
        .map_err(|e| CrawlError::Fetch(e.to_string()))?;
    tokio::fs::write(destination, &bytes)
        .await
        .map_err(|e| CrawlError::Fetch(format!("writing {}: {e}", destination.display())))?;
    Ok(())
}

/// Record a failed URL in the sidecar log; never fails the batch.
async fn log_failure(media_dir: &Path, post_id: i64, url: &str, error: &CrawlError) {
    warn!(post_id, url, error = %error, "media download failed");
    let line = format!("{post_id}:{url}\n");
    let log_path = media_dir.join(MEDIA_FAILURE_LOG);
    let result = async {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await?;
        file.write_all(line.as_bytes()).await
    }
    .await;
    if let Err(e) = result {
        warn!(path = %log_path.display(), error = %e, "could not record media failure");
    }
}

/// File suffix taken naively from the URL's last dot, like the filenames
/// the platform serves ("...jpg", "...gif").
fn url_suffix(url: &str) -> &str {
    url.rfind('.').map_or("", |i| &url[i..])
}
