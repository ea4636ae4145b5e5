//! Resolution of a summary card into a finished [`Post`]: comment
//! draining, long-text expansion, and repost unwrapping.

use chrono::Local;
use tracing::debug;

use crate::api::types::Mblog;
use crate::api::ApiClient;
use crate::crawler::comments::drain_comments;
use crate::crawler::session::CrawlSession;
use crate::error::CrawlError;
use crate::models::Post;
use crate::normalize;

/// Resolve one summary record into a normalized post.
///
/// Order of operations: the comment feed is drained first (appending
/// comment rows to the session as a side effect), then the post body is
/// finalized — expanding truncated "long" posts via the detail endpoint,
/// and unwrapping an embedded repost with the same long-text rule. Both
/// expansions degrade to the summary text when the detail fetch fails; a
/// missing long body never fails the post.
///
/// # Errors
///
/// Returns a schema error when the summary record itself cannot be
/// normalized (unparseable id or counts).
pub async fn resolve_post(
    client: &ApiClient,
    raw: &Mblog,
    session: &mut CrawlSession,
) -> Result<Post, CrawlError> {
    let post_id: i64 = raw
        .id
        .parse()
        .map_err(|_| CrawlError::Schema(format!("unparseable post id `{}`", raw.id)))?;

    if normalize::normalize_count(&raw.comments_count).unwrap_or(0) > 0 {
        let collected = drain_comments(client, post_id, session).await;
        debug!(post_id, collected, "drained comment feed");
    }

    let mut post = expand(client, raw).await?;

    if let Some(original) = raw.retweeted_status.as_deref() {
        let mut retweet = expand(client, original).await?;
        retweet.created_at = normalize::normalize_date(&original.created_at, Local::now());
        post.retweet = Some(Box::new(retweet));
    }

    // The date always comes from the summary record, even when the long
    // fetch replaced the body.
    post.created_at = normalize::normalize_date(&raw.created_at, Local::now());
    Ok(post)
}

/// Normalize a raw record, fetching the full body first when it is marked
/// long-text. Falls back to the summary on any detail failure.
async fn expand(client: &ApiClient, raw: &Mblog) -> Result<Post, CrawlError> {
    if raw.is_long_text {
        match client.fetch_detail(&raw.id).await {
            Ok(Some(full)) => {
                if let Ok(post) = normalize::parse_post(&full) {
                    return Ok(post);
                }
                debug!(id = %raw.id, "long body failed to normalize, falling back to summary");
            }
            Ok(None) => {
                debug!(id = %raw.id, "detail page carried no status, falling back to summary");
            }
            Err(e) => {
                debug!(id = %raw.id, error = %e, "long post fetch failed, falling back to summary");
            }
        }
    }
    normalize::parse_post(raw)
}

/// Whether a search card carries the pinned-post marker.
#[must_use]
pub fn is_pinned(raw: &Mblog) -> bool {
    raw.title.as_ref().is_some_and(|t| t.text == "置顶")
}
