//! Cursor-based pagination over one post's comment feed.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::crawler::session::CrawlSession;
use crate::models::Record;
use crate::normalize;

/// Seconds to pause between comment pages, inclusive bounds.
const PAGE_DELAY_SECS: (u64, u64) = (2, 4);

/// Drain a post's comment feed into the session.
///
/// The first request carries no cursor; each response's `max_id` feeds the
/// next request, and a cursor of 0 ends the feed. Every page's comments are
/// appended to the session as soon as they are normalized.
///
/// Failures never propagate: a transport error, non-success status, or
/// missing payload terminates the loop with a warning, keeping whatever was
/// collected so far. One post's comment trouble must not abort the topic.
///
/// Returns the number of comments appended.
pub async fn drain_comments(client: &ApiClient, post_id: i64, session: &mut CrawlSession) -> usize {
    let mut cursor: Option<i64> = None;
    let mut pages = 0usize;
    let mut collected = 0usize;

    loop {
        let response = match client.fetch_comment_page(post_id, cursor).await {
            Ok(r) => r,
            Err(e) => {
                warn!(post_id, error = %e, "comment page fetch failed, keeping comments collected so far");
                break;
            }
        };
        if response.ok != 1 {
            warn!(post_id, ok = response.ok, "comment feed reported not-ok, stopping");
            break;
        }
        let Some(data) = response.data else {
            warn!(post_id, "comment feed returned no data, stopping");
            break;
        };

        pages += 1;
        for item in &data.data {
            match normalize::parse_comment(item) {
                Ok(comment) => {
                    session.push(Record::Comment(comment));
                    collected += 1;
                }
                Err(e) => warn!(post_id, error = %e, "skipping malformed comment"),
            }
        }
        debug!(post_id, page = pages, collected, "fetched comment page");

        if data.max_id == 0 {
            break;
        }
        cursor = Some(data.max_id);

        let delay = rand::thread_rng().gen_range(PAGE_DELAY_SECS.0..=PAGE_DELAY_SECS.1);
        tokio::time::sleep(Duration::from_secs(delay)).await;
    }

    collected
}
