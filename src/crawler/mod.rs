//! Topic-driven crawl orchestration: page pagination, per-post
//! resolution, incremental flushing, and polite backoff.

pub mod comments;
pub mod resolver;
pub mod session;

pub use session::CrawlSession;

use std::time::Duration;

use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::config::Config;
use crate::constants::{POSTS_PER_PAGE, POST_CARD_TYPE};
use crate::error::CrawlError;
use crate::models::Record;
use crate::sink::Sink;

/// Pages to crawl between rests, inclusive bounds; redrawn after each rest.
const REST_INTERVAL_PAGES: (i64, i64) = (1, 5);
/// Seconds to rest between page batches, inclusive bounds.
const REST_SECS: (u64, u64) = (6, 10);

/// Outcome of crawling one search page.
enum PageOutcome {
    Continue,
    /// The since-date cutoff fired; stop paging this topic.
    ReachedCutoff,
}

/// Crawl one topic to completion: walk every search page, resolve every
/// post, and flush the accumulated delta to the sinks after each page.
///
/// Partial failure is contained below this level — a failing post or page
/// logs and moves on. The final flush runs even when the cutoff ends
/// paging early.
///
/// # Errors
///
/// Returns an error when the initial result-count query fails; per-page
/// and per-post failures are logged and skipped.
pub async fn crawl_topic(
    client: &ApiClient,
    config: &Config,
    sinks: &mut [Box<dyn Sink>],
    session: &mut CrawlSession,
) -> Result<(), CrawlError> {
    let total = client.fetch_total(session.topic()).await?;
    let page_count = (total + POSTS_PER_PAGE - 1) / POSTS_PER_PAGE;
    info!(
        topic = session.topic(),
        total, page_count, "starting topic crawl"
    );

    let mut last_rest_page = 0i64;
    let mut rest_interval = draw_rest_interval();

    for page in 1..=page_count {
        let outcome = match crawl_page(client, config, session, page).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(topic = session.topic(), page, error = %e, "page failed, continuing with next");
                PageOutcome::Continue
            }
        };

        flush(session, sinks).await;

        if matches!(outcome, PageOutcome::ReachedCutoff) {
            info!(
                topic = session.topic(),
                page, "since-date cutoff reached, stopping early"
            );
            break;
        }

        // Jittered rest every few pages. The schedule is fixed, not
        // adaptive to throttling signals.
        if page - last_rest_page == rest_interval && page < page_count {
            let secs = rand::thread_rng().gen_range(REST_SECS.0..=REST_SECS.1);
            debug!(secs, "resting between pages");
            tokio::time::sleep(Duration::from_secs(secs)).await;
            last_rest_page = page;
            rest_interval = draw_rest_interval();
        }
    }

    flush(session, sinks).await;
    info!(
        topic = session.topic(),
        records = session.fetched_count(),
        "topic crawl complete"
    );
    Ok(())
}

fn draw_rest_interval() -> i64 {
    rand::thread_rng().gen_range(REST_INTERVAL_PAGES.0..=REST_INTERVAL_PAGES.1)
}

/// Crawl one search page: resolve each post card and append the survivors
/// to the session.
async fn crawl_page(
    client: &ApiClient,
    config: &Config,
    session: &mut CrawlSession,
    page: i64,
) -> Result<PageOutcome, CrawlError> {
    let response = client.fetch_search_page(session.topic(), page).await?;
    if response.ok != 1 {
        warn!(page, ok = response.ok, "search page reported not-ok, skipping");
        return Ok(PageOutcome::Continue);
    }
    let Some(data) = response.data else {
        return Ok(PageOutcome::Continue);
    };

    for card in &data.cards {
        if card.card_type != POST_CARD_TYPE {
            continue;
        }
        let Some(mblog) = card.mblog.as_ref() else {
            continue;
        };

        let post = match resolver::resolve_post(client, mblog, session).await {
            Ok(post) => post,
            Err(e) => {
                warn!(page, error = %e, "skipping unresolvable post");
                continue;
            }
        };

        if config.since_cutoff_enabled && predates(&post.created_at, config) {
            if resolver::is_pinned(mblog) {
                // Pinned posts surface out of order; skip rather than stop.
                continue;
            }
            return Ok(PageOutcome::ReachedCutoff);
        }

        if config.only_originals && post.retweet.is_some() {
            continue;
        }

        session.push(Record::Post(post));
    }

    Ok(PageOutcome::Continue)
}

/// Whether a normalized date falls before the configured since-date.
fn predates(created_at: &str, config: &Config) -> bool {
    chrono::NaiveDate::parse_from_str(created_at, "%Y-%m-%d")
        .map(|date| date < config.since_date)
        .unwrap_or(false)
}

/// Hand the unflushed delta to every sink and advance the high-water mark.
///
/// Sink failures are logged, not propagated: the contract is at-least-once
/// with sink-side upsert, and one sink's trouble must not stall the crawl.
async fn flush(session: &mut CrawlSession, sinks: &mut [Box<dyn Sink>]) {
    let is_first_batch = session.is_first_batch();
    let pending = session.pending();
    if pending.is_empty() {
        return;
    }

    for sink in sinks.iter_mut() {
        match sink.write(pending, is_first_batch).await {
            Ok(written) => debug!(sink = sink.name(), written, "flushed batch"),
            Err(e) => error!(sink = sink.name(), error = %e, "sink write failed"),
        }
    }
    session.mark_flushed();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_predates() {
        let config = Config {
            since_date: chrono::NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
            ..Config::for_testing()
        };
        assert!(predates("2023-04-30", &config));
        assert!(!predates("2023-05-01", &config));
        assert!(!predates("2023-05-02", &config));
        // Unparseable dates never trigger the cutoff.
        assert!(!predates("昨天", &config));
    }

    #[test]
    fn test_page_count_math() {
        let pages = |total: i64| (total + POSTS_PER_PAGE - 1) / POSTS_PER_PAGE;
        assert_eq!(pages(25), 3);
        assert_eq!(pages(30), 3);
        assert_eq!(pages(0), 0);
        assert_eq!(pages(1), 1);
    }
}
