//! Integration tests for the topic crawl pipeline.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use weibo_topic_crawler::api::ApiClient;
use weibo_topic_crawler::config::Config;
use weibo_topic_crawler::crawler::{crawl_topic, CrawlSession};
use weibo_topic_crawler::models::Record;
use weibo_topic_crawler::sink::{Sink, SinkError};

/// Sink that records every flushed batch for assertions.
#[derive(Clone, Default)]
struct RecordingSink {
    batches: Arc<Mutex<Vec<(usize, bool)>>>,
}

#[async_trait]
impl Sink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn write(
        &mut self,
        records: &[Record],
        is_first_batch: bool,
    ) -> Result<usize, SinkError> {
        self.batches
            .lock()
            .unwrap()
            .push((records.len(), is_first_batch));
        Ok(records.len())
    }
}

fn test_config(base_url: &str) -> Config {
    Config {
        api_base_url: base_url.to_string(),
        ..Config::for_testing()
    }
}

/// A search-result card carrying a post. Comment counts stay at zero so
/// the pipeline tests exercise paging without the comment feed.
fn post_card(id: i64, with_retweet: bool) -> serde_json::Value {
    let mut mblog = json!({
        "id": id.to_string(),
        "bid": format!("bid{id}"),
        "user": {"id": 1000 + id, "screen_name": format!("用户{id}")},
        "text": format!("话题正文{id}"),
        "created_at": "2023-05-04",
        "source": "微博 weibo.com",
        "attitudes_count": 1,
        "comments_count": 0,
        "reposts_count": 0,
        "isLongText": false
    });
    if with_retweet {
        mblog["retweeted_status"] = json!({
            "id": (90_000 + id).to_string(),
            "bid": format!("rbid{id}"),
            "user": {"id": 2000 + id, "screen_name": "源用户"},
            "text": "被转发的原文",
            "created_at": "2023-05-03",
            "attitudes_count": 0,
            "comments_count": 0,
            "reposts_count": 0,
            "isLongText": false
        });
    }
    json!({"card_type": 9, "mblog": mblog})
}

fn search_body(total: i64, cards: Vec<serde_json::Value>) -> serde_json::Value {
    json!({
        "ok": 1,
        "data": {
            "cardlistInfo": {"total": total},
            "cards": cards
        }
    })
}

async fn mount_count(server: &MockServer, total: i64) {
    Mock::given(method("GET"))
        .and(path("/api/container/getIndex"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(total, vec![])))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page: i64, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/container/getIndex"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_three_pages_with_originals_filter() {
    let server = MockServer::start().await;
    mount_count(&server, 25).await;

    // Pages of 10/10/5 posts; two reposts on every page, six in total.
    let page1: Vec<_> = (1..=10).map(|id| post_card(id, id == 3 || id == 7)).collect();
    let page2: Vec<_> = (11..=20)
        .map(|id| post_card(id, id == 12 || id == 18))
        .collect();
    let mut page3: Vec<_> = (21..=25)
        .map(|id| post_card(id, id == 21 || id == 25))
        .collect();
    // A non-post card on the last page must be ignored.
    page3.push(json!({"card_type": 7}));

    mount_page(&server, 1, search_body(25, page1)).await;
    mount_page(&server, 2, search_body(25, page2)).await;
    mount_page(&server, 3, search_body(25, page3)).await;

    let config = Config {
        only_originals: true,
        ..test_config(&server.uri())
    };
    let client = ApiClient::new(&config.api_base_url, &config.cookie).unwrap();
    let mut session = CrawlSession::new("测试话题");

    let recording = RecordingSink::default();
    let batches = recording.batches.clone();
    let mut sinks: Vec<Box<dyn Sink>> = vec![Box::new(recording)];

    crawl_topic(&client, &config, &mut sinks, &mut session)
        .await
        .expect("crawl should succeed");

    // 25 posts minus 6 reposts.
    assert_eq!(session.fetched_count(), 19);
    assert_eq!(session.flushed_count(), 19);

    let batches = batches.lock().unwrap();
    assert_eq!(batches.len(), 3, "one flush per page");
    assert_eq!(*batches, vec![(8, true), (8, false), (3, false)]);
}

#[tokio::test]
async fn test_reposts_kept_without_filter() {
    let server = MockServer::start().await;
    mount_count(&server, 2).await;
    mount_page(
        &server,
        1,
        search_body(2, vec![post_card(1, true), post_card(2, false)]),
    )
    .await;

    let config = test_config(&server.uri());
    let client = ApiClient::new(&config.api_base_url, &config.cookie).unwrap();
    let mut session = CrawlSession::new("测试话题");
    let mut sinks: Vec<Box<dyn Sink>> = vec![Box::new(RecordingSink::default())];

    crawl_topic(&client, &config, &mut sinks, &mut session)
        .await
        .expect("crawl should succeed");

    assert_eq!(session.fetched_count(), 2);
    let repost = session.records()[0].as_post().unwrap();
    assert_eq!(repost.id, 1);
    let original = repost.retweet.as_deref().expect("retweet attached");
    assert_eq!(original.id, 90_001);
    assert_eq!(original.text, "被转发的原文");
    // Nested record's date is normalized independently.
    assert_eq!(original.created_at, "2023-05-03");
    assert!(original.retweet.is_none(), "no double nesting");
}

#[tokio::test]
async fn test_long_post_expanded_from_detail_page() {
    let server = MockServer::start().await;
    mount_count(&server, 1).await;

    let mut card = post_card(555, false);
    card["mblog"]["isLongText"] = json!(true);
    card["mblog"]["text"] = json!("被截断的正文…全文");
    mount_page(&server, 1, search_body(1, vec![card])).await;

    let detail_html = r#"<html><script>var $render_data = [{"status": {"id": "555", "bid": "bid555", "user": {"id": 1555, "screen_name": "用户555"}, "text": "完整的长文正文，列表页放不下", "created_at": "2023-05-04", "attitudes_count": 1, "comments_count": 0, "reposts_count": 0}, "call": 1}][0] || {};</script></html>"#;
    Mock::given(method("GET"))
        .and(path("/detail/555"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html))
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let client = ApiClient::new(&config.api_base_url, &config.cookie).unwrap();
    let mut session = CrawlSession::new("测试话题");
    let mut sinks: Vec<Box<dyn Sink>> = vec![Box::new(RecordingSink::default())];

    crawl_topic(&client, &config, &mut sinks, &mut session)
        .await
        .expect("crawl should succeed");

    assert_eq!(session.fetched_count(), 1);
    let post = session.records()[0].as_post().unwrap();
    assert_eq!(post.text, "完整的长文正文，列表页放不下");
    assert_eq!(post.created_at, "2023-05-04");
}

#[tokio::test]
async fn test_long_post_falls_back_to_summary_on_detail_failure() {
    let server = MockServer::start().await;
    mount_count(&server, 1).await;

    let mut card = post_card(556, false);
    card["mblog"]["isLongText"] = json!(true);
    mount_page(&server, 1, search_body(1, vec![card])).await;

    Mock::given(method("GET"))
        .and(path("/detail/556"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let client = ApiClient::new(&config.api_base_url, &config.cookie).unwrap();
    let mut session = CrawlSession::new("测试话题");
    let mut sinks: Vec<Box<dyn Sink>> = vec![Box::new(RecordingSink::default())];

    crawl_topic(&client, &config, &mut sinks, &mut session)
        .await
        .expect("crawl should succeed");

    // The missing long body degrades to the summary text, never a failure.
    assert_eq!(session.fetched_count(), 1);
    let post = session.records()[0].as_post().unwrap();
    assert_eq!(post.text, "话题正文556");
}

#[tokio::test]
async fn test_failing_page_skipped_crawl_continues() {
    let server = MockServer::start().await;
    mount_count(&server, 12).await;

    Mock::given(method("GET"))
        .and(path("/api/container/getIndex"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(
        &server,
        2,
        search_body(12, vec![post_card(11, false), post_card(12, false)]),
    )
    .await;

    let config = test_config(&server.uri());
    let client = ApiClient::new(&config.api_base_url, &config.cookie).unwrap();
    let mut session = CrawlSession::new("测试话题");
    let mut sinks: Vec<Box<dyn Sink>> = vec![Box::new(RecordingSink::default())];

    crawl_topic(&client, &config, &mut sinks, &mut session)
        .await
        .expect("crawl should succeed despite a failing page");

    assert_eq!(session.fetched_count(), 2);
}

#[tokio::test]
async fn test_since_cutoff_stops_paging_when_enabled() {
    let server = MockServer::start().await;
    mount_count(&server, 20).await;

    // Page 1: one fresh post, then one predating the cutoff.
    let fresh = post_card(1, false);
    let mut stale = post_card(2, false);
    stale["mblog"]["created_at"] = json!("2023-01-01");
    mount_page(&server, 1, search_body(20, vec![fresh, stale])).await;
    // Page 2 must never be requested.
    Mock::given(method("GET"))
        .and(path("/api/container/getIndex"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(20, vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let config = Config {
        since_cutoff_enabled: true,
        since_date: chrono::NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
        ..test_config(&server.uri())
    };
    let client = ApiClient::new(&config.api_base_url, &config.cookie).unwrap();
    let mut session = CrawlSession::new("测试话题");

    let recording = RecordingSink::default();
    let batches = recording.batches.clone();
    let mut sinks: Vec<Box<dyn Sink>> = vec![Box::new(recording)];

    crawl_topic(&client, &config, &mut sinks, &mut session)
        .await
        .expect("crawl should succeed");

    assert_eq!(session.fetched_count(), 1);
    assert_eq!(batches.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_since_cutoff_ignored_by_default() {
    let server = MockServer::start().await;
    mount_count(&server, 2).await;

    let mut stale = post_card(1, false);
    stale["mblog"]["created_at"] = json!("2023-01-01");
    mount_page(&server, 1, search_body(2, vec![stale, post_card(2, false)])).await;

    let config = Config {
        since_date: chrono::NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
        ..test_config(&server.uri())
    };
    let client = ApiClient::new(&config.api_base_url, &config.cookie).unwrap();
    let mut session = CrawlSession::new("测试话题");
    let mut sinks: Vec<Box<dyn Sink>> = vec![Box::new(RecordingSink::default())];

    crawl_topic(&client, &config, &mut sinks, &mut session)
        .await
        .expect("crawl should succeed");

    // Cutoff disabled: stale posts are kept and paging continues.
    assert_eq!(session.fetched_count(), 2);
}
